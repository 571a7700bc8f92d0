// Configuration constants and the optional TOML run config
use crate::detector::DetectorKind;
use crate::types::{ColorizeError, TextUnit};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

// Defaults mirrored by the CLI
pub const DEFAULT_MODEL: &str = "gpt2";
pub const DEFAULT_MERGE_BOXES: usize = 5;
pub const DEFAULT_OPACITY: f32 = 0.3;
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 10;

// Language model limits
pub const MAX_TOKENS: usize = 512;
pub const NEUTRAL_SCORE: f32 = 0.5;

pub const MODELS_DIR_ENV: &str = "PDF_AI_COLORIZE_MODELS";
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Root directory searched for named models.
pub fn models_dir() -> PathBuf {
    if let Ok(dir) = env::var(MODELS_DIR_ENV) {
        return dir.into();
    }
    let local = PathBuf::from("./models");
    if local.is_dir() {
        return local;
    }
    dirs::data_dir()
        .map(|d| d.join("pdf-ai-colorize").join("models"))
        .unwrap_or(local)
}

/// Resolves `--model NAME` to a directory holding `model.onnx` and `tokenizer.json`.
pub fn resolve_model_dir(name: &str) -> Result<PathBuf, ColorizeError> {
    let direct = Path::new(name);
    let dir = if direct.is_dir() {
        direct.to_path_buf()
    } else {
        models_dir().join(name)
    };

    for file in [MODEL_FILE, TOKENIZER_FILE] {
        if !dir.join(file).is_file() {
            return Err(ColorizeError::ModelNotFound(dir, file));
        }
    }
    Ok(dir)
}

/// Values read from `--config FILE`. Every key is optional; CLI flags win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub model: Option<String>,
    pub detector: Option<DetectorKind>,
    pub unit_type: Option<TextUnit>,
    pub merge_boxes: Option<usize>,
    pub opacity: Option<f32>,
    pub min_text_length: Option<usize>,
    #[serde(default)]
    pub create_legend: bool,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ColorizeError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ColorizeError::Config(path.to_path_buf(), e.to_string()))?;
        Self::parse(&raw).map_err(|e| ColorizeError::Config(path.to_path_buf(), e))
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model: String,
    pub detector: DetectorKind,
    pub unit_type: TextUnit,
    pub merge_boxes: usize,
    pub opacity: f32,
    pub min_text_length: usize,
    pub create_legend: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            detector: DetectorKind::Simple,
            unit_type: TextUnit::Line,
            merge_boxes: DEFAULT_MERGE_BOXES,
            opacity: DEFAULT_OPACITY,
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            create_legend: false,
        }
    }
}

impl Settings {
    /// Layers file values over the built-in defaults.
    pub fn from_file(file: FileConfig) -> Self {
        let base = Settings::default();
        Self {
            model: file.model.unwrap_or(base.model),
            detector: file.detector.unwrap_or(base.detector),
            unit_type: file.unit_type.unwrap_or(base.unit_type),
            merge_boxes: file.merge_boxes.unwrap_or(base.merge_boxes),
            opacity: file.opacity.unwrap_or(base.opacity),
            min_text_length: file.min_text_length.unwrap_or(base.min_text_length),
            create_legend: file.create_legend,
        }
    }

    pub fn validate(&self) -> Result<(), ColorizeError> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ColorizeError::InvalidOpacity(self.opacity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let file = FileConfig::parse(
            r#"
            model = "distilgpt2"
            detector = "fast"
            unit-type = "word"
            opacity = 0.5
            "#,
        )
        .unwrap();
        let settings = Settings::from_file(file);
        assert_eq!(settings.model, "distilgpt2");
        assert_eq!(settings.detector, DetectorKind::Fast);
        assert_eq!(settings.unit_type, TextUnit::Word);
        assert_eq!(settings.opacity, 0.5);
        assert_eq!(settings.merge_boxes, DEFAULT_MERGE_BOXES);
        assert!(!settings.create_legend);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::parse("colour = \"red\"").is_err());
    }

    #[test]
    fn opacity_outside_unit_interval_is_invalid() {
        for bad in [-0.1, 1.5, f32::NAN] {
            let settings = Settings { opacity: bad, ..Settings::default() };
            assert!(matches!(settings.validate(), Err(ColorizeError::InvalidOpacity(_))));
        }
        let ok = Settings { opacity: 1.0, ..Settings::default() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn missing_model_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_model_dir(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ColorizeError::ModelNotFound(_, MODEL_FILE)));
    }
}
