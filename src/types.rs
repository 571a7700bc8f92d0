// Core types shared by extraction, scoring and rendering
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Axis-aligned rectangle in PDF user space (points, origin bottom-left).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Builds a rectangle from two opposite corners in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && self.x1 >= other.x1 && self.y1 >= other.y1
    }
}

impl From<(f32, f32, f32, f32)> for Rect {
    fn from((x0, y0, x1, y1): (f32, f32, f32, f32)) -> Self {
        Rect::new(x0, y0, x1, y1)
    }
}

/// A unit of extracted text plus the region it occupies on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,
    pub region: Rect,
    /// 0-based page index
    pub page_index: usize,
    #[serde(default)]
    pub score: f32,
}

impl TextSegment {
    pub fn new(text: impl Into<String>, region: Rect, page_index: usize) -> Self {
        Self {
            text: text.into(),
            region,
            page_index,
            score: 0.0,
        }
    }
}

/// Granularity of the units produced by the extractor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TextUnit {
    Char,
    Word,
    #[default]
    Line,
}

/// Coarse label attached to a score in the legend and the run summary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ScoreCategory {
    Human,
    Mixed,
    AiGenerated,
}

impl ScoreCategory {
    pub fn of(score: f32) -> Self {
        if score < 0.3 {
            ScoreCategory::Human
        } else if score > 0.7 {
            ScoreCategory::AiGenerated
        } else {
            ScoreCategory::Mixed
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreCategory::Human => "Human",
            ScoreCategory::Mixed => "Mixed",
            ScoreCategory::AiGenerated => "AI-generated",
        }
    }
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum ColorizeError {
    #[error("Input PDF file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Opacity must be between 0.0 and 1.0 (got {0})")]
    InvalidOpacity(f32),

    #[error("No text boxes found in PDF: {}", .0.display())]
    NoTextExtracted(PathBuf),

    #[error("Model directory {} is missing {1}", .0.display())]
    ModelNotFound(PathBuf, &'static str),

    #[error("Invalid config file {}: {1}", .0.display())]
    Config(PathBuf, String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
