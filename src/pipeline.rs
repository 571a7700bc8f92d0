// Batch run: extract -> merge -> score -> render -> legend -> summary
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::colorize::{save_colorized, RenderStats};
use crate::config::Settings;
use crate::detector::{LanguageModel, Scorer, ScoringStats};
use crate::legend::{create_legend, legend_path};
use crate::pdf_extraction::{extract_text_segments, load_pdf};
use crate::segmenter::merge_segments;
use crate::summary::{Report, ScoreSummary};
use crate::types::{ColorizeError, TextUnit};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub unit: TextUnit,
    pub merge_boxes: usize,
    pub opacity: f32,
    pub create_legend: bool,
    pub report: Option<PathBuf>,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings, report: Option<PathBuf>) -> Self {
        Self {
            unit: settings.unit_type,
            merge_boxes: settings.merge_boxes,
            opacity: settings.opacity,
            create_legend: settings.create_legend,
            report,
        }
    }
}

/// What one run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub extracted: usize,
    pub segments: usize,
    pub scoring: ScoringStats,
    pub render: RenderStats,
    pub legend: Option<PathBuf>,
    pub scores: Option<ScoreSummary>,
}

/// Fails before anything is written when the input or opacity is unusable.
pub fn check_inputs(input: &Path, opacity: f32) -> Result<(), ColorizeError> {
    if !input.exists() {
        return Err(ColorizeError::InputNotFound(input.to_path_buf()));
    }
    if !(0.0..=1.0).contains(&opacity) {
        return Err(ColorizeError::InvalidOpacity(opacity));
    }
    Ok(())
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

pub fn run<M: LanguageModel>(
    input: &Path,
    output: &Path,
    options: &PipelineOptions,
    scorer: &mut Scorer<M>,
) -> Result<RunSummary> {
    check_inputs(input, options.opacity)?;

    log::info!("[1/4] Extracting text boxes from PDF...");
    let document = load_pdf(input)?;
    let units = extract_text_segments(&document, options.unit)?;
    if units.is_empty() {
        return Err(ColorizeError::NoTextExtracted(input.to_path_buf()).into());
    }
    let extracted = units.len();
    log::info!("Found {} text boxes", extracted);

    let mut segments = match NonZeroUsize::new(options.merge_boxes).filter(|n| n.get() > 1) {
        Some(group) => {
            log::info!("[2/4] Merging adjacent text boxes (max {} per group)...", group);
            let merged = merge_segments(units, group);
            log::info!("Merged into {} segments", merged.len());
            merged
        }
        None => {
            log::info!("[2/4] Skipping merge step");
            units
        }
    };

    log::info!(
        "[3/4] Using {:?} detector (min text length {})",
        scorer.kind(),
        scorer.min_text_length()
    );

    log::info!("[4/4] Analyzing {} segments for AI content...", segments.len());
    let bar = progress_bar(segments.len());
    let mut scoring = ScoringStats::default();
    for segment in segments.iter_mut() {
        scoring.record(&scorer.score_segment(segment));
        bar.inc(1);
    }
    bar.finish_and_clear();
    log::info!(
        "Scored {} segments ({} too short, {} fallbacks)",
        scoring.scored,
        scoring.unscored,
        scoring.fallbacks
    );

    let render = save_colorized(document, &segments, options.opacity, output)?;
    if render.skipped > 0 {
        log::warn!("{} segments referenced missing pages", render.skipped);
    }

    let legend = if options.create_legend {
        let path = legend_path(output);
        create_legend(&path)?;
        Some(path)
    } else {
        None
    };

    if let Some(path) = &options.report {
        Report::new(input, output, &segments).write(path)?;
    }

    let scores = ScoreSummary::from_segments(&segments);
    match &scores {
        Some(summary) => summary.log(),
        None => log::info!("No segments received a score"),
    }

    Ok(RunSummary {
        extracted,
        segments: segments.len(),
        scoring,
        render,
        legend,
        scores,
    })
}
