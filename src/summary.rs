// Run statistics and the optional JSON report
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::types::{ScoreCategory, TextSegment};

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryCount {
    pub count: usize,
    pub percent: f32,
}

/// Statistics over the segments that received a positive score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub scored: usize,
    pub average: f32,
    pub min: f32,
    pub max: f32,
    pub human: CategoryCount,
    pub mixed: CategoryCount,
    pub ai_generated: CategoryCount,
}

impl ScoreSummary {
    /// `None` when no segment was scored above zero.
    pub fn from_segments(segments: &[TextSegment]) -> Option<Self> {
        let scores: Vec<f32> = segments.iter().map(|s| s.score).filter(|&s| s > 0.0).collect();
        if scores.is_empty() {
            return None;
        }

        let total = scores.len();
        let mut counts = [0usize; 3];
        for &score in &scores {
            let slot = match ScoreCategory::of(score) {
                ScoreCategory::Human => 0,
                ScoreCategory::Mixed => 1,
                ScoreCategory::AiGenerated => 2,
            };
            counts[slot] += 1;
        }
        let share = |count: usize| CategoryCount {
            count,
            percent: count as f32 * 100.0 / total as f32,
        };

        Some(Self {
            scored: total,
            average: scores.iter().sum::<f32>() / total as f32,
            min: scores.iter().copied().fold(f32::INFINITY, f32::min),
            max: scores.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            human: share(counts[0]),
            mixed: share(counts[1]),
            ai_generated: share(counts[2]),
        })
    }

    pub fn log(&self) {
        log::info!("Summary statistics:");
        log::info!("  Segments scored: {}", self.scored);
        log::info!("  Average AI score: {:.3}", self.average);
        log::info!("  Min score: {:.3}", self.min);
        log::info!("  Max score: {:.3}", self.max);
        log::info!(
            "  Human-like (< 0.3): {} ({:.1}%)",
            self.human.count,
            self.human.percent
        );
        log::info!(
            "  Mixed (0.3 - 0.7): {} ({:.1}%)",
            self.mixed.count,
            self.mixed.percent
        );
        log::info!(
            "  AI-like (> 0.7): {} ({:.1}%)",
            self.ai_generated.count,
            self.ai_generated.percent
        );
    }
}

#[derive(Debug, Serialize)]
pub struct SegmentReport<'a> {
    pub page_index: usize,
    pub text: &'a str,
    pub region: [f32; 4],
    pub score: f32,
    pub category: ScoreCategory,
}

impl<'a> From<&'a TextSegment> for SegmentReport<'a> {
    fn from(segment: &'a TextSegment) -> Self {
        let r = segment.region;
        Self {
            page_index: segment.page_index,
            text: &segment.text,
            region: [r.x0, r.y0, r.x1, r.y1],
            score: segment.score,
            category: ScoreCategory::of(segment.score),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub summary: Option<ScoreSummary>,
    pub segments: Vec<SegmentReport<'a>>,
}

impl<'a> Report<'a> {
    pub fn new(input: &'a Path, output: &'a Path, segments: &'a [TextSegment]) -> Self {
        Self {
            input,
            output,
            summary: ScoreSummary::from_segments(segments),
            segments: segments.iter().map(SegmentReport::from).collect(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        log::info!("Saved report to {}", path.display());
        Ok(())
    }
}
