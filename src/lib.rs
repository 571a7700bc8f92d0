// Colorize PDF text by how likely it is to be machine-generated
pub mod colorize;
pub mod config;
pub mod detector;
pub mod legend;
pub mod pdf_extraction;
pub mod pipeline;
pub mod segmenter;
pub mod summary;
pub mod types;

pub use detector::{DetectorKind, LanguageModel, ScoreOutcome, Scorer};
pub use pipeline::{run, PipelineOptions, RunSummary};
pub use types::{ColorizeError, Rect, ScoreCategory, TextSegment, TextUnit};
