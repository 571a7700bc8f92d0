// AI-text detection: language model oracle plus score mapping
//
// The language model only ever reports a mean next-token loss. Everything
// that turns that loss into a [0, 1] score lives here so it can be tested
// against stub oracles.
pub mod onnx_lm;
pub mod tokenizer;

use crate::config::NEUTRAL_SCORE;
use crate::types::TextSegment;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub use onnx_lm::OnnxLanguageModel;

/// Anything that can report the model's own cross-entropy over a text.
pub trait LanguageModel {
    /// Mean negative log-likelihood per predicted token, in nats.
    fn mean_loss(&mut self, text: &str) -> Result<f32>;
}

impl<M: LanguageModel + ?Sized> LanguageModel for Box<M> {
    fn mean_loss(&mut self, text: &str) -> Result<f32> {
        (**self).mean_loss(text)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Perplexity bucketed into fixed scores
    #[default]
    Simple,
    /// Sigmoid over the model loss
    #[value(alias = "fast-detect-gpt")]
    #[serde(alias = "fast-detect-gpt")]
    Fast,
}

/// What happened when a single text was scored.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    /// Too short to analyze; the model was never called.
    Unscored,
    Scored(f32),
    /// The model failed; a neutral score stands in.
    Fallback { reason: String },
}

impl ScoreOutcome {
    pub fn value(&self) -> f32 {
        match self {
            ScoreOutcome::Unscored => 0.0,
            ScoreOutcome::Scored(score) => *score,
            ScoreOutcome::Fallback { .. } => NEUTRAL_SCORE,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ScoreOutcome::Fallback { .. })
    }
}

/// Full result of the fast heuristic, kept for library callers.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// Raw score: the negated log-likelihood
    pub score: f32,
    pub probability: f32,
    pub log_likelihood: f32,
}

impl Detection {
    // Higher loss maps to a higher probability. This is the simplified
    // heuristic, not the curvature test, and the direction is intentional.
    pub fn from_loss(loss: f32) -> Self {
        let log_likelihood = -loss;
        let score = -log_likelihood;
        Self {
            score,
            probability: sigmoid(score),
            log_likelihood,
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub fn fast_score(loss: f32) -> f32 {
    Detection::from_loss(loss).probability
}

pub fn simple_score(loss: f32) -> f32 {
    let perplexity = loss.exp();
    if perplexity < 20.0 {
        0.9
    } else if perplexity < 50.0 {
        0.7
    } else if perplexity < 100.0 {
        0.4
    } else {
        0.2
    }
}

/// Counts from one scoring pass over a batch of segments.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScoringStats {
    pub scored: usize,
    pub unscored: usize,
    pub fallbacks: usize,
}

impl ScoringStats {
    pub fn record(&mut self, outcome: &ScoreOutcome) {
        match outcome {
            ScoreOutcome::Unscored => self.unscored += 1,
            ScoreOutcome::Scored(_) => self.scored += 1,
            ScoreOutcome::Fallback { .. } => self.fallbacks += 1,
        }
    }
}

/// Turns texts into scores using an owned language model.
pub struct Scorer<M> {
    model: M,
    kind: DetectorKind,
    min_text_length: usize,
}

impl<M: LanguageModel> Scorer<M> {
    pub fn new(model: M, kind: DetectorKind, min_text_length: usize) -> Self {
        Self {
            model,
            kind,
            min_text_length,
        }
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    pub fn min_text_length(&self) -> usize {
        self.min_text_length
    }

    pub fn score(&mut self, text: &str) -> ScoreOutcome {
        if text.trim().chars().count() < self.min_text_length {
            return ScoreOutcome::Unscored;
        }

        match self.loss(text) {
            Ok(loss) => ScoreOutcome::Scored(match self.kind {
                DetectorKind::Fast => fast_score(loss),
                DetectorKind::Simple => simple_score(loss),
            }),
            Err(e) => {
                log::warn!("Error scoring text: {:#}", e);
                ScoreOutcome::Fallback {
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    /// Writes each segment's score in place.
    pub fn score_segment(&mut self, segment: &mut TextSegment) -> ScoreOutcome {
        let outcome = self.score(&segment.text);
        segment.score = outcome.value();
        outcome
    }

    pub fn score_segments(&mut self, segments: &mut [TextSegment]) -> ScoringStats {
        let mut stats = ScoringStats::default();
        for segment in segments.iter_mut() {
            let outcome = self.score_segment(segment);
            stats.record(&outcome);
        }
        stats
    }

    /// Fast-mode detail for a single text, or `None` when it is too short.
    pub fn detect(&mut self, text: &str) -> Option<Result<Detection>> {
        if text.trim().chars().count() < self.min_text_length {
            return None;
        }
        Some(self.loss(text).map(Detection::from_loss))
    }

    fn loss(&mut self, text: &str) -> Result<f32> {
        let loss = self.model.mean_loss(text)?;
        if !loss.is_finite() {
            bail!("model returned a non-finite loss ({})", loss);
        }
        Ok(loss)
    }
}

impl Scorer<OnnxLanguageModel> {
    /// Loads the named model and wraps it in a scorer.
    pub fn from_model_name(name: &str, kind: DetectorKind, min_text_length: usize) -> Result<Self> {
        let dir = crate::config::resolve_model_dir(name)?;
        let model = OnnxLanguageModel::load(&dir)?;
        Ok(Self::new(model, kind, min_text_length))
    }
}
