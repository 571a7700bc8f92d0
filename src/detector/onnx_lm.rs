// Causal language model served by ONNX Runtime
use anyhow::{anyhow, bail, Context, Result};
use ndarray::ArrayView2;
use ort::{
    inputs,
    session::builder::GraphOptimizationLevel,
    session::Session,
    value::Value,
};
use std::path::Path;

use super::tokenizer::LmTokenizer;
use super::LanguageModel;
use crate::config::{MAX_TOKENS, MODEL_FILE, TOKENIZER_FILE};

/// GPT-2 family model exported with `logits` as its first output.
pub struct OnnxLanguageModel {
    session: Session,
    tokenizer: LmTokenizer,
    wants_position_ids: bool,
}

impl OnnxLanguageModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        log::info!("Loading language model from {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .with_context(|| format!("failed to load {}", model_path.display()))?;

        let wants_position_ids = session.inputs.iter().any(|i| i.name == "position_ids");
        log::debug!(
            "Model inputs: {:?}",
            session.inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>()
        );

        let tokenizer = LmTokenizer::from_file(&model_dir.join(TOKENIZER_FILE), MAX_TOKENS)?;

        Ok(Self {
            session,
            tokenizer,
            wants_position_ids,
        })
    }
}

impl LanguageModel for OnnxLanguageModel {
    fn mean_loss(&mut self, text: &str) -> Result<f32> {
        let ids = self.tokenizer.encode(text)?;
        let n = ids.len();
        if n < 2 {
            bail!("need at least two tokens to compute a loss, got {}", n);
        }

        let input_ids = Value::from_array(([1_usize, n], ids.clone().into_boxed_slice()))?;
        let attention_mask = Value::from_array(([1_usize, n], vec![1_i64; n].into_boxed_slice()))?;

        let outputs = if self.wants_position_ids {
            let positions: Vec<i64> = (0..n as i64).collect();
            let position_ids = Value::from_array(([1_usize, n], positions.into_boxed_slice()))?;
            self.session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "position_ids" => position_ids
            ])?
        } else {
            self.session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            ])?
        };

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        if shape.len() != 3 {
            bail!("expected logits of rank 3, got shape {:?}", shape);
        }
        let seq = shape[1] as usize;
        let vocab = shape[2] as usize;
        if seq != n {
            bail!("logits cover {} positions but {} tokens were fed", seq, n);
        }

        let logits = ArrayView2::from_shape((seq, vocab), &data[..seq * vocab])
            .map_err(|e| anyhow!("bad logits layout: {}", e))?;
        next_token_loss(logits, &ids)
    }
}

/// Mean cross-entropy of predicting `ids[t + 1]` from row `t` of `logits`.
pub fn next_token_loss(logits: ArrayView2<f32>, ids: &[i64]) -> Result<f32> {
    if ids.len() < 2 || logits.nrows() < ids.len() - 1 {
        bail!("not enough positions to compute a loss");
    }
    let vocab = logits.ncols();

    let mut total = 0.0_f64;
    for (t, target) in ids.iter().skip(1).enumerate() {
        let target = usize::try_from(*target)
            .ok()
            .filter(|&id| id < vocab)
            .ok_or_else(|| anyhow!("token id {} outside vocabulary of {}", target, vocab))?;

        let row = logits.row(t);
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        let sum: f64 = row.iter().map(|&v| ((v - max) as f64).exp()).sum();
        let log_sum_exp = max as f64 + sum.ln();
        total += log_sum_exp - row[target] as f64;
    }

    Ok((total / (ids.len() - 1) as f64) as f32)
}
