// GPT-2 style BPE tokenizer wrapper
use anyhow::{anyhow, Result};
use std::path::Path;
use tokenizers::tokenizer::Tokenizer;

pub struct LmTokenizer {
    tokenizer: Tokenizer,
    max_tokens: usize,
}

impl LmTokenizer {
    pub fn from_file(path: &Path, max_tokens: usize) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("failed to load tokenizer {}: {}", path.display(), e))?;
        log::debug!("Loaded tokenizer with {} tokens", tokenizer.get_vocab_size(true));
        Ok(Self {
            tokenizer,
            max_tokens,
        })
    }

    /// Token ids for `text`, truncated to the model's context budget.
    pub fn encode(&self, text: &str) -> Result<Vec<i64>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("tokenization failed: {}", e))?;
        Ok(truncate_ids(encoding.get_ids(), self.max_tokens))
    }
}

fn truncate_ids(ids: &[u32], max_tokens: usize) -> Vec<i64> {
    ids.iter().take(max_tokens).map(|&id| id as i64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_keeps_leading_tokens() {
        let ids: Vec<u32> = (0..600).collect();
        let kept = truncate_ids(&ids, 512);
        assert_eq!(kept.len(), 512);
        assert_eq!(kept[0], 0);
        assert_eq!(kept[511], 511);
        assert_eq!(truncate_ids(&ids[..3], 512), vec![0, 1, 2]);
    }
}
