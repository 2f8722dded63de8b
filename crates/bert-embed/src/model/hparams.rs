//! Encoder hyperparameters as stored in container metadata.

use crate::error::{EmbedError, EmbedResult};

/// Hyperparameters of a BERT-family encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hparams {
    /// Vocabulary size.
    pub n_vocab: usize,
    /// Maximum position count (and the tokenizer's hard cap).
    pub n_max_tokens: usize,
    /// Hidden width.
    pub n_embd: usize,
    /// Feed-forward intermediate width.
    pub n_intermediate: usize,
    /// Attention head count.
    pub n_head: usize,
    /// Encoder layer count.
    pub n_layer: usize,
    /// Layer-norm epsilon.
    pub layer_norm_eps: f32,
}

impl Hparams {
    /// Per-head width. Only meaningful after [`Hparams::validate`].
    pub fn head_dim(&self) -> usize {
        self.n_embd / self.n_head
    }

    /// Reject head counts that do not divide the hidden width.
    pub fn validate(&self) -> EmbedResult<()> {
        if self.n_head == 0 || self.n_embd % self.n_head != 0 {
            return Err(EmbedError::BadShape {
                message: format!(
                    "hidden size {} is not divisible by head count {}",
                    self.n_embd, self.n_head
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minilm() -> Hparams {
        Hparams {
            n_vocab: 30522,
            n_max_tokens: 512,
            n_embd: 384,
            n_intermediate: 1536,
            n_head: 12,
            n_layer: 6,
            layer_norm_eps: 1e-12,
        }
    }

    #[test]
    fn minilm_shape_is_valid() {
        let hp = minilm();
        hp.validate().unwrap();
        assert_eq!(hp.head_dim(), 32);
    }

    #[test]
    fn indivisible_head_count_is_rejected() {
        let hp = Hparams { n_head: 5, ..minilm() };
        assert!(matches!(hp.validate(), Err(EmbedError::BadShape { .. })));
    }

    #[test]
    fn zero_heads_are_rejected() {
        let hp = Hparams { n_head: 0, ..minilm() };
        assert!(matches!(hp.validate(), Err(EmbedError::BadShape { .. })));
    }
}
