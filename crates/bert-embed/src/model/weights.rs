//! Typed weight catalog bound to a compute device.
//!
//! Every struct owns its tensors; layer records never alias each other. The
//! catalog is read-only after load and may be shared across threads.

use candle_core::{Device, Tensor};

use super::hparams::Hparams;

/// Embedding tables and the embedding-layer norm.
#[derive(Debug)]
pub struct EmbeddingWeights {
    /// `[n_vocab, n_embd]`
    pub word_embeddings: Tensor,
    /// `[2, n_embd]`; only row 0 is consumed by single-segment encoding.
    pub token_type_embeddings: Tensor,
    /// `[n_max_tokens, n_embd]`
    pub position_embeddings: Tensor,
    pub layer_norm_weight: Tensor,
    pub layer_norm_bias: Tensor,
}

/// Self-attention projections plus the post-attention layer norm.
#[derive(Debug)]
pub struct AttentionWeights {
    pub query_weight: Tensor,
    pub query_bias: Tensor,
    pub key_weight: Tensor,
    pub key_bias: Tensor,
    pub value_weight: Tensor,
    pub value_bias: Tensor,
    pub output_weight: Tensor,
    pub output_bias: Tensor,
    pub layer_norm_weight: Tensor,
    pub layer_norm_bias: Tensor,
}

/// Feed-forward projections plus the layer-output norm.
#[derive(Debug)]
pub struct FfnWeights {
    /// `[n_intermediate, n_embd]`
    pub intermediate_weight: Tensor,
    pub intermediate_bias: Tensor,
    /// `[n_embd, n_intermediate]`
    pub output_weight: Tensor,
    pub output_bias: Tensor,
    pub layer_norm_weight: Tensor,
    pub layer_norm_bias: Tensor,
}

/// One encoder layer: sixteen named tensors.
#[derive(Debug)]
pub struct EncoderLayerWeights {
    pub attention: AttentionWeights,
    pub ffn: FfnWeights,
}

/// The full encoder: hyperparameters, embedding tables, and one
/// [`EncoderLayerWeights`] per layer.
#[derive(Debug)]
pub struct BertWeights {
    pub hparams: Hparams,
    pub embeddings: EmbeddingWeights,
    pub encoder_layers: Vec<EncoderLayerWeights>,
    device: Device,
    param_count: usize,
    param_bytes: usize,
}

impl BertWeights {
    pub(crate) fn new(
        hparams: Hparams,
        embeddings: EmbeddingWeights,
        encoder_layers: Vec<EncoderLayerWeights>,
        device: Device,
        param_count: usize,
        param_bytes: usize,
    ) -> Self {
        Self {
            hparams,
            embeddings,
            encoder_layers,
            device,
            param_count,
            param_bytes,
        }
    }

    /// Device the parameter buffers live on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Total scalar parameter count across all bound tensors.
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Container-reported byte total of all tensor blobs.
    pub fn param_bytes(&self) -> usize {
        self.param_bytes
    }
}
