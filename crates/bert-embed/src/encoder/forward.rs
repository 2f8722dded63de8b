//! Whole-batch forward pass orchestration.

use candle_core::Tensor;

use crate::error::{EmbedError, EmbedResult};
use crate::model::BertWeights;
use crate::vocab::TokenId;

use super::embeddings::compute_embeddings;
use super::inputs::build_inputs;
use super::layer::encoder_layer_forward;
use super::pooling::pool_and_normalize;

/// Run the encoder over a tokenized batch and return `[B, E]` unit vectors.
pub(crate) fn forward_batch(
    weights: &BertWeights,
    pad_id: TokenId,
    batch: &[Vec<TokenId>],
) -> EmbedResult<Tensor> {
    let inputs = build_inputs(batch, &weights.hparams, pad_id, weights.device())?;
    tracing::debug!(
        target: "bert_embed::encoder",
        batch_size = inputs.batch_size,
        seq_len = inputs.seq_len,
        "forward"
    );

    let attn_mask = attention_mask(&inputs.pad_mask)?;

    let mut hidden = compute_embeddings(&inputs, weights)?;
    for (layer_idx, layer) in weights.encoder_layers.iter().enumerate() {
        hidden = encoder_layer_forward(&hidden, layer, &attn_mask, &weights.hparams, layer_idx)?;
    }

    pool_and_normalize(&hidden, &inputs.pool_weights)
}

/// Additive attention mask from the padding mask.
///
/// Outer product of the mask with itself gives 1.0 exactly where both the
/// query and the key position are valid; `(m - 1) * 1e5` turns that into 0.0
/// for valid pairs and -1e5 everywhere else, which softmax flushes to zero
/// weight. The 1e5 magnitude is deliberate: enough to underflow after the
/// softmax shift, small enough to stay finite in half precision.
///
/// `pad_mask: [B, L]` -> `[B, 1, L, L]`, broadcast over heads.
fn attention_mask(pad_mask: &Tensor) -> EmbedResult<Tensor> {
    let queries = pad_mask.unsqueeze(2).map_err(|e| EmbedError::Compute {
        message: format!("mask query expand failed: {e}"),
    })?;
    let keys = pad_mask.unsqueeze(1).map_err(|e| EmbedError::Compute {
        message: format!("mask key expand failed: {e}"),
    })?;
    let outer = queries.matmul(&keys).map_err(|e| EmbedError::Compute {
        message: format!("mask outer product failed: {e}"),
    })?;

    let additive = ((outer - 1.0).and_then(|m| m * 1e5)).map_err(|e| EmbedError::Compute {
        message: format!("mask scale failed: {e}"),
    })?;
    additive.unsqueeze(1).map_err(|e| EmbedError::Compute {
        message: format!("mask head broadcast failed: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    #[test]
    fn mask_is_zero_for_valid_pairs_and_large_negative_otherwise() {
        let device = Device::Cpu;
        let pad = Tensor::from_slice(&[1.0f32, 1.0, 1.0, 0.0], (2, 2), &device).unwrap();

        let mask = attention_mask(&pad).unwrap();
        assert_eq!(mask.dims(), &[2, 1, 2, 2]);

        let values: Vec<f32> = mask.flatten_all().unwrap().to_vec1().unwrap();
        // row 0: no padding, all pairs valid
        assert_eq!(&values[..4], &[0.0, 0.0, 0.0, 0.0]);
        // row 1: position 1 is padding; only the (0, 0) pair stays
        assert_eq!(values[4], 0.0);
        assert_eq!(values[5], -1e5);
        assert_eq!(values[6], -1e5);
        assert_eq!(values[7], -1e5);
    }
}
