//! Masked multi-head self-attention.

use candle_core::Tensor;

use crate::error::{EmbedError, EmbedResult};
use crate::model::{AttentionWeights, Hparams};

use super::linear::linear;

/// One attention block: Q/K/V projections, scaled masked scores, context
/// mix, output projection. Residual and layer norm live in the caller.
///
/// `hidden: [B, L, E]`, `attn_mask: [B, 1, L, L]` additive. Returns
/// `[B, L, E]`.
pub(crate) fn self_attention_forward(
    hidden: &Tensor,
    attention: &AttentionWeights,
    attn_mask: &Tensor,
    hparams: &Hparams,
    layer_idx: usize,
) -> EmbedResult<Tensor> {
    let (batch_size, seq_len, hidden_size) = hidden.dims3().map_err(|e| EmbedError::Compute {
        message: format!("layer {layer_idx} hidden dims failed: {e}"),
    })?;
    let n_head = hparams.n_head;
    let head_dim = hparams.head_dim();

    let hidden_flat = hidden
        .reshape((batch_size * seq_len, hidden_size))
        .map_err(|e| EmbedError::Compute {
            message: format!("layer {layer_idx} hidden flatten failed: {e}"),
        })?;

    let query = linear(
        &hidden_flat,
        &attention.query_weight,
        &attention.query_bias,
        &format!("layer {layer_idx} query"),
    )?;
    let key = linear(
        &hidden_flat,
        &attention.key_weight,
        &attention.key_bias,
        &format!("layer {layer_idx} key"),
    )?;
    let value = linear(
        &hidden_flat,
        &attention.value_weight,
        &attention.value_bias,
        &format!("layer {layer_idx} value"),
    )?;

    // [B·L, E] -> [B, H, L, D]
    let query = split_heads(&query, batch_size, seq_len, n_head, head_dim, layer_idx, "Q")?;
    let key = split_heads(&key, batch_size, seq_len, n_head, head_dim, layer_idx, "K")?;
    let value = split_heads(&value, batch_size, seq_len, n_head, head_dim, layer_idx, "V")?;

    let key_t = key
        .transpose(2, 3)
        .and_then(|t| t.contiguous())
        .map_err(|e| EmbedError::Compute {
            message: format!("layer {layer_idx} K transpose failed: {e}"),
        })?;

    // [B, H, L, L], scaled by 1/sqrt(D)
    let scores = query
        .matmul(&key_t)
        .map_err(|e| EmbedError::Compute {
            message: format!("layer {layer_idx} score matmul failed: {e}"),
        })?;
    let scores = (scores / (head_dim as f64).sqrt()).map_err(|e| EmbedError::Compute {
        message: format!("layer {layer_idx} score scale failed: {e}"),
    })?;
    let scores = scores
        .broadcast_add(attn_mask)
        .map_err(|e| EmbedError::Compute {
            message: format!("layer {layer_idx} mask add failed: {e}"),
        })?;

    // softmax along the key axis
    let probs = candle_nn::ops::softmax(&scores, candle_core::D::Minus1).map_err(|e| {
        EmbedError::Compute {
            message: format!("layer {layer_idx} softmax failed: {e}"),
        }
    })?;

    // [B, H, L, D] -> [B, L, E]
    let context = probs.matmul(&value).map_err(|e| EmbedError::Compute {
        message: format!("layer {layer_idx} context matmul failed: {e}"),
    })?;
    let context = context
        .transpose(1, 2)
        .and_then(|t| t.contiguous())
        .and_then(|t| t.reshape((batch_size * seq_len, hidden_size)))
        .map_err(|e| EmbedError::Compute {
            message: format!("layer {layer_idx} context merge failed: {e}"),
        })?;

    let output = linear(
        &context,
        &attention.output_weight,
        &attention.output_bias,
        &format!("layer {layer_idx} attention output"),
    )?;
    output
        .reshape((batch_size, seq_len, hidden_size))
        .map_err(|e| EmbedError::Compute {
            message: format!("layer {layer_idx} attention output reshape failed: {e}"),
        })
}

fn split_heads(
    projected: &Tensor,
    batch_size: usize,
    seq_len: usize,
    n_head: usize,
    head_dim: usize,
    layer_idx: usize,
    which: &str,
) -> EmbedResult<Tensor> {
    projected
        .reshape((batch_size, seq_len, n_head, head_dim))
        .and_then(|t| t.transpose(1, 2))
        .and_then(|t| t.contiguous())
        .map_err(|e| EmbedError::Compute {
            message: format!("layer {layer_idx} {which} head split failed: {e}"),
        })
}
