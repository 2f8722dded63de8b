//! Feed-forward block: intermediate projection, GELU, output projection.

use candle_core::Tensor;

use crate::error::{EmbedError, EmbedResult};
use crate::model::FfnWeights;

use super::linear::linear;

/// `hidden: [B, L, E]` -> `[B, L, E]`. Residual and norm live in the caller.
pub(crate) fn ffn_forward(
    hidden: &Tensor,
    ffn: &FfnWeights,
    layer_idx: usize,
) -> EmbedResult<Tensor> {
    let (batch_size, seq_len, hidden_size) = hidden.dims3().map_err(|e| EmbedError::Compute {
        message: format!("layer {layer_idx} ffn dims failed: {e}"),
    })?;

    let hidden_flat = hidden
        .reshape((batch_size * seq_len, hidden_size))
        .map_err(|e| EmbedError::Compute {
            message: format!("layer {layer_idx} ffn flatten failed: {e}"),
        })?;

    let intermediate = linear(
        &hidden_flat,
        &ffn.intermediate_weight,
        &ffn.intermediate_bias,
        &format!("layer {layer_idx} ffn intermediate"),
    )?;
    let intermediate = intermediate.gelu().map_err(|e| EmbedError::Compute {
        message: format!("layer {layer_idx} gelu failed: {e}"),
    })?;

    let output = linear(
        &intermediate,
        &ffn.output_weight,
        &ffn.output_bias,
        &format!("layer {layer_idx} ffn output"),
    )?;
    output
        .reshape((batch_size, seq_len, hidden_size))
        .map_err(|e| EmbedError::Compute {
            message: format!("layer {layer_idx} ffn reshape failed: {e}"),
        })
}
