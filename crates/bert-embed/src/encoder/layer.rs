//! One encoder layer: attention and FFN with residuals and layer norms.

use candle_core::Tensor;

use crate::error::{EmbedError, EmbedResult};
use crate::model::{EncoderLayerWeights, Hparams};

use super::attention::self_attention_forward;
use super::ffn::ffn_forward;
use super::layer_norm::layer_norm;

/// `hidden: [B, L, E]` -> `[B, L, E]`.
pub(crate) fn encoder_layer_forward(
    hidden: &Tensor,
    layer: &EncoderLayerWeights,
    attn_mask: &Tensor,
    hparams: &Hparams,
    layer_idx: usize,
) -> EmbedResult<Tensor> {
    let eps = hparams.layer_norm_eps as f64;

    let attention_output =
        self_attention_forward(hidden, &layer.attention, attn_mask, hparams, layer_idx)?;

    let attention_output = (hidden + &attention_output).map_err(|e| EmbedError::Compute {
        message: format!("layer {layer_idx} attention residual failed: {e}"),
    })?;
    let attention_output = layer_norm(
        &attention_output,
        &layer.attention.layer_norm_weight,
        &layer.attention.layer_norm_bias,
        eps,
        &format!("layer {layer_idx} attention"),
    )?;

    let ffn_output = ffn_forward(&attention_output, &layer.ffn, layer_idx)?;

    let output = (&attention_output + &ffn_output).map_err(|e| EmbedError::Compute {
        message: format!("layer {layer_idx} ffn residual failed: {e}"),
    })?;
    layer_norm(
        &output,
        &layer.ffn.layer_norm_weight,
        &layer.ffn.layer_norm_bias,
        eps,
        &format!("layer {layer_idx} output"),
    )
}
