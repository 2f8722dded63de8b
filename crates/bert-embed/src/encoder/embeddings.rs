//! Input embedding: word + token-type + position lookups, then layer norm.

use candle_core::Tensor;

use crate::error::{EmbedError, EmbedResult};
use crate::model::BertWeights;

use super::inputs::EncoderInputs;
use super::layer_norm::layer_norm;

/// Gather the three embedding tables for the batch and normalize.
///
/// Returns `[B, L, E]`.
pub(crate) fn compute_embeddings(
    inputs: &EncoderInputs,
    weights: &BertWeights,
) -> EmbedResult<Tensor> {
    let shape = (
        inputs.batch_size,
        inputs.seq_len,
        weights.hparams.n_embd,
    );

    let word = gather(
        &weights.embeddings.word_embeddings,
        &inputs.input_ids,
        shape,
        "word embedding",
    )?;
    let token_type = gather(
        &weights.embeddings.token_type_embeddings,
        &inputs.token_type_ids,
        shape,
        "token type embedding",
    )?;
    let position = gather(
        &weights.embeddings.position_embeddings,
        &inputs.position_ids,
        shape,
        "position embedding",
    )?;

    let summed = (&word + &token_type)
        .and_then(|x| &x + &position)
        .map_err(|e| EmbedError::Compute {
            message: format!("embedding sum failed: {e}"),
        })?;

    layer_norm(
        &summed,
        &weights.embeddings.layer_norm_weight,
        &weights.embeddings.layer_norm_bias,
        weights.hparams.layer_norm_eps as f64,
        "embedding",
    )
}

/// Row-gather `table[ids]` and reshape to the batch layout.
fn gather(
    table: &Tensor,
    ids: &Tensor,
    shape: (usize, usize, usize),
    context: &str,
) -> EmbedResult<Tensor> {
    table
        .index_select(ids, 0)
        .map_err(|e| EmbedError::Compute {
            message: format!("{context} lookup failed: {e}"),
        })?
        .reshape(shape)
        .map_err(|e| EmbedError::Compute {
            message: format!("{context} reshape failed: {e}"),
        })
}
