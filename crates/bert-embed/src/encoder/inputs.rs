//! Host-side batch preparation: padding, masks, pooling weights.

use candle_core::{Device, Tensor};

use crate::error::{EmbedError, EmbedResult};
use crate::model::Hparams;
use crate::vocab::TokenId;

/// Device tensors describing one padded batch.
///
/// Gather indices are kept flat (`[B·L]`) and reshaped after lookup; the
/// float tensors carry their batch shape.
#[derive(Debug)]
pub(crate) struct EncoderInputs {
    /// `u32 [B·L]`, padding positions filled with the pad id.
    pub input_ids: Tensor,
    /// `u32 [B·L]`, all zeros (single-segment encoding).
    pub token_type_ids: Tensor,
    /// `u32 [B·L]`, `i` at position `(b, i)`.
    pub position_ids: Tensor,
    /// `f32 [B, L]`, 1.0 on valid positions, 0.0 on padding.
    pub pad_mask: Tensor,
    /// `f32 [B, 1, L]`, `1/n_b` on valid positions, 0.0 on padding. One
    /// matmul against the final hidden states performs the mean pool.
    pub pool_weights: Tensor,
    pub batch_size: usize,
    pub seq_len: usize,
}

/// Pad the batch to its longest sequence and upload the input tensors.
pub(crate) fn build_inputs(
    batch: &[Vec<TokenId>],
    hparams: &Hparams,
    pad_id: TokenId,
    device: &Device,
) -> EmbedResult<EncoderInputs> {
    let batch_size = batch.len();
    let seq_len = batch.iter().map(Vec::len).max().unwrap_or(0);
    if batch_size == 0 || seq_len == 0 {
        return Err(EmbedError::EmptyBatch);
    }
    if seq_len > hparams.n_max_tokens {
        return Err(EmbedError::BatchTooLong {
            actual: seq_len,
            max: hparams.n_max_tokens,
        });
    }

    let elems = batch_size * seq_len;
    let mut ids = Vec::with_capacity(elems);
    let mut positions = Vec::with_capacity(elems);
    let mut mask = Vec::with_capacity(elems);
    let mut pool = Vec::with_capacity(elems);

    for seq in batch {
        let inv_len = 1.0 / seq.len() as f32;
        for i in 0..seq_len {
            positions.push(i as u32);
            if let Some(&id) = seq.get(i) {
                ids.push(id);
                mask.push(1.0f32);
                pool.push(inv_len);
            } else {
                ids.push(pad_id);
                mask.push(0.0f32);
                pool.push(0.0f32);
            }
        }
    }

    let input_ids = Tensor::from_vec(ids, elems, device).map_err(|e| alloc("input_ids", e))?;
    let token_type_ids =
        Tensor::from_vec(vec![0u32; elems], elems, device).map_err(|e| alloc("token_type_ids", e))?;
    let position_ids =
        Tensor::from_vec(positions, elems, device).map_err(|e| alloc("position_ids", e))?;
    let pad_mask = Tensor::from_vec(mask, (batch_size, seq_len), device)
        .map_err(|e| alloc("pad_mask", e))?;
    let pool_weights = Tensor::from_vec(pool, (batch_size, 1, seq_len), device)
        .map_err(|e| alloc("pool_weights", e))?;

    Ok(EncoderInputs {
        input_ids,
        token_type_ids,
        position_ids,
        pad_mask,
        pool_weights,
        batch_size,
        seq_len,
    })
}

fn alloc(name: &str, e: candle_core::Error) -> EmbedError {
    EmbedError::AllocFailed {
        message: format!("input tensor {name}: {e}"),
    }
}
