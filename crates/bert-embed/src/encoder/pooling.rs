//! Mean pooling over valid positions and L2 normalization.

use candle_core::{Tensor, D};

use crate::error::{EmbedError, EmbedResult};

/// Pool `hidden: [B, L, E]` with precomputed weights `[B, 1, L]` (already
/// `1/n_b` on valid positions, zero on padding), then normalize each row to
/// unit length. Returns `[B, E]`.
pub(crate) fn pool_and_normalize(
    hidden: &Tensor,
    pool_weights: &Tensor,
) -> EmbedResult<Tensor> {
    let pooled = pool_weights
        .matmul(hidden)
        .map_err(|e| EmbedError::Compute {
            message: format!("mean pooling matmul failed: {e}"),
        })?
        .squeeze(1)
        .map_err(|e| EmbedError::Compute {
            message: format!("pooled squeeze failed: {e}"),
        })?;
    normalize_l2(&pooled)
}

/// Row-wise `t / ||t||_2`. The epsilon keeps an all-zero row finite.
pub(crate) fn normalize_l2(t: &Tensor) -> EmbedResult<Tensor> {
    let norm = t
        .sqr()
        .and_then(|sq| sq.sum_keepdim(D::Minus1))
        .and_then(|s| s.sqrt())
        .map_err(|e| EmbedError::Compute {
            message: format!("norm computation failed: {e}"),
        })?;
    let norm = (norm + 1e-12).map_err(|e| EmbedError::Compute {
        message: format!("norm epsilon add failed: {e}"),
    })?;
    t.broadcast_div(&norm).map_err(|e| EmbedError::Compute {
        message: format!("norm divide failed: {e}"),
    })
}
