//! Dense projection shared by the attention and feed-forward blocks.

use candle_core::Tensor;

use crate::error::{EmbedError, EmbedResult};

/// `x @ weight^T + bias` for `x: [N, in]`, `weight: [out, in]`, `bias: [out]`.
///
/// `context` names the projection in failure messages ("layer 3 query").
pub(crate) fn linear(
    x: &Tensor,
    weight: &Tensor,
    bias: &Tensor,
    context: &str,
) -> EmbedResult<Tensor> {
    let weight_t = weight.t().map_err(|e| EmbedError::Compute {
        message: format!("{context} weight transpose failed: {e}"),
    })?;
    let projected = x.matmul(&weight_t).map_err(|e| EmbedError::Compute {
        message: format!("{context} matmul failed: {e}"),
    })?;
    projected.broadcast_add(bias).map_err(|e| EmbedError::Compute {
        message: format!("{context} bias add failed: {e}"),
    })
}
