//! Layer normalization over the hidden dimension.

use candle_core::{Tensor, D};

use crate::error::{EmbedError, EmbedResult};

/// `(x - mean) / sqrt(var + eps) * weight + bias`, normalizing the last axis.
pub(crate) fn layer_norm(
    x: &Tensor,
    weight: &Tensor,
    bias: &Tensor,
    eps: f64,
    context: &str,
) -> EmbedResult<Tensor> {
    let mean = x.mean_keepdim(D::Minus1).map_err(|e| EmbedError::Compute {
        message: format!("{context} layer norm mean failed: {e}"),
    })?;
    let centered = x.broadcast_sub(&mean).map_err(|e| EmbedError::Compute {
        message: format!("{context} layer norm center failed: {e}"),
    })?;
    let var = centered
        .sqr()
        .and_then(|sq| sq.mean_keepdim(D::Minus1))
        .map_err(|e| EmbedError::Compute {
            message: format!("{context} layer norm variance failed: {e}"),
        })?;
    let std = (var + eps)
        .and_then(|v| v.sqrt())
        .map_err(|e| EmbedError::Compute {
            message: format!("{context} layer norm sqrt failed: {e}"),
        })?;
    let normalized = centered.broadcast_div(&std).map_err(|e| EmbedError::Compute {
        message: format!("{context} layer norm divide failed: {e}"),
    })?;
    normalized
        .broadcast_mul(weight)
        .and_then(|scaled| scaled.broadcast_add(bias))
        .map_err(|e| EmbedError::Compute {
            message: format!("{context} layer norm affine failed: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    #[test]
    fn normalizes_each_row_to_zero_mean_unit_variance() {
        let device = Device::Cpu;
        let x = Tensor::from_slice(&[1.0f32, 3.0, -2.0, 2.0], (2, 2), &device).unwrap();
        let w = Tensor::from_slice(&[1.0f32, 1.0], 2, &device).unwrap();
        let b = Tensor::from_slice(&[0.0f32, 0.0], 2, &device).unwrap();

        let y = layer_norm(&x, &w, &b, 1e-12, "test").unwrap();
        let rows = y.to_vec2::<f32>().unwrap();
        for row in rows {
            assert!((row[0] + 1.0).abs() < 1e-4, "row {row:?}");
            assert!((row[1] - 1.0).abs() < 1e-4, "row {row:?}");
        }
    }

    #[test]
    fn scale_and_shift_are_applied_after_normalization() {
        let device = Device::Cpu;
        let x = Tensor::from_slice(&[0.0f32, 2.0], (1, 2), &device).unwrap();
        let w = Tensor::from_slice(&[2.0f32, 2.0], 2, &device).unwrap();
        let b = Tensor::from_slice(&[1.0f32, 1.0], 2, &device).unwrap();

        let y = layer_norm(&x, &w, &b, 1e-12, "test").unwrap();
        let row = &y.to_vec2::<f32>().unwrap()[0];
        assert!((row[0] + 1.0).abs() < 1e-4);
        assert!((row[1] - 3.0).abs() < 1e-4);
    }
}
