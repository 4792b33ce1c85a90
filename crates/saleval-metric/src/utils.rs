//! Host-side helpers shared by the metrics.

use burn::tensor::{backend::Backend, Tensor};

use crate::error::{MetricError, MetricResult};

/// Copies a tensor's values to the host as `f32`, in row-major order.
pub fn host_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> MetricResult<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| MetricError::TensorConversion {
            reason: format!("{e:?}"),
        })
}

/// Safe ratio used by every precision/recall computation.
#[inline]
pub(crate) fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    numerator / (denominator + crate::EPSILON)
}
