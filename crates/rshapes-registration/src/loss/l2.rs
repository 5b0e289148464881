//! L_p norm loss on point positions.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rshapes_core::{Error, PolyData, Result};

use super::trait_::Loss;

/// L_p norm of the point-position difference (default p = 2).
///
/// Requires both shapes to have the same point count and dimension.
#[derive(Debug, Clone)]
pub struct L2Loss {
    order: f64,
}

impl L2Loss {
    /// Create an L2 (Euclidean) loss.
    pub fn new() -> Self {
        Self { order: 2.0 }
    }

    /// Create an L_p loss with the given order.
    ///
    /// # Errors
    /// Returns an invalid configuration error unless `order >= 1`.
    pub fn with_order(order: f64) -> Result<Self> {
        if !order.is_finite() || order < 1.0 {
            return Err(Error::invalid_configuration(format!(
                "norm order must be finite and >= 1, got {order}"
            )));
        }
        Ok(Self { order })
    }

    /// Norm order.
    pub fn order(&self) -> f64 {
        self.order
    }
}

impl Default for L2Loss {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Loss<B> for L2Loss {
    fn forward(&self, source: &PolyData<B>, target: &PolyData<B>) -> Result<Tensor<B, 1>> {
        let expected = target.points().dims();
        let actual = source.points().dims();
        if expected != actual {
            return Err(Error::shape_mismatch(&expected, &actual));
        }

        let diff = source.points() - target.points();
        // The p-th root has no gradient at exact coincidence; clamping the
        // summed power keeps it finite there.
        let total = diff.abs().powf_scalar(self.order).sum().clamp_min(1e-12);
        Ok(total.powf_scalar(1.0 / self.order))
    }

    fn name(&self) -> &'static str {
        "L2Loss"
    }
}
