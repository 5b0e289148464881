//! Loss trait for shape discrepancy measurement.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rshapes_core::{PolyData, Result};

/// Loss trait for measuring discrepancy between two shapes.
///
/// The returned scalar must be differentiable with respect to the source
/// shape's point positions; the registration loop back-propagates through it.
///
/// # Type Parameters
/// * `B` - The tensor backend
pub trait Loss<B: Backend> {
    /// Calculate the discrepancy between `source` and `target`.
    ///
    /// # Errors
    /// Mismatched point counts or dimensions are a contract violation, never
    /// silently broadcast.
    fn forward(&self, source: &PolyData<B>, target: &PolyData<B>) -> Result<Tensor<B, 1>>;

    /// Get the name of this loss.
    fn name(&self) -> &'static str;
}
