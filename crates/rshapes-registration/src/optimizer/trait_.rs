//! Optimizer trait for parameter optimization.
//!
//! This module defines the closure-driven Optimizer trait that all
//! optimization strategies implement for fitting registrations.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rshapes_core::Result;

/// One evaluation of the objective: scalar value plus gradient with respect
/// to the parameter.
pub struct Evaluation<B: Backend> {
    /// Objective value at the evaluated parameter.
    pub value: f64,
    /// Gradient tensor, same layout as the parameter.
    pub gradient: Tensor<B, 2>,
}

/// Objective closure: maps a candidate parameter to its value and gradient.
///
/// The closure performs the forward and backward pass; optimizers treat it as
/// a black box and may call it more than once per step.
pub type Objective<'a, B> = dyn FnMut(&Tensor<B, 2>) -> Result<Evaluation<B>> + 'a;

/// Optimizer trait for closure-driven parameter updates.
///
/// Optimizers own their internal state (moments, curvature history) but never
/// the parameter: each step consumes the current parameter tensor and returns
/// the updated one together with the objective value at step entry.
///
/// # Type Parameters
/// * `B` - The tensor backend the parameter lives on
pub trait Optimizer<B: Backend> {
    /// Perform a single optimization step.
    ///
    /// # Arguments
    /// * `parameter` - The current parameter tensor
    /// * `objective` - The objective closure
    ///
    /// # Returns
    /// The updated parameter and the objective value where the step started.
    fn step(
        &mut self,
        parameter: Tensor<B, 2>,
        objective: &mut Objective<'_, B>,
    ) -> Result<(Tensor<B, 2>, f64)>;

    /// Get the name of this optimizer.
    fn name(&self) -> &'static str;
}

/// Dot product of two flattened tensors as a host scalar.
pub(crate) fn dot<B: Backend>(a: &Tensor<B, 1>, b: &Tensor<B, 1>) -> f64 {
    use burn::tensor::ElementConversion;
    (a.clone() * b.clone()).sum().into_scalar().elem()
}
