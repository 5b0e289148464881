//! Smoothing kernels for kernel-based deformation.
//!
//! A kernel defines the inner product `<p, K_q p>` that regularizes momentum
//! fields and, through its Hamiltonian, drives the deformation. Because the
//! outer registration differentiates through the integration, the Hamiltonian
//! vector fields are exposed in closed form instead of being derived by a
//! nested autodiff pass: every method below is built from ordinary
//! differentiable tensor ops.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rshapes_core::{Error, Result};

/// Kernel trait for momentum smoothing.
///
/// `p` is a momentum field and `q` the point positions, both `[n, dim]`.
pub trait Kernel {
    /// Scalar product `<p, K_q p>`.
    fn scalar_product<B: Backend>(&self, p: &Tensor<B, 2>, q: &Tensor<B, 2>) -> Tensor<B, 1>;

    /// Smoothed momentum `K_q p`, the velocity field `∂H/∂p` up to the
    /// Hamiltonian's factor of one.
    fn velocity<B: Backend>(&self, p: &Tensor<B, 2>, q: &Tensor<B, 2>) -> Tensor<B, 2>;

    /// Gradient of the scalar product with respect to the positions,
    /// `∂<p, K_q p> / ∂q`.
    fn position_gradient<B: Backend>(&self, p: &Tensor<B, 2>, q: &Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Gaussian kernel `k_ij = exp(-|q_i - q_j|^2 / (2 sigma^2))`.
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    sigma: f64,
}

impl GaussianKernel {
    /// Create a Gaussian kernel with the given bandwidth.
    ///
    /// # Errors
    /// Returns an invalid configuration error unless `sigma` is positive and
    /// finite.
    pub fn new(sigma: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(Error::invalid_configuration(format!(
                "kernel bandwidth must be positive and finite, got {sigma}"
            )));
        }
        Ok(Self { sigma })
    }

    /// Bandwidth parameter.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Dense Gram matrix `K_q`, shape `[n, n]`.
    fn gram<B: Backend>(&self, q: &Tensor<B, 2>) -> Tensor<B, 2> {
        let scaled = q.clone().div_scalar(self.sigma * std::f64::consts::SQRT_2);
        let left: Tensor<B, 3> = scaled.clone().unsqueeze_dim(1);
        let right: Tensor<B, 3> = scaled.unsqueeze_dim(0);
        let squared = (left - right).powf_scalar(2.0).sum_dim(2);
        squared.neg().exp().squeeze(2)
    }
}

impl Default for GaussianKernel {
    fn default() -> Self {
        Self { sigma: 0.1 }
    }
}

impl Kernel for GaussianKernel {
    fn scalar_product<B: Backend>(&self, p: &Tensor<B, 2>, q: &Tensor<B, 2>) -> Tensor<B, 1> {
        let smoothed = self.gram(q).matmul(p.clone());
        (p.clone() * smoothed).sum()
    }

    fn velocity<B: Backend>(&self, p: &Tensor<B, 2>, q: &Tensor<B, 2>) -> Tensor<B, 2> {
        self.gram(q).matmul(p.clone())
    }

    fn position_gradient<B: Backend>(&self, p: &Tensor<B, 2>, q: &Tensor<B, 2>) -> Tensor<B, 2> {
        // d<p, K_q p>/dq_a = -(2 / sigma^2) sum_j (p_a . p_j) k_aj (q_a - q_j)
        let weights = self.gram(q) * p.clone().matmul(p.clone().transpose());
        let row_sums = weights.clone().sum_dim(1);
        let pulled = weights.matmul(q.clone());
        (q.clone() * row_sums - pulled).mul_scalar(-2.0 / (self.sigma * self.sigma))
    }
}
