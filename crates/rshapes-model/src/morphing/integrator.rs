//! Hamiltonian integrators for kernel deformation.
//!
//! An integrator is a single discrete-time-step state transition advancing a
//! `(momentum, position)` pair under the kernel Hamiltonian
//! `H(p, q) = <p, K_q p> / 2`.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::kernels::Kernel;

/// Kernel Hamiltonian `H(p, q) = <p, K_q p> / 2` and its vector fields.
pub struct Hamiltonian<'a, K: Kernel> {
    kernel: &'a K,
}

impl<'a, K: Kernel> Hamiltonian<'a, K> {
    /// Wrap a kernel as a Hamiltonian.
    pub fn new(kernel: &'a K) -> Self {
        Self { kernel }
    }

    /// Energy `H(p, q)`.
    pub fn energy<B: Backend>(&self, p: &Tensor<B, 2>, q: &Tensor<B, 2>) -> Tensor<B, 1> {
        self.kernel.scalar_product(p, q).div_scalar(2.0)
    }

    /// `∂H/∂p = K_q p`, the velocity of the positions.
    pub fn velocity<B: Backend>(&self, p: &Tensor<B, 2>, q: &Tensor<B, 2>) -> Tensor<B, 2> {
        self.kernel.velocity(p, q)
    }

    /// `∂H/∂q`, the negated force on the momentum.
    pub fn position_gradient<B: Backend>(
        &self,
        p: &Tensor<B, 2>,
        q: &Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        self.kernel.position_gradient(p, q).div_scalar(2.0)
    }
}

/// Integrator trait: one discrete step of Hamilton's equations,
/// `q' = q + dt ∂H/∂p`, `p' = p - dt ∂H/∂q`.
pub trait Integrator {
    /// Advance `(p, q)` by one step of size `dt`.
    fn step<B: Backend, K: Kernel>(
        &self,
        hamiltonian: &Hamiltonian<'_, K>,
        p: Tensor<B, 2>,
        q: Tensor<B, 2>,
        dt: f64,
    ) -> (Tensor<B, 2>, Tensor<B, 2>);

    /// Get the name of this integrator.
    fn name(&self) -> &'static str;
}

/// Explicit Euler integrator: both vector fields evaluated at the step start.
#[derive(Debug, Clone, Default)]
pub struct EulerIntegrator;

impl Integrator for EulerIntegrator {
    fn step<B: Backend, K: Kernel>(
        &self,
        hamiltonian: &Hamiltonian<'_, K>,
        p: Tensor<B, 2>,
        q: Tensor<B, 2>,
        dt: f64,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let velocity = hamiltonian.velocity(&p, &q);
        let force = hamiltonian.position_gradient(&p, &q);
        (p - force.mul_scalar(dt), q + velocity.mul_scalar(dt))
    }

    fn name(&self) -> &'static str {
        "EulerIntegrator"
    }
}

/// Midpoint (second-order Runge-Kutta) integrator.
///
/// Takes a half step to the midpoint, then advances the full step using the
/// vector fields evaluated there.
#[derive(Debug, Clone, Default)]
pub struct MidpointIntegrator;

impl Integrator for MidpointIntegrator {
    fn step<B: Backend, K: Kernel>(
        &self,
        hamiltonian: &Hamiltonian<'_, K>,
        p: Tensor<B, 2>,
        q: Tensor<B, 2>,
        dt: f64,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let half = dt / 2.0;
        let p_mid = p.clone() - hamiltonian.position_gradient(&p, &q).mul_scalar(half);
        let q_mid = q.clone() + hamiltonian.velocity(&p, &q).mul_scalar(half);

        let velocity = hamiltonian.velocity(&p_mid, &q_mid);
        let force = hamiltonian.position_gradient(&p_mid, &q_mid);
        (p - force.mul_scalar(dt), q + velocity.mul_scalar(dt))
    }

    fn name(&self) -> &'static str {
        "MidpointIntegrator"
    }
}
