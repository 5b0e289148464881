//! Deformation models.
//!
//! A model turns a shape and a parameter tensor into a morphed shape plus an
//! optional regularization energy. Models, kernels and integrators are
//! independent strategies wired together at construction time.

pub mod integrator;
pub mod kernel_deformation;
pub mod kernels;
pub mod trait_;

pub use integrator::{EulerIntegrator, Hamiltonian, Integrator, MidpointIntegrator};
pub use kernel_deformation::{KernelDeformation, KernelDeformationConfig};
pub use kernels::{GaussianKernel, Kernel};
pub use trait_::{Model, MorphingOutput};
