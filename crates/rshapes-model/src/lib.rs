pub mod morphing;

pub use morphing::{
    EulerIntegrator, GaussianKernel, Hamiltonian, Integrator, Kernel, KernelDeformation,
    KernelDeformationConfig, MidpointIntegrator, Model, MorphingOutput,
};
