//! Kernel deformation model.
//!
//! Describes morphing as a deformation of the ambient space. The parameter is
//! a momentum field over the shape's points; the morphed shape is obtained by
//! integrating the momentum through the kernel Hamiltonian. The
//! regularization is `<p, K_q p> / 2` evaluated at the initial state.

use burn::config::Config;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rshapes_core::{Error, PolyData};

use super::integrator::{EulerIntegrator, Hamiltonian, Integrator};
use super::kernels::{GaussianKernel, Kernel};
use super::trait_::{Model, MorphingOutput};

/// Kernel deformation configuration.
#[derive(Config, Debug)]
pub struct KernelDeformationConfig {
    /// Number of integration steps.
    #[config(default = 1)]
    pub n_steps: usize,
    /// Bandwidth of the default Gaussian kernel.
    #[config(default = 0.1)]
    pub sigma: f64,
    /// Grid resolution for control-point support. Declared for forward
    /// compatibility; building a model with it set fails at `parameter_shape`.
    pub control_points: Option<usize>,
}

impl KernelDeformationConfig {
    /// Initialize a kernel deformation model with the default Gaussian
    /// kernel and Euler integrator.
    ///
    /// # Errors
    /// Returns an invalid configuration error if `n_steps` is zero or the
    /// bandwidth is degenerate.
    pub fn init(&self) -> rshapes_core::Result<KernelDeformation> {
        if self.n_steps == 0 {
            return Err(Error::invalid_configuration(
                "kernel deformation needs at least one integration step",
            ));
        }
        Ok(KernelDeformation {
            n_steps: self.n_steps,
            kernel: GaussianKernel::new(self.sigma)?,
            integrator: EulerIntegrator,
            control_points: self.control_points,
        })
    }
}

/// Kernel deformation morphing algorithm.
///
/// Kernel and integrator are independent strategies; swap them with
/// [`with_kernel`](Self::with_kernel) and
/// [`with_integrator`](Self::with_integrator).
#[derive(Debug, Clone)]
pub struct KernelDeformation<K = GaussianKernel, I = EulerIntegrator>
where
    K: Kernel,
    I: Integrator,
{
    n_steps: usize,
    kernel: K,
    integrator: I,
    control_points: Option<usize>,
}

impl<K: Kernel, I: Integrator> KernelDeformation<K, I> {
    /// Replace the smoothing kernel.
    pub fn with_kernel<K2: Kernel>(self, kernel: K2) -> KernelDeformation<K2, I> {
        KernelDeformation {
            n_steps: self.n_steps,
            kernel,
            integrator: self.integrator,
            control_points: self.control_points,
        }
    }

    /// Replace the integrator.
    pub fn with_integrator<I2: Integrator>(self, integrator: I2) -> KernelDeformation<K, I2> {
        KernelDeformation {
            n_steps: self.n_steps,
            kernel: self.kernel,
            integrator,
            control_points: self.control_points,
        }
    }

    /// Number of integration steps.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }
}

impl<B: Backend, K: Kernel, I: Integrator> Model<B> for KernelDeformation<K, I> {
    fn parameter_shape(&self, shape: &PolyData<B>) -> rshapes_core::Result<[usize; 2]> {
        if self.control_points.is_some() {
            return Err(Error::not_implemented(
                "control-point grids; the momentum must carry one vector per point",
            ));
        }
        Ok([shape.n_points(), shape.dim()])
    }

    fn morph(
        &self,
        shape: &PolyData<B>,
        parameter: Tensor<B, 2>,
        return_path: bool,
        return_regularization: bool,
    ) -> rshapes_core::Result<MorphingOutput<B>> {
        let expected = self.parameter_shape(shape)?;
        let actual = parameter.dims();
        if actual != expected {
            return Err(Error::shape_mismatch(&expected, &actual));
        }

        let mut p = parameter.to_device(&shape.device());
        let mut q = shape.points();
        let hamiltonian = Hamiltonian::new(&self.kernel);

        // Regularization is the energy at the initial state, not integrated
        // along the path.
        let regularization = return_regularization.then(|| hamiltonian.energy(&p, &q));

        let mut path = return_path.then(|| vec![shape.clone()]);
        let mut path_length: Option<Tensor<B, 1>> = None;

        let dt = 1.0 / self.n_steps as f64;
        for _ in 0..self.n_steps {
            let q_prev = q.clone();
            (p, q) = self.integrator.step(&hamiltonian, p, q, dt);
            if let Some(path) = path.as_mut() {
                path.push(shape.with_points(q.clone())?);
                let step = (q.clone() - q_prev).powf_scalar(2.0).sum().sqrt();
                path_length = Some(match path_length {
                    Some(total) => total + step,
                    None => step,
                });
            }
        }

        let mut output = MorphingOutput::new(shape.with_points(q)?);
        if let Some(regularization) = regularization {
            output = output.with_regularization(regularization);
        }
        if let Some(path) = path {
            output = output.with_path(path);
        }
        if let Some(path_length) = path_length {
            output = output.with_path_length(path_length);
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "KernelDeformation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    fn source(device: &<B as Backend>::Device) -> PolyData<B> {
        let points =
            Tensor::from_floats([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]], device);
        PolyData::new(points).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = KernelDeformationConfig::new();
        assert_eq!(config.n_steps, 1);
        assert_eq!(config.sigma, 0.1);
        assert!(config.control_points.is_none());
    }

    #[test]
    fn test_config_rejects_zero_steps() {
        let result = KernelDeformationConfig::new().with_n_steps(0).init();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_parameter_shape_follows_geometry() {
        let device = Default::default();
        let model = KernelDeformationConfig::new().init().unwrap();
        let shape = source(&device);

        assert_eq!(
            Model::<B>::parameter_shape(&model, &shape).unwrap(),
            [4, 2]
        );
    }

    #[test]
    fn test_control_points_are_not_implemented() {
        let device = Default::default();
        let model = KernelDeformationConfig::new()
            .with_control_points(Some(8))
            .init()
            .unwrap();

        let result = Model::<B>::parameter_shape(&model, &source(&device));
        assert!(matches!(result, Err(Error::NotImplemented(_))));
    }

    #[test]
    fn test_mismatched_parameter_is_rejected() {
        let device = Default::default();
        let model = KernelDeformationConfig::new().init().unwrap();
        let shape = source(&device);
        let parameter = Tensor::<B, 2>::zeros([3, 2], &device);

        let result = model.morph(&shape, parameter, false, false);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_zero_momentum_is_identity() {
        let device = Default::default();
        let model = KernelDeformationConfig::new().with_n_steps(3).init().unwrap();
        let shape = source(&device);
        let parameter = Tensor::<B, 2>::zeros([4, 2], &device);

        let output = model.morph(&shape, parameter, false, true).unwrap();

        let before = shape.points().into_data();
        let after = output.morphed_shape().points().into_data();
        assert_eq!(
            before.as_slice::<f32>().unwrap(),
            after.as_slice::<f32>().unwrap()
        );

        let energy: f32 = output.regularization().unwrap().clone().into_scalar();
        assert_eq!(energy, 0.0);
    }

    #[test]
    fn test_regularization_absent_unless_requested() {
        let device = Default::default();
        let model = KernelDeformationConfig::new().init().unwrap();
        let shape = source(&device);
        let parameter = Tensor::<B, 2>::zeros([4, 2], &device);

        let output = model.morph(&shape, parameter, false, false).unwrap();
        assert!(output.regularization().is_none());
        assert!(output.path().is_none());
        assert!(output.path_length().is_none());
    }

    #[test]
    fn test_path_has_one_shape_per_step_plus_initial() {
        let device = Default::default();
        let model = KernelDeformationConfig::new().with_n_steps(4).init().unwrap();
        let shape = source(&device);
        let parameter = Tensor::<B, 2>::from_floats(
            [[0.5, 0.0], [0.5, 0.0], [0.5, 0.0], [0.5, 0.0]],
            &device,
        );

        let output = model.morph(&shape, parameter, true, false).unwrap();
        let path = output.path().unwrap();
        assert_eq!(path.len(), 5);

        // The path starts at the source and ends at the morphed shape.
        assert_eq!(
            path[0].points().into_data().as_slice::<f32>().unwrap(),
            shape.points().into_data().as_slice::<f32>().unwrap()
        );
        assert_eq!(
            path[4].points().into_data().as_slice::<f32>().unwrap(),
            output
                .morphed_shape()
                .points()
                .into_data()
                .as_slice::<f32>()
                .unwrap()
        );

        let length: f32 = output.path_length().unwrap().clone().into_scalar();
        assert!(length > 0.0);
    }
}
