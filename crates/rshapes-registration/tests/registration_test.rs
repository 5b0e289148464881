//! End-to-end registration tests on the ndarray autodiff backend.

use std::cell::Cell;
use std::rc::Rc;

use burn::backend::Autodiff;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use rshapes_core::{Error, PolyData, Result};
use rshapes_model::{KernelDeformationConfig, Model, MorphingOutput};
use rshapes_registration::optimizer::{AdamConfig, GradientDescentConfig, LbfgsConfig};
use rshapes_registration::{
    L2Loss, Loss, OptimizerConfig, Registration, RegistrationConfig,
};

type B = Autodiff<NdArray<f32>>;
type Device = <B as Backend>::Device;

fn grid(device: &Device) -> PolyData<B> {
    let points = Tensor::from_floats(
        [
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [0.5, 0.5],
        ],
        device,
    );
    PolyData::new(points).unwrap()
}

fn translated(shape: &PolyData<B>, dx: f32, dy: f32) -> PolyData<B> {
    let offset = Tensor::from_floats([[dx, dy]], &shape.device());
    shape.with_points(shape.points() + offset).unwrap()
}

fn as_slice(shape: &PolyData<B>) -> Vec<f32> {
    shape
        .points()
        .into_data()
        .as_slice::<f32>()
        .unwrap()
        .to_vec()
}

fn default_model() -> rshapes_model::KernelDeformation {
    KernelDeformationConfig::new()
        .with_sigma(0.5)
        .with_n_steps(2)
        .init()
        .unwrap()
}

#[test]
fn test_zero_iterations_yields_zero_parameter() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.3, 0.0);

    let config = RegistrationConfig::new().with_n_iter(0);
    let mut registration =
        Registration::<B, _, _>::new(default_model(), L2Loss::new(), config).unwrap();
    registration.fit(&source, &target).unwrap();

    let parameter = registration.parameter().unwrap();
    assert_eq!(parameter.dims(), [5, 2]);
    let magnitude: f32 = parameter.abs().sum().into_scalar();
    assert_eq!(magnitude, 0.0);

    // The distance is still evaluated: the zero momentum carries no energy.
    let distance: f32 = registration.distance().unwrap().into_scalar();
    assert_eq!(distance, 0.0);
}

#[test]
fn test_fit_reduces_the_loss() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.3, -0.2);

    let initial: f32 = L2Loss::new().forward(&source, &target).unwrap().into_scalar();

    let config = RegistrationConfig::new()
        .with_regularization(0.1)
        .with_n_iter(10);
    let mut registration =
        Registration::<B, _, _>::new(default_model(), L2Loss::new(), config).unwrap();
    let morphed = registration.fit_transform(&source, &target).unwrap();

    let residual: f32 = L2Loss::new().forward(&morphed, &target).unwrap().into_scalar();
    assert!(
        residual < initial,
        "fit should improve on the unmorphed loss: {residual} vs {initial}"
    );
}

#[test]
fn test_more_iterations_do_not_hurt() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.3, 0.1);

    // Full objective at the fitted parameter: data term + weighted energy.
    let fit_with = |n_iter: usize| -> f32 {
        let config = RegistrationConfig::new()
            .with_regularization(0.1)
            .with_n_iter(n_iter);
        let mut registration =
            Registration::<B, _, _>::new(default_model(), L2Loss::new(), config).unwrap();
        let morphed = registration.fit_transform(&source, &target).unwrap();
        let residual: f32 = L2Loss::new().forward(&morphed, &target).unwrap().into_scalar();
        let energy: f32 = registration.distance().unwrap().into_scalar();
        residual + 0.1 * energy
    };

    let short = fit_with(1);
    let long = fit_with(6);
    assert!(
        long <= short + 1e-4,
        "six iterations should not end above one: {long} vs {short}"
    );
}

#[test]
fn test_identity_target_stays_near_zero() {
    let device = Device::default();
    let source = grid(&device);

    let config = RegistrationConfig::new().with_n_iter(3);
    let mut registration =
        Registration::<B, _, _>::new(default_model(), L2Loss::new(), config).unwrap();
    let morphed = registration.fit_transform(&source, &source).unwrap();

    let residual: f32 = L2Loss::new().forward(&morphed, &source).unwrap().into_scalar();
    assert!(residual < 1e-3, "identity fit should stay at the optimum, got {residual}");
    let distance: f32 = registration.distance().unwrap().into_scalar();
    assert!(distance >= 0.0);
    assert!(distance < 1e-3);
}

#[test]
fn test_transform_is_deterministic() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.2, 0.2);

    let config = RegistrationConfig::new()
        .with_regularization(0.1)
        .with_n_iter(5);
    let mut registration =
        Registration::<B, _, _>::new(default_model(), L2Loss::new(), config).unwrap();
    registration.fit(&source, &target).unwrap();

    let first = registration.transform(&source).unwrap();
    let second = registration.transform(&source).unwrap();
    assert_eq!(as_slice(&first), as_slice(&second));
}

#[test]
fn test_fit_transform_matches_fit_then_transform() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.25, 0.0);

    let config = RegistrationConfig::new()
        .with_regularization(0.1)
        .with_n_iter(4);
    let mut registration =
        Registration::<B, _, _>::new(default_model(), L2Loss::new(), config).unwrap();

    let morphed = registration.fit_transform(&source, &target).unwrap();
    let again = registration.transform(&source).unwrap();
    assert_eq!(as_slice(&morphed), as_slice(&again));
}

#[test]
fn test_accessors_fail_before_fit() {
    let config = RegistrationConfig::default();
    let registration =
        Registration::<B, _, _>::new(default_model(), L2Loss::new(), config).unwrap();

    assert!(matches!(registration.parameter(), Err(Error::NotFitted)));
    assert!(matches!(registration.distance(), Err(Error::NotFitted)));
    let source = grid(&Device::default());
    assert!(matches!(
        registration.transform(&source),
        Err(Error::NotFitted)
    ));
}

#[test]
fn test_parameter_lives_on_the_fitting_device() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.1, 0.1);

    let config = RegistrationConfig::new().with_n_iter(1);
    let mut registration =
        Registration::<B, _, _>::new(default_model(), L2Loss::new(), config)
            .unwrap()
            .with_device(device.clone());
    registration.fit(&source, &target).unwrap();

    assert_eq!(registration.parameter().unwrap().device(), device);
    assert_eq!(registration.distance().unwrap().device(), device);
    let morphed = registration.transform(&source).unwrap();
    assert_eq!(morphed.points().device(), device);
}

#[test]
fn test_optimizers_are_interchangeable() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.2, 0.0);

    for optimizer in [
        OptimizerConfig::Lbfgs(LbfgsConfig::new()),
        OptimizerConfig::GradientDescent(GradientDescentConfig::new().with_learning_rate(0.02)),
        OptimizerConfig::Adam(AdamConfig::new().with_learning_rate(0.05)),
    ] {
        let initial: f32 = L2Loss::new().forward(&source, &target).unwrap().into_scalar();
        let config = RegistrationConfig::new()
            .with_optimizer(optimizer)
            .with_regularization(0.1)
            .with_n_iter(15);
        let mut registration =
            Registration::<B, _, _>::new(default_model(), L2Loss::new(), config).unwrap();
        let morphed = registration.fit_transform(&source, &target).unwrap();

        let residual: f32 = L2Loss::new().forward(&morphed, &target).unwrap().into_scalar();
        assert!(residual < initial);
    }
}

/// Model stub that counts every entry point and applies a translation field.
#[derive(Clone)]
struct ProbeModel {
    calls: Rc<Cell<usize>>,
    reg_requests: Rc<Cell<usize>>,
}

impl ProbeModel {
    fn new() -> (Self, Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let reg_requests = Rc::new(Cell::new(0));
        (
            Self {
                calls: calls.clone(),
                reg_requests: reg_requests.clone(),
            },
            calls,
            reg_requests,
        )
    }
}

impl Model<B> for ProbeModel {
    fn parameter_shape(&self, shape: &PolyData<B>) -> Result<[usize; 2]> {
        self.calls.set(self.calls.get() + 1);
        Ok([shape.n_points(), shape.dim()])
    }

    fn morph(
        &self,
        shape: &PolyData<B>,
        parameter: Tensor<B, 2>,
        _return_path: bool,
        return_regularization: bool,
    ) -> Result<MorphingOutput<B>> {
        self.calls.set(self.calls.get() + 1);
        let mut output = MorphingOutput::new(shape.with_points(shape.points() + parameter)?);
        if return_regularization {
            self.reg_requests.set(self.reg_requests.get() + 1);
            output = output.with_regularization(Tensor::zeros([1], &shape.device()));
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "ProbeModel"
    }
}

/// Loss stub that counts forward calls.
struct ProbeLoss {
    calls: Rc<Cell<usize>>,
    inner: L2Loss,
}

impl ProbeLoss {
    fn new() -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Self {
                calls: calls.clone(),
                inner: L2Loss::new(),
            },
            calls,
        )
    }
}

impl Loss<B> for ProbeLoss {
    fn forward(&self, source: &PolyData<B>, target: &PolyData<B>) -> Result<Tensor<B, 1>> {
        self.calls.set(self.calls.get() + 1);
        self.inner.forward(source, target)
    }

    fn name(&self) -> &'static str {
        "ProbeLoss"
    }
}

#[test]
fn test_zero_weight_never_requests_regularization_in_the_loop() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.1, 0.0);

    let (model, _, reg_requests) = ProbeModel::new();
    let config = RegistrationConfig::new()
        .with_optimizer(OptimizerConfig::GradientDescent(
            GradientDescentConfig::new().with_learning_rate(0.05),
        ))
        .with_regularization(0.0)
        .with_n_iter(3);
    let mut registration =
        Registration::<B, _, _>::new(model, L2Loss::new(), config).unwrap();

    registration.fit(&source, &target).unwrap();
    // Only the final distance evaluation asks for the energy; none of the
    // three objective evaluations do.
    assert_eq!(reg_requests.get(), 1);
}

#[test]
fn test_invalid_optimizer_fails_before_any_model_or_loss_call() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.1, 0.0);

    let (model, model_calls, _) = ProbeModel::new();
    let (loss, loss_calls) = ProbeLoss::new();
    let config = RegistrationConfig::new().with_optimizer(OptimizerConfig::GradientDescent(
        GradientDescentConfig::new().with_learning_rate(-1.0),
    ));
    let mut registration = Registration::<B, _, _>::new(model, loss, config).unwrap();

    let result = registration.fit(&source, &target);
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    assert_eq!(model_calls.get(), 0);
    assert_eq!(loss_calls.get(), 0);
    assert!(matches!(registration.parameter(), Err(Error::NotFitted)));
}

#[test]
fn test_unsupported_model_configuration_fails_before_evaluation() {
    let device = Device::default();
    let source = grid(&device);
    let target = translated(&source, 0.1, 0.0);

    let model = KernelDeformationConfig::new()
        .with_control_points(Some(8))
        .init()
        .unwrap();
    let (loss, loss_calls) = ProbeLoss::new();
    let mut registration =
        Registration::<B, _, _>::new(model, loss, RegistrationConfig::default()).unwrap();

    let result = registration.fit(&source, &target);
    assert!(matches!(result, Err(Error::NotImplemented(_))));
    assert_eq!(loss_calls.get(), 0);
}

#[test]
fn test_refit_overwrites_previous_state() {
    let device = Device::default();
    let source = grid(&device);
    let near = translated(&source, 0.05, 0.0);
    let far = translated(&source, 0.4, 0.3);

    let config = RegistrationConfig::new()
        .with_regularization(0.1)
        .with_n_iter(5);
    let mut registration =
        Registration::<B, _, _>::new(default_model(), L2Loss::new(), config).unwrap();

    registration.fit(&source, &far).unwrap();
    let first = registration.parameter().unwrap();
    registration.fit(&source, &near).unwrap();
    let second = registration.parameter().unwrap();

    let delta: f32 = (first - second).abs().sum().into_scalar();
    assert!(delta > 0.0, "refit against a new target must change the parameter");
}
