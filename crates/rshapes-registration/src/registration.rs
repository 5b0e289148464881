//! Registration task: fit a deformation model to a source/target pair.
//!
//! `Registration` wires a deformation model, a loss and an optimizer into the
//! fitting loop. The optimization variable is the model's parameter tensor;
//! each objective evaluation morphs the source, scores it against the target
//! and backpropagates through the whole deformation.

use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};
use rshapes_core::{Error, PolyData, Result};
use rshapes_model::Model;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::loss::Loss;
use crate::optimizer::{Evaluation, OptimizerConfig};

/// Configuration of a registration fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Optimizer driving the parameter updates.
    pub optimizer: OptimizerConfig,
    /// Weight of the model's regularization term in the objective.
    pub regularization: f64,
    /// Number of outer optimization iterations.
    pub n_iter: usize,
    /// Log per-iteration objective values at info level instead of debug.
    pub verbose: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            optimizer: OptimizerConfig::default(),
            regularization: 1.0,
            n_iter: 10,
            verbose: false,
        }
    }
}

impl RegistrationConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the optimizer.
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Set the regularization weight.
    pub fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    /// Set the number of iterations.
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Enable or disable verbose logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an invalid configuration error for a negative or non-finite
    /// regularization weight.
    pub fn validate(&self) -> Result<()> {
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(Error::invalid_configuration(format!(
                "regularization weight must be finite and >= 0, got {}",
                self.regularization
            )));
        }
        Ok(())
    }
}

/// State produced by a successful fit.
struct Fitted<B: AutodiffBackend> {
    /// Optimized parameter, detached, on the fitting device.
    parameter: Tensor<B::InnerBackend, 2>,
    /// Regularization energy of the optimized parameter.
    distance: Tensor<B::InnerBackend, 1>,
}

/// Registration of a source shape onto a target shape.
///
/// Generic over the autodiff backend, the deformation model and the loss.
/// The optimizer itself runs on the inner backend; the objective closure owns
/// the lift into the autodiff graph and the backward pass.
pub struct Registration<B: AutodiffBackend, M: Model<B>, L: Loss<B>> {
    model: M,
    loss: L,
    config: RegistrationConfig,
    device: B::Device,
    fitted: Option<Fitted<B>>,
}

impl<B: AutodiffBackend, M: Model<B>, L: Loss<B>> Registration<B, M, L> {
    /// Create a registration task.
    ///
    /// The device defaults to the backend's preferred device; override it
    /// with [`with_device`](Self::with_device) before fitting.
    ///
    /// # Errors
    /// Rejects an invalid configuration eagerly.
    pub fn new(model: M, loss: L, config: RegistrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model,
            loss,
            config,
            device: B::Device::default(),
            fitted: None,
        })
    }

    /// Set the device used for fitting and transforming.
    pub fn with_device(mut self, device: B::Device) -> Self {
        self.device = device;
        self
    }

    /// The fitting device.
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Optimized parameter of the last fit.
    ///
    /// # Errors
    /// Returns `Error::NotFitted` before a successful `fit`.
    pub fn parameter(&self) -> Result<Tensor<B::InnerBackend, 2>> {
        self.fitted
            .as_ref()
            .map(|fitted| fitted.parameter.clone())
            .ok_or(Error::NotFitted)
    }

    /// Regularization energy of the fitted parameter, re-evaluated after the
    /// last fit.
    ///
    /// # Errors
    /// Returns `Error::NotFitted` before a successful `fit`.
    pub fn distance(&self) -> Result<Tensor<B::InnerBackend, 1>> {
        self.fitted
            .as_ref()
            .map(|fitted| fitted.distance.clone())
            .ok_or(Error::NotFitted)
    }

    /// Fit the model parameter so the morphed source matches the target.
    ///
    /// Runs exactly `n_iter` optimizer steps starting from a zero parameter;
    /// any prior fitted state is overwritten. The optimizer is built before
    /// any model or loss work so configuration errors surface first.
    ///
    /// # Errors
    /// Propagates configuration, shape and numerical errors; a failed fit
    /// leaves the registration unfitted.
    pub fn fit(&mut self, source: &PolyData<B>, target: &PolyData<B>) -> Result<()> {
        let mut optimizer = self.config.optimizer.build::<B::InnerBackend>()?;

        self.fitted = None;
        let source = source.to_device(&self.device);
        let target = target.to_device(&self.device);

        self.model.prepare(&source)?;
        let parameter_shape = self.model.parameter_shape(&source)?;
        let mut parameter =
            Tensor::<B::InnerBackend, 2>::zeros(parameter_shape, &self.device);

        let model = &self.model;
        let loss = &self.loss;
        let weight = self.config.regularization;
        let mut objective = |candidate: &Tensor<B::InnerBackend, 2>| {
            let tracked = Tensor::<B, 2>::from_inner(candidate.clone()).require_grad();
            let output = model.morph(&source, tracked.clone(), false, weight != 0.0)?;
            let mut total = loss.forward(output.morphed_shape(), &target)?;
            if weight != 0.0 {
                let energy = output.regularization().ok_or_else(|| {
                    Error::numerical("model returned no regularization energy")
                })?;
                total = total + energy.clone().mul_scalar(weight);
            }

            let value: f64 = total.clone().inner().into_scalar().elem();
            if !value.is_finite() {
                return Err(Error::numerical(format!(
                    "objective diverged to {value}"
                )));
            }
            let grads = total.backward();
            let gradient = tracked
                .grad(&grads)
                .ok_or_else(|| Error::numerical("no gradient reached the parameter"))?;
            Ok(Evaluation { value, gradient })
        };

        info!(
            "fitting {} with {} ({} iterations, regularization {})",
            self.model.name(),
            optimizer.name(),
            self.config.n_iter,
            weight,
        );
        for iteration in 0..self.config.n_iter {
            let (updated, value) = optimizer.step(parameter, &mut objective)?;
            parameter = updated;
            if self.config.verbose {
                info!(
                    "iteration {}/{}: objective {value:.6e}",
                    iteration + 1,
                    self.config.n_iter
                );
            } else {
                debug!(
                    "iteration {}/{}: objective {value:.6e}",
                    iteration + 1,
                    self.config.n_iter
                );
            }
        }

        // The reported distance is the regularization energy re-evaluated at
        // the accepted parameter, decoupled from the optimizer's bookkeeping.
        let final_parameter = Tensor::<B, 2>::from_inner(parameter.clone());
        let output = self.model.morph(&source, final_parameter, false, true)?;
        let distance = output
            .regularization()
            .ok_or_else(|| Error::numerical("model returned no regularization energy"))?
            .clone()
            .inner();

        self.fitted = Some(Fitted { parameter, distance });
        Ok(())
    }

    /// Apply the fitted deformation to a shape.
    ///
    /// The shape must be compatible with the stored parameter layout; the
    /// model enforces this. The result carries no gradient tracking.
    ///
    /// # Errors
    /// Returns `Error::NotFitted` before a successful `fit`.
    pub fn transform(&self, shape: &PolyData<B>) -> Result<PolyData<B>> {
        let fitted = self.fitted.as_ref().ok_or(Error::NotFitted)?;
        let shape = shape.to_device(&self.device);
        let parameter = Tensor::<B, 2>::from_inner(fitted.parameter.clone());
        let output = self.model.morph(&shape, parameter, false, false)?;
        Ok(output.into_morphed_shape())
    }

    /// Fit on a source/target pair, then transform the source.
    ///
    /// # Errors
    /// Propagates any error of [`fit`](Self::fit) or
    /// [`transform`](Self::transform).
    pub fn fit_transform(
        &mut self,
        source: &PolyData<B>,
        target: &PolyData<B>,
    ) -> Result<PolyData<B>> {
        self.fit(source, target)?;
        self.transform(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::L2Loss;
    use crate::optimizer::GradientDescentConfig;
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;
    use rshapes_model::KernelDeformationConfig;

    type B = Autodiff<NdArray<f32>>;

    #[test]
    fn test_config_defaults() {
        let config = RegistrationConfig::default();
        assert_eq!(config.n_iter, 10);
        assert_eq!(config.regularization, 1.0);
        assert!(!config.verbose);
        assert_eq!(config.optimizer.name(), "Lbfgs");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = RegistrationConfig::new()
            .with_optimizer(OptimizerConfig::GradientDescent(
                GradientDescentConfig::new(),
            ))
            .with_regularization(0.5)
            .with_n_iter(3)
            .with_verbose(true);
        assert_eq!(config.optimizer.name(), "GradientDescent");
        assert_eq!(config.regularization, 0.5);
        assert_eq!(config.n_iter, 3);
        assert!(config.verbose);
    }

    #[test]
    fn test_negative_regularization_rejected_at_construction() {
        let model = KernelDeformationConfig::new().init().unwrap();
        let config = RegistrationConfig::new().with_regularization(-1.0);
        let result = Registration::<B, _, _>::new(model, L2Loss::new(), config);
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = RegistrationConfig::new().with_n_iter(7);
        let json = serde_json::to_string(&config).unwrap();
        let back: RegistrationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n_iter, 7);
        assert_eq!(back.optimizer.name(), "Lbfgs");
    }
}
