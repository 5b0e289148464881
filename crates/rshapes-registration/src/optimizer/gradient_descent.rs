//! Fixed-step gradient descent.

use burn::config::Config;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rshapes_core::Error;

use super::trait_::{Evaluation, Objective, Optimizer};

/// Gradient descent configuration.
#[derive(Config, Debug)]
pub struct GradientDescentConfig {
    /// Step size.
    #[config(default = 0.1)]
    pub learning_rate: f64,
}

impl GradientDescentConfig {
    /// Initialize a gradient descent optimizer.
    ///
    /// # Errors
    /// Returns an invalid configuration error unless the learning rate is
    /// positive and finite.
    pub fn init(&self) -> rshapes_core::Result<GradientDescent> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::invalid_configuration(format!(
                "learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        Ok(GradientDescent {
            learning_rate: self.learning_rate,
        })
    }
}

/// Plain gradient descent: one objective evaluation per step.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f64,
}

impl GradientDescent {
    /// Current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl<B: Backend> Optimizer<B> for GradientDescent {
    fn step(
        &mut self,
        parameter: Tensor<B, 2>,
        objective: &mut Objective<'_, B>,
    ) -> rshapes_core::Result<(Tensor<B, 2>, f64)> {
        let Evaluation { value, gradient } = objective(&parameter)?;
        let updated = parameter - gradient.mul_scalar(self.learning_rate);
        Ok((updated, value))
    }

    fn name(&self) -> &'static str {
        "GradientDescent"
    }
}
