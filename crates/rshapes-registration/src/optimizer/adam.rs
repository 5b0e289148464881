//! Adam optimizer.

use burn::config::Config;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rshapes_core::Error;

use super::trait_::{Evaluation, Objective, Optimizer};

/// Adam configuration.
#[derive(Config, Debug)]
pub struct AdamConfig {
    /// Step size.
    #[config(default = 0.1)]
    pub learning_rate: f64,
    /// Exponential decay rate of the first moment.
    #[config(default = 0.9)]
    pub beta_1: f64,
    /// Exponential decay rate of the second moment.
    #[config(default = 0.999)]
    pub beta_2: f64,
    /// Denominator offset for numerical stability.
    #[config(default = 1e-8)]
    pub epsilon: f64,
}

impl AdamConfig {
    /// Initialize an Adam optimizer.
    ///
    /// # Errors
    /// Returns an invalid configuration error for a non-positive learning
    /// rate, decay rates outside [0, 1) or a non-positive epsilon.
    pub fn init<B: Backend>(&self) -> rshapes_core::Result<Adam<B>> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::invalid_configuration(format!(
                "learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        for (name, beta) in [("beta_1", self.beta_1), ("beta_2", self.beta_2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(Error::invalid_configuration(format!(
                    "{name} must be in [0, 1), got {beta}"
                )));
            }
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(Error::invalid_configuration(format!(
                "epsilon must be positive and finite, got {}",
                self.epsilon
            )));
        }
        Ok(Adam {
            learning_rate: self.learning_rate,
            beta_1: self.beta_1,
            beta_2: self.beta_2,
            epsilon: self.epsilon,
            step_count: 0,
            moments: None,
        })
    }
}

/// Adam with bias-corrected first and second moment estimates.
pub struct Adam<B: Backend> {
    learning_rate: f64,
    beta_1: f64,
    beta_2: f64,
    epsilon: f64,
    step_count: usize,
    moments: Option<(Tensor<B, 2>, Tensor<B, 2>)>,
}

impl<B: Backend> Optimizer<B> for Adam<B> {
    fn step(
        &mut self,
        parameter: Tensor<B, 2>,
        objective: &mut Objective<'_, B>,
    ) -> rshapes_core::Result<(Tensor<B, 2>, f64)> {
        let Evaluation { value, gradient } = objective(&parameter)?;
        self.step_count += 1;

        let (prev_m, prev_v) = match self.moments.take() {
            Some(moments) => moments,
            None => (gradient.zeros_like(), gradient.zeros_like()),
        };

        let m = prev_m.mul_scalar(self.beta_1) + gradient.clone().mul_scalar(1.0 - self.beta_1);
        let v = prev_v.mul_scalar(self.beta_2)
            + gradient.powf_scalar(2.0).mul_scalar(1.0 - self.beta_2);

        let bias_1 = 1.0 - self.beta_1.powi(self.step_count as i32);
        let bias_2 = 1.0 - self.beta_2.powi(self.step_count as i32);
        let m_hat = m.clone().div_scalar(bias_1);
        let v_hat = v.clone().div_scalar(bias_2);

        let update = m_hat
            .div(v_hat.sqrt().add_scalar(self.epsilon))
            .mul_scalar(self.learning_rate);
        self.moments = Some((m, v));

        Ok((parameter - update, value))
    }

    fn name(&self) -> &'static str {
        "Adam"
    }
}
