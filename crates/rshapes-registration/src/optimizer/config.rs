//! Optimizer selection.

use burn::tensor::backend::Backend;
use rshapes_core::Result;
use serde::{Deserialize, Serialize};

use super::adam::AdamConfig;
use super::gradient_descent::GradientDescentConfig;
use super::lbfgs::LbfgsConfig;
use super::trait_::Optimizer;

/// Selects and configures the optimizer driving a registration fit.
///
/// Building the optimizer validates the underlying configuration, so an
/// unusable setting fails before any model or loss evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OptimizerConfig {
    /// L-BFGS with backtracking line search.
    Lbfgs(LbfgsConfig),
    /// Fixed-step gradient descent.
    GradientDescent(GradientDescentConfig),
    /// Adam with bias-corrected moments.
    Adam(AdamConfig),
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Lbfgs(LbfgsConfig::new())
    }
}

impl OptimizerConfig {
    /// Build the configured optimizer.
    ///
    /// # Errors
    /// Propagates the invalid configuration error of the selected optimizer.
    pub fn build<B: Backend>(&self) -> Result<Box<dyn Optimizer<B>>> {
        Ok(match self {
            Self::Lbfgs(config) => Box::new(config.init::<B>()?),
            Self::GradientDescent(config) => Box::new(config.init()?),
            Self::Adam(config) => Box::new(config.init::<B>()?),
        })
    }

    /// Name of the selected optimizer.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lbfgs(_) => "Lbfgs",
            Self::GradientDescent(_) => "GradientDescent",
            Self::Adam(_) => "Adam",
        }
    }
}
