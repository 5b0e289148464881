//! Optimizers for registration parameter fitting.
//!
//! All optimizers drive a single parameter tensor through a user-supplied
//! objective closure; the closure owns the forward/backward pass and may be
//! invoked several times per outer step (line searches).

pub mod adam;
pub mod config;
pub mod gradient_descent;
pub mod lbfgs;
pub mod trait_;

pub use adam::{Adam, AdamConfig};
pub use config::OptimizerConfig;
pub use gradient_descent::{GradientDescent, GradientDescentConfig};
pub use lbfgs::{Lbfgs, LbfgsConfig};
pub use trait_::{Evaluation, Objective, Optimizer};
