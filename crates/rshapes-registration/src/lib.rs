pub mod loss;
pub mod optimizer;
pub mod registration;

pub use rshapes_core::{Error, Result};

pub use loss::{L2Loss, Loss};
pub use optimizer::{Evaluation, Optimizer, OptimizerConfig};
pub use registration::{Registration, RegistrationConfig};
