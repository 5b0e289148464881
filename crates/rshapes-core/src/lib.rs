pub mod error;
pub mod shape;

pub use error::{Error, Result};
pub use shape::PolyData;
