//! Error types shared across the rshapes crates.
//!
//! This module provides the structured error type used by the shape
//! containers, deformation models and the registration pipeline.

use thiserror::Error;

/// Main error type for shape and registration operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Tensor shape does not match the contract of the operation.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A caller broke an API contract (mismatched point counts, invalid
    /// topology indices, reading results before `fit`, ...).
    #[error("contract violation: {0}")]
    Contract(String),

    /// Malformed configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A declared but unimplemented strategy or model configuration.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Numerical failure (no gradient, divergence, NaN loss).
    #[error("numerical failure: {0}")]
    Numerical(String),

    /// `transform` or result accessors called before a successful `fit`.
    #[error("registration has not been fitted")]
    NotFitted,
}

/// Result type for rshapes operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a contract violation error.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a not-implemented error.
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// Create a numerical failure error.
    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    /// Create a shape mismatch error from expected/actual dims.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
