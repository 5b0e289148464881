//! Loss functions for shape comparison.
//!
//! A loss measures the discrepancy between a morphed source shape and the
//! target; lower values indicate better alignment.

pub mod l2;
pub mod trait_;

pub use l2::L2Loss;
pub use trait_::Loss;
