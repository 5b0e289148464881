//! Model trait for shape deformation.
//!
//! This module defines the core Model trait that all deformation models must
//! implement, and the MorphingOutput container threading results between the
//! model and the registration pipeline.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rshapes_core::{PolyData, Result};

/// Model trait for parametric shape deformation.
///
/// A model maps `(shape, parameter)` to a morphed shape. The parameter is the
/// sole optimization variable of a registration; its required layout is a
/// deterministic function of the shape's geometry.
///
/// `morph` must be a pure function of its inputs (the input shape is never
/// mutated) and differentiable with respect to `parameter`: the registration
/// loop computes gradients through this call.
///
/// # Type Parameters
/// * `B` - The tensor backend
pub trait Model<B: Backend> {
    /// Required parameter layout `[rows, cols]` for the given shape.
    ///
    /// Depends only on the shape's geometry, never on parameter values. Must
    /// be consulted before allocating a parameter tensor.
    ///
    /// # Errors
    /// Returns `Error::NotImplemented` for declared-but-unsupported model
    /// configurations.
    fn parameter_shape(&self, shape: &PolyData<B>) -> Result<[usize; 2]>;

    /// Morph a shape under the given parameter.
    ///
    /// The parameter is moved onto the shape's device if the two differ;
    /// gradient tracking survives the move. When `return_path` is set, the
    /// output carries one shape per integration step plus the initial state.
    /// When `return_regularization` is unset, the output's regularization is
    /// absent rather than zero, since computing it can be expensive.
    ///
    /// # Errors
    /// A parameter whose layout does not match `parameter_shape` is rejected
    /// with a shape mismatch before any numerical work.
    fn morph(
        &self,
        shape: &PolyData<B>,
        parameter: Tensor<B, 2>,
        return_path: bool,
        return_regularization: bool,
    ) -> Result<MorphingOutput<B>>;

    /// Pre-fit hook, called once per `fit` with the device-resident source.
    ///
    /// Models that cache geometry-dependent quantities do so here. The
    /// default does nothing.
    fn prepare(&mut self, _source: &PolyData<B>) -> Result<()> {
        Ok(())
    }

    /// Get the name of this model.
    fn name(&self) -> &'static str;
}

/// Result of a `Model::morph` call.
///
/// The morphed shape is always present. Regularization, path and path length
/// are only populated when explicitly requested, and their absence is
/// distinguishable from a meaningful zero.
#[derive(Debug, Clone)]
pub struct MorphingOutput<B: Backend> {
    morphed_shape: PolyData<B>,
    regularization: Option<Tensor<B, 1>>,
    path: Option<Vec<PolyData<B>>>,
    path_length: Option<Tensor<B, 1>>,
}

impl<B: Backend> MorphingOutput<B> {
    /// Create an output carrying only the morphed shape.
    pub fn new(morphed_shape: PolyData<B>) -> Self {
        Self {
            morphed_shape,
            regularization: None,
            path: None,
            path_length: None,
        }
    }

    /// Attach the regularization energy.
    pub fn with_regularization(mut self, regularization: Tensor<B, 1>) -> Self {
        self.regularization = Some(regularization);
        self
    }

    /// Attach the sequence of intermediate shapes.
    pub fn with_path(mut self, path: Vec<PolyData<B>>) -> Self {
        self.path = Some(path);
        self
    }

    /// Attach the total path length.
    pub fn with_path_length(mut self, path_length: Tensor<B, 1>) -> Self {
        self.path_length = Some(path_length);
        self
    }

    /// The shape after deformation.
    pub fn morphed_shape(&self) -> &PolyData<B> {
        &self.morphed_shape
    }

    /// Consume the output, keeping only the morphed shape.
    pub fn into_morphed_shape(self) -> PolyData<B> {
        self.morphed_shape
    }

    /// Regularization energy, if it was requested.
    pub fn regularization(&self) -> Option<&Tensor<B, 1>> {
        self.regularization.as_ref()
    }

    /// Intermediate shapes (initial state first), if a path was requested.
    pub fn path(&self) -> Option<&[PolyData<B>]> {
        self.path.as_deref()
    }

    /// Total length of the integration path, if a path was requested.
    pub fn path_length(&self) -> Option<&Tensor<B, 1>> {
        self.path_length.as_ref()
    }
}
