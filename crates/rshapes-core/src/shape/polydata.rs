//! Polygonal shape container.
//!
//! This module provides the PolyData struct which represents 2D or 3D shapes
//! as a point-position tensor with optional edge and triangle topology.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Int, Tensor};

use crate::error::{Error, Result};

/// Polygonal shape with tensor point positions.
///
/// A PolyData combines a `[n_points, dim]` position tensor (potentially on
/// GPU) with optional connectivity. With no connectivity it is a point cloud,
/// with edges a wireframe, with triangles a triangle mesh.
///
/// Cloning a PolyData yields a structurally independent shape: tensors are
/// immutable handles, so no operation on the clone can affect the original.
///
/// # Type Parameters
/// * `B` - The backend (CPU or GPU) for tensor operations
///
/// # Examples
/// ```rust
/// use rshapes_core::PolyData;
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let points = Tensor::<Backend, 2>::from_floats([[0.0, 0.0], [1.0, 0.0]], &device);
/// let shape = PolyData::new(points).unwrap();
/// assert_eq!(shape.n_points(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PolyData<B: Backend> {
    /// Point positions, shape `[n_points, dim]`.
    points: Tensor<B, 2>,
    /// Edge connectivity, shape `[n_edges, 2]`.
    edges: Option<Tensor<B, 2, Int>>,
    /// Triangle connectivity, shape `[n_triangles, 3]`.
    triangles: Option<Tensor<B, 2, Int>>,
}

impl<B: Backend> PolyData<B> {
    /// Create a new point cloud from a `[n_points, dim]` position tensor.
    ///
    /// # Errors
    /// Returns a contract violation if the tensor is empty or `dim` is not
    /// 2 or 3.
    pub fn new(points: Tensor<B, 2>) -> Result<Self> {
        let [n, dim] = points.dims();
        if n == 0 {
            return Err(Error::contract("a shape must contain at least one point"));
        }
        if dim != 2 && dim != 3 {
            return Err(Error::contract(format!(
                "points must live in dimension 2 or 3, got {dim}"
            )));
        }
        Ok(Self {
            points,
            edges: None,
            triangles: None,
        })
    }

    /// Attach edge connectivity, turning the shape into a wireframe.
    ///
    /// # Errors
    /// Returns a shape mismatch if `edges` is not `[n_edges, 2]`, or a
    /// contract violation if any vertex index falls outside `0..n_points`.
    pub fn with_edges(mut self, edges: Tensor<B, 2, Int>) -> Result<Self> {
        let dims = edges.dims();
        if dims[1] != 2 || dims[0] == 0 {
            return Err(Error::shape_mismatch(&[dims[0].max(1), 2], &dims));
        }
        Self::check_indices(&edges, self.n_points())?;
        self.edges = Some(edges);
        Ok(self)
    }

    /// Attach triangle connectivity, turning the shape into a triangle mesh.
    ///
    /// # Errors
    /// Returns a shape mismatch if `triangles` is not `[n_triangles, 3]`, or
    /// a contract violation if any vertex index falls outside `0..n_points`.
    pub fn with_triangles(mut self, triangles: Tensor<B, 2, Int>) -> Result<Self> {
        let dims = triangles.dims();
        if dims[1] != 3 || dims[0] == 0 {
            return Err(Error::shape_mismatch(&[dims[0].max(1), 3], &dims));
        }
        Self::check_indices(&triangles, self.n_points())?;
        self.triangles = Some(triangles);
        Ok(self)
    }

    fn check_indices(connectivity: &Tensor<B, 2, Int>, n_points: usize) -> Result<()> {
        let max: i64 = connectivity.clone().max().into_scalar().elem();
        let min: i64 = connectivity.clone().min().into_scalar().elem();
        if min < 0 || max >= n_points as i64 {
            return Err(Error::contract(format!(
                "connectivity indices must be in 0..{n_points}, got range {min}..={max}"
            )));
        }
        Ok(())
    }

    /// Get the point positions.
    pub fn points(&self) -> Tensor<B, 2> {
        self.points.clone()
    }

    /// Get the edge connectivity, if any.
    pub fn edges(&self) -> Option<Tensor<B, 2, Int>> {
        self.edges.clone()
    }

    /// Get the triangle connectivity, if any.
    pub fn triangles(&self) -> Option<Tensor<B, 2, Int>> {
        self.triangles.clone()
    }

    /// Build a shape with the same topology but new point positions.
    ///
    /// This is how deformation models emit morphed shapes: connectivity is
    /// carried over unchanged, only the coordinates move.
    ///
    /// # Errors
    /// Returns a shape mismatch if `points` does not have the same
    /// `[n_points, dim]` as the current positions.
    pub fn with_points(&self, points: Tensor<B, 2>) -> Result<Self> {
        let expected = self.points.dims();
        let actual = points.dims();
        if expected != actual {
            return Err(Error::shape_mismatch(&expected, &actual));
        }
        Ok(Self {
            points,
            edges: self.edges.clone(),
            triangles: self.triangles.clone(),
        })
    }

    /// Number of points.
    pub fn n_points(&self) -> usize {
        self.points.dims()[0]
    }

    /// Spatial dimension (2 or 3).
    pub fn dim(&self) -> usize {
        self.points.dims()[1]
    }

    /// Device the point tensor lives on.
    pub fn device(&self) -> B::Device {
        self.points.device()
    }

    /// Return a clone of this shape moved to the given device.
    ///
    /// The original shape is left untouched; moving to the current device is
    /// a cheap handle copy.
    pub fn to_device(&self, device: &B::Device) -> Self {
        Self {
            points: self.points.clone().to_device(device),
            edges: self.edges.clone().map(|e| e.to_device(device)),
            triangles: self.triangles.clone().map(|t| t.to_device(device)),
        }
    }

    /// True if the shape carries no connectivity.
    pub fn is_point_cloud(&self) -> bool {
        self.edges.is_none() && self.triangles.is_none()
    }

    /// True if the shape carries edges but no triangles.
    pub fn is_wireframe(&self) -> bool {
        self.edges.is_some() && self.triangles.is_none()
    }

    /// True if the shape carries triangle connectivity.
    pub fn is_triangle_mesh(&self) -> bool {
        self.triangles.is_some()
    }
}
