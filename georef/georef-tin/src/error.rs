//! Error types for triangulation.

use thiserror::Error;

/// Result type for triangulation operations.
pub type TinResult<T> = Result<T, TinError>;

/// Errors that can occur while building a TIN.
///
/// Every variant is fatal: no partial mesh is ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TinError {
    /// An interior vertex lies outside the quadrilateral.
    #[error("vertex {index} at ({x}, {y}) lies outside the quadrilateral")]
    VertexOutsideBoundary {
        /// Index of the vertex in the interior list.
        index: usize,
        /// Source x coordinate.
        x: f64,
        /// Source y coordinate.
        y: f64,
    },

    /// The quadrilateral has (near) zero area or a collinear corner.
    #[error("quadrilateral is degenerate (signed area {area:.3e})")]
    DegenerateBoundary {
        /// Signed shoelace area of the source polygon.
        area: f64,
    },

    /// The quadrilateral is self-intersecting or has a reflex corner.
    #[error("quadrilateral is self-intersecting or not convex at corner {corner}")]
    NonConvexBoundary {
        /// Offending corner, in counter-clockwise order.
        corner: usize,
    },

    /// An interior vertex coincides with a vertex already in the mesh.
    #[error("vertex {index} at ({x}, {y}) duplicates an existing mesh vertex")]
    DuplicateVertex {
        /// Index of the vertex in the interior list.
        index: usize,
        /// Source x coordinate.
        x: f64,
        /// Source y coordinate.
        y: f64,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
