//! Error types for transform estimation.

use crate::family::TransformFamily;
use georef_tin::TinError;
use thiserror::Error;

/// Errors that can occur while fitting or evaluating a transform.
///
/// All errors are detected synchronously and no partial result is ever
/// returned alongside them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    /// Fewer correspondences than the family needs.
    #[error("{family} needs at least {required} correspondences, got {provided}")]
    InsufficientData {
        /// Family being fitted.
        family: TransformFamily,
        /// Minimum number of correspondences.
        required: usize,
        /// Number of correspondences supplied.
        provided: usize,
    },

    /// The normal equations are singular (collinear or coplanar input).
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Weighting was requested but a correspondence has no accuracy.
    #[error("weighted fit requested but correspondence {index} has no accuracy")]
    MissingWeight {
        /// Index of the first correspondence without accuracy.
        index: usize,
    },

    /// A correspondence carries an accuracy that cannot be used as a weight.
    #[error("correspondence {index} has invalid accuracy {accuracy} (must be finite and > 0)")]
    InvalidAccuracy {
        /// Index of the offending correspondence.
        index: usize,
        /// The rejected accuracy.
        accuracy: f64,
    },

    /// The rubber-sheet mesh could not be built.
    #[error("triangulation failed: {0}")]
    Triangulation(#[from] TinError),

    /// A query point lies outside the region where the transform is defined.
    #[error("point ({x}, {y}) is outside the transform domain")]
    EvaluationOutOfDomain {
        /// Query x coordinate.
        x: f64,
        /// Query y coordinate.
        y: f64,
    },

    /// An iterative solve did not settle within the iteration limit.
    #[error("solver did not converge after {iterations} iterations (last correction {correction:.3e})")]
    DidNotConverge {
        /// Number of iterations performed.
        iterations: usize,
        /// Size of the last parameter correction.
        correction: f64,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for estimation operations.
pub type EstimationResult<T> = Result<T, EstimationError>;
