//! Transform estimation from point correspondences.
//!
//! Given pairs of corresponding source and target coordinates, this crate
//! fits a coordinate transform relating the two spaces:
//!
//! - [`AffineBuilder`] - six-parameter planar affine
//! - [`SimilarityBuilder`] - uniform scale, rotation and shift
//! - [`ProjectiveBuilder`] - eight-parameter homography
//! - [`AdvancedAffineBuilder`] - affine decomposed into rotation, scales and
//!   skew, with any of them pinned
//! - [`BursaWolfBuilder`] - seven-parameter geocentric similarity
//! - [`RubberSheetBuilder`] - piecewise affine over a Delaunay TIN
//!
//! Every parametric family reduces to one weighted least-squares problem,
//! solved by [`solve_weighted`]. Builders share the [`TransformBuilder`]
//! contract and produce immutable [`CoordinateTransform`] values.
//!
//! # Layer 0
//!
//! This is a Layer 0 crate: pure computation with no I/O or engine dependencies.
//!
//! # Weights
//!
//! A correspondence's accuracy is a standard deviation; with
//! `include_weights(true)` each observation is weighted by `1 / accuracy²`.
//! Every correspondence must then carry an accuracy.
//!
//! # Example
//!
//! ```
//! use georef_builder::{AffineBuilder, Correspondence2, TransformBuilder};
//!
//! let pairs = vec![
//!     Correspondence2::from_coords(0.0, 0.0, 100.0, 200.0),
//!     Correspondence2::from_coords(10.0, 0.0, 120.0, 200.0),
//!     Correspondence2::from_coords(0.0, 10.0, 100.0, 220.0),
//!     Correspondence2::from_coords(10.0, 10.0, 120.0, 220.0),
//! ];
//!
//! let builder = AffineBuilder::new(pairs).unwrap();
//! let stats = builder.error_statistics().unwrap();
//! assert!(stats.rms() < 1e-9);
//! println!("{}", builder.describe().unwrap());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod advanced_affine;
mod affine;
mod bursa_wolf;
mod checks;
mod error;
mod family;
mod linear;
mod normalize;
mod params;
mod planar;
mod projective;
mod rubber_sheet;
mod similarity;
mod solver;
mod statistics;
mod traits;

pub use advanced_affine::{AdvancedAffineBuilder, AffineDecomposition, AffineParameter};
pub use affine::{AffineBuilder, AffineTransform2};
pub use bursa_wolf::{BursaWolfBuilder, BursaWolfParameters, BursaWolfTransform};
pub use error::{EstimationError, EstimationResult};
pub use family::TransformFamily;
pub use params::{FitOptions, SolverParams};
pub use planar::{PlanarTransform, fit_planar};
pub use projective::{ProjectiveBuilder, ProjectiveTransform2};
pub use rubber_sheet::{RubberSheetBuilder, RubberSheetTransform};
pub use similarity::{SimilarityBuilder, SimilarityTransform2};
pub use solver::solve_weighted;
pub use statistics::ErrorStatistics;
pub use traits::{CoordinateTransform, TransformBuilder};

// Re-export the shared types for convenience
pub use georef_tin::{Tin, TinError, TinParams};
pub use georef_types::{Correspondence, Correspondence2, Correspondence3, Quadrilateral};
