//! Core correspondence types for point-based transform estimation.
//!
//! This crate provides the foundational types shared by the triangulation
//! engine and the transform builders:
//!
//! - [`Correspondence`] - A source/target coordinate pair with optional accuracy
//! - [`Quadrilateral`] - The four-corner boundary of a rubber-sheet domain
//! - [`Bounds2`] - Planar axis-aligned bounds used to scale tolerances
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **no I/O or engine dependencies**.
//!
//! # Units
//!
//! This library is **unit-agnostic**. All coordinates are `f64` in whatever
//! space the caller chooses (pixels, projected metres, geocentric metres).
//!
//! # Dimensionality
//!
//! Source and target of a correspondence always share a dimension, enforced
//! by the const parameter of [`Correspondence`]. Planar families use
//! [`Correspondence2`]; the geocentric Bursa-Wolf family uses
//! [`Correspondence3`].
//!
//! # Example
//!
//! ```
//! use georef_types::{Correspondence2, Quadrilateral};
//!
//! let pair = Correspondence2::from_coords(10.0, 20.0, 110.0, 220.0).with_accuracy(0.5);
//! assert_eq!(pair.weight(), Some(4.0));
//!
//! let quad = Quadrilateral::from_source_and_target([
//!     ([0.0, 0.0], [0.0, 0.0]),
//!     ([10.0, 0.0], [20.0, 0.0]),
//!     ([10.0, 10.0], [20.0, 20.0]),
//!     ([0.0, 10.0], [0.0, 20.0]),
//! ]);
//! assert!((quad.signed_area() - 100.0).abs() < 1e-12);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bounds;
mod correspondence;
mod quadrilateral;

pub use bounds::Bounds2;
pub use correspondence::{Correspondence, Correspondence2, Correspondence3};
pub use quadrilateral::Quadrilateral;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};
