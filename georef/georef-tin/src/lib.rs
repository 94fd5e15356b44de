//! Delaunay triangulation of correspondences inside a quadrilateral.
//!
//! This crate builds the triangulated irregular network (TIN) behind
//! rubber-sheet transforms:
//! - **Quadrilateral seeding** - the boundary is split into two triangles
//! - **Incremental insertion** - each vertex splits its containing triangle
//! - **Lawson flips** - restore the empty-circumcircle property after each insert
//!
//! The mesh is an arena: triangles live in a flat `Vec` and refer to their
//! vertices and neighbours by index. The returned [`Tin`] is immutable.
//!
//! # Layer 0
//!
//! This is a Layer 0 crate: pure computation with no I/O or engine dependencies.
//!
//! # Example
//!
//! ```
//! use georef_tin::{triangulate, TinParams};
//! use georef_types::{Correspondence2, Point2, Quadrilateral};
//!
//! let quad = Quadrilateral::from_source_and_target([
//!     ([0.0, 0.0], [0.0, 0.0]),
//!     ([1000.0, 0.0], [1000.0, 0.0]),
//!     ([1000.0, 1000.0], [1000.0, 1000.0]),
//!     ([0.0, 1000.0], [0.0, 1000.0]),
//! ]);
//! let interior = vec![
//!     Correspondence2::from_coords(250.0, 300.0, 252.0, 301.0),
//!     Correspondence2::from_coords(600.0, 700.0, 598.0, 705.0),
//!     Correspondence2::from_coords(800.0, 200.0, 801.0, 199.0),
//! ];
//!
//! let tin = triangulate(&quad, &interior, &TinParams::default()).unwrap();
//! assert!(tin.is_delaunay(1e-9));
//!
//! let t = tin.locate(&Point2::new(500.0, 500.0)).unwrap();
//! println!("query falls in triangle {t} of {}", tin.triangle_count());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod params;
mod tin;
mod triangle;
mod triangulate;

pub use error::{TinError, TinResult};
pub use params::TinParams;
pub use tin::{CORNER_COUNT, Tin};
pub use triangle::{Circumcircle, TinTriangle, orient2d};
pub use triangulate::triangulate;
