//! Parameters for least-squares fitting.

use georef_tin::TinParams;
use georef_types::Quadrilateral;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters for the weighted least-squares solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverParams {
    /// Smallest accepted ratio between the smallest and largest singular
    /// value of the equilibrated normal matrix (default: 1e-12).
    ///
    /// Below it the system is reported as degenerate.
    pub singularity_tolerance: f64,
    /// Maximum Gauss-Newton iterations for non-linear families (default: 50).
    pub max_iterations: usize,
    /// Scaled parameter correction below which iteration stops (default: 1e-9).
    pub convergence_threshold: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            singularity_tolerance: 1e-12,
            max_iterations: 50,
            convergence_threshold: 1e-9,
        }
    }
}

impl SolverParams {
    /// Creates solver parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the singularity tolerance.
    #[must_use]
    pub const fn with_singularity_tolerance(mut self, tolerance: f64) -> Self {
        self.singularity_tolerance = tolerance;
        self
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the convergence threshold.
    #[must_use]
    pub const fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }
}

/// Options for fitting a planar family chosen at runtime.
///
/// See [`fit_planar`](crate::fit_planar).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitOptions {
    /// Weight observations by their accuracy (default: false).
    pub weighted: bool,
    /// Solver parameters.
    pub solver: SolverParams,
    /// Triangulation parameters for rubber sheets.
    pub tin: TinParams,
    /// Rubber-sheet boundary. When `None`, the source bounds are padded by
    /// `boundary_margin` and the corners mapped with an affine fit.
    pub boundary: Option<Quadrilateral>,
    /// Relative padding of the automatic rubber-sheet boundary (default: 0.05).
    pub boundary_margin: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            weighted: false,
            solver: SolverParams::default(),
            tin: TinParams::default(),
            boundary: None,
            boundary_margin: 0.05,
        }
    }
}

impl FitOptions {
    /// Creates fit options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables accuracy weighting.
    #[must_use]
    pub const fn with_weights(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    /// Sets the solver parameters.
    #[must_use]
    pub const fn with_solver(mut self, solver: SolverParams) -> Self {
        self.solver = solver;
        self
    }

    /// Sets an explicit rubber-sheet boundary.
    #[must_use]
    pub const fn with_boundary(mut self, boundary: Quadrilateral) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Sets the automatic boundary padding.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // max is not const fn
    pub fn with_boundary_margin(mut self, margin: f64) -> Self {
        self.boundary_margin = margin.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_solver_params() {
        let params = SolverParams::default();
        assert_eq!(params.max_iterations, 50);
        assert!((params.singularity_tolerance - 1e-12).abs() < 1e-24);
    }

    #[test]
    fn test_builder_pattern() {
        let options = FitOptions::new()
            .with_weights(true)
            .with_solver(SolverParams::new().with_max_iterations(5))
            .with_boundary_margin(-1.0);
        assert!(options.weighted);
        assert_eq!(options.solver.max_iterations, 5);
        assert!(options.boundary_margin.abs() < f64::EPSILON);
    }
}
