//! Parameters for triangulation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters controlling geometric tolerances of the triangulation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TinParams {
    /// Relative tolerance for geometric predicates (default: 1e-10).
    ///
    /// Scaled by the quadrilateral's diagonal: lengths compare against
    /// `epsilon * diagonal`, areas and squared radii against
    /// `epsilon * diagonal²`.
    pub epsilon: f64,
}

impl Default for TinParams {
    fn default() -> Self {
        Self { epsilon: 1e-10 }
    }
}

impl TinParams {
    /// Creates parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relative tolerance.
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = TinParams::default();
        assert!((params.epsilon - 1e-10).abs() < 1e-20);
    }

    #[test]
    fn test_with_epsilon() {
        let params = TinParams::new().with_epsilon(1e-6);
        assert!((params.epsilon - 1e-6).abs() < 1e-20);
    }
}
