//! The closed set of transform families.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tag identifying a transform family.
///
/// # Example
///
/// ```
/// use georef_builder::TransformFamily;
///
/// assert_eq!(TransformFamily::Projective.minimum_point_count(), 4);
/// assert_eq!(TransformFamily::BursaWolf.parameter_count(), Some(7));
/// assert_eq!(TransformFamily::RubberSheet.parameter_count(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TransformFamily {
    /// Six-parameter planar affine.
    Affine,
    /// Four-parameter planar similarity (uniform scale, rotation, shift).
    Similarity,
    /// Eight-parameter planar projective (homography).
    Projective,
    /// Affine with a rotation/scale/skew decomposition and constraints.
    AdvancedAffine,
    /// Seven-parameter 3D Bursa-Wolf similarity.
    BursaWolf,
    /// Piecewise affine over a Delaunay triangulation.
    RubberSheet,
}

impl TransformFamily {
    /// All families, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Affine,
        Self::Similarity,
        Self::Projective,
        Self::AdvancedAffine,
        Self::BursaWolf,
        Self::RubberSheet,
    ];

    /// Fewest correspondences the family accepts.
    #[must_use]
    pub const fn minimum_point_count(self) -> usize {
        match self {
            Self::Affine | Self::Similarity | Self::AdvancedAffine | Self::BursaWolf => 3,
            Self::Projective => 4,
            Self::RubberSheet => 0,
        }
    }

    /// Number of fitted parameters, or `None` for the piecewise family.
    #[must_use]
    pub const fn parameter_count(self) -> Option<usize> {
        match self {
            Self::Affine | Self::AdvancedAffine => Some(6),
            Self::Similarity => Some(4),
            Self::Projective => Some(8),
            Self::BursaWolf => Some(7),
            Self::RubberSheet => None,
        }
    }

    /// Coordinate dimension of the family.
    #[must_use]
    pub const fn dimension(self) -> usize {
        match self {
            Self::BursaWolf => 3,
            _ => 2,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Affine => "affine",
            Self::Similarity => "similarity",
            Self::Projective => "projective",
            Self::AdvancedAffine => "advanced affine",
            Self::BursaWolf => "Bursa-Wolf",
            Self::RubberSheet => "rubber sheet",
        }
    }
}

impl fmt::Display for TransformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_fit_minimum_observations() {
        for family in TransformFamily::ALL {
            if let Some(params) = family.parameter_count() {
                let observations = family.minimum_point_count() * family.dimension();
                assert!(params <= observations, "{family}: {params} > {observations}");
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TransformFamily::BursaWolf.to_string(), "Bursa-Wolf");
        assert_eq!(TransformFamily::RubberSheet.to_string(), "rubber sheet");
    }
}
