//! Input validation shared by all builders.

use crate::error::{EstimationError, EstimationResult};
use crate::family::TransformFamily;
use georef_types::Correspondence;

/// Rejects inputs with fewer correspondences than `family` needs, or with
/// accuracies that cannot serve as weights.
pub(crate) fn check_input<const D: usize>(
    family: TransformFamily,
    correspondences: &[Correspondence<D>],
) -> EstimationResult<()> {
    let required = family.minimum_point_count();
    if correspondences.len() < required {
        return Err(EstimationError::InsufficientData {
            family,
            required,
            provided: correspondences.len(),
        });
    }
    if let Some((index, bad)) = correspondences
        .iter()
        .enumerate()
        .find(|(_, c)| !c.has_usable_accuracy())
    {
        return Err(EstimationError::InvalidAccuracy {
            index,
            accuracy: bad.accuracy.unwrap_or(f64::NAN),
        });
    }
    Ok(())
}

/// One observation weight per correspondence.
///
/// Unweighted fits use unit weights. Weighted fits require every
/// correspondence to carry an accuracy and use its inverse variance.
pub(crate) fn point_weights<const D: usize>(
    correspondences: &[Correspondence<D>],
    weighted: bool,
) -> EstimationResult<Vec<f64>> {
    if !weighted {
        return Ok(vec![1.0; correspondences.len()]);
    }
    correspondences
        .iter()
        .enumerate()
        .map(|(index, c)| c.weight().ok_or(EstimationError::MissingWeight { index }))
        .collect()
}
