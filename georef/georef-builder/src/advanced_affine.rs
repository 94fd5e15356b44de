//! Affine transform parameterised by rotation, per-axis scale and skew.
//!
//! The 2×2 block of the affine map is decomposed as
//!
//! ```text
//! a0 = sx·cos θ      a1 = −sy·sin(θ + k)
//! b0 = sx·sin θ      b1 =  sy·cos(θ + k)
//! ```
//!
//! so any of the six decomposed parameters (θ, sx, sy, k, tx, ty) can be held
//! fixed while the rest are re-estimated by Gauss-Newton.

use crate::affine::{AffineModel, AffineTransform2};
use crate::checks::{check_input, point_weights};
use crate::error::{EstimationError, EstimationResult};
use crate::family::TransformFamily;
use crate::linear::fit_linear;
use crate::params::SolverParams;
use crate::solver::solve_weighted;
use crate::statistics::log_fit;
use crate::traits::TransformBuilder;
use georef_types::Correspondence2;
use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use std::f64::consts::{PI, TAU};
use std::fmt::{self, Write as _};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the decomposed affine parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AffineParameter {
    /// Rotation θ of the x axis, radians.
    Rotation,
    /// Scale along the rotated x axis.
    ScaleX,
    /// Scale along the rotated y axis.
    ScaleY,
    /// Skew k between the axes, radians.
    Skew,
    /// Translation in X.
    TranslationX,
    /// Translation in Y.
    TranslationY,
}

impl AffineParameter {
    /// All parameters, in decomposition order.
    pub const ALL: [Self; 6] = [
        Self::Rotation,
        Self::ScaleX,
        Self::ScaleY,
        Self::Skew,
        Self::TranslationX,
        Self::TranslationY,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Rotation => 0,
            Self::ScaleX => 1,
            Self::ScaleY => 2,
            Self::Skew => 3,
            Self::TranslationX => 4,
            Self::TranslationY => 5,
        }
    }

    /// Short label used in parameter dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rotation => "rotation",
            Self::ScaleX => "scale x",
            Self::ScaleY => "scale y",
            Self::Skew => "skew",
            Self::TranslationX => "translation x",
            Self::TranslationY => "translation y",
        }
    }
}

impl fmt::Display for AffineParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Rotation, scale, skew and translation of an affine map.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AffineDecomposition {
    /// Rotation θ, radians in `(-π, π]`.
    pub rotation: f64,
    /// Scale along x.
    pub scale_x: f64,
    /// Scale along y.
    pub scale_y: f64,
    /// Skew k, radians in `(-π, π]`.
    pub skew: f64,
    /// Translation.
    pub translation: Vector2<f64>,
}

impl AffineDecomposition {
    /// Decomposes an affine map.
    #[must_use]
    pub fn from_affine(affine: &AffineTransform2) -> Self {
        let l = &affine.linear;
        let (a0, a1, b0, b1) = (l[(0, 0)], l[(0, 1)], l[(1, 0)], l[(1, 1)]);
        let rotation = b0.atan2(a0);
        Self {
            rotation,
            scale_x: a0.hypot(b0),
            scale_y: a1.hypot(b1),
            skew: wrap_angle((-a1).atan2(b1) - rotation),
            translation: affine.translation,
        }
    }

    /// Reassembles the affine map.
    #[must_use]
    pub fn to_affine(&self) -> AffineTransform2 {
        let (sin_t, cos_t) = self.rotation.sin_cos();
        let (sin_tk, cos_tk) = (self.rotation + self.skew).sin_cos();
        AffineTransform2::new(
            Matrix2::new(
                self.scale_x * cos_t,
                -self.scale_y * sin_tk,
                self.scale_x * sin_t,
                self.scale_y * cos_tk,
            ),
            self.translation,
        )
    }

    /// Value of one parameter.
    #[must_use]
    pub fn get(&self, parameter: AffineParameter) -> f64 {
        self.to_array()[parameter.index()]
    }

    /// Copy with one parameter replaced.
    #[must_use]
    pub fn with(&self, parameter: AffineParameter, value: f64) -> Self {
        let mut values = self.to_array();
        values[parameter.index()] = value;
        Self::from_array(values)
    }

    fn to_array(&self) -> [f64; 6] {
        [
            self.rotation,
            self.scale_x,
            self.scale_y,
            self.skew,
            self.translation.x,
            self.translation.y,
        ]
    }

    fn from_array(v: [f64; 6]) -> Self {
        Self {
            rotation: v[0],
            scale_x: v[1],
            scale_y: v[2],
            skew: v[3],
            translation: Vector2::new(v[4], v[5]),
        }
    }
}

/// Maps an angle into `(-π, π]`, leaving angles already there untouched.
fn wrap_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Builder for affine maps with optional constraints on the decomposed
/// parameters.
///
/// # Example
///
/// ```
/// use georef_builder::{AdvancedAffineBuilder, AffineParameter, Correspondence2, TransformBuilder};
///
/// let pairs = vec![
///     Correspondence2::from_coords(0.0, 0.0, 0.0, 0.0),
///     Correspondence2::from_coords(10.0, 0.0, 20.0, 0.0),
///     Correspondence2::from_coords(0.0, 10.0, 1.0, 10.0),
///     Correspondence2::from_coords(10.0, 10.0, 21.0, 10.0),
/// ];
/// let builder = AdvancedAffineBuilder::new(pairs)
///     .unwrap()
///     .with_constraint(AffineParameter::Skew, 0.0);
///
/// let fitted = builder.decomposition().unwrap();
/// assert_eq!(fitted.skew, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct AdvancedAffineBuilder {
    correspondences: Vec<Correspondence2>,
    weighted: bool,
    solver: SolverParams,
    constraints: Vec<(AffineParameter, f64)>,
}

impl AdvancedAffineBuilder {
    /// Creates an unconstrained builder over at least three correspondences.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` with fewer than three correspondences and
    /// `InvalidAccuracy` when an accuracy cannot be used as a weight.
    pub fn new(correspondences: Vec<Correspondence2>) -> EstimationResult<Self> {
        check_input(TransformFamily::AdvancedAffine, &correspondences)?;
        Ok(Self {
            correspondences,
            weighted: false,
            solver: SolverParams::default(),
            constraints: Vec::new(),
        })
    }

    /// Weights each correspondence by its inverse variance.
    #[must_use]
    pub const fn include_weights(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    /// Sets the solver parameters.
    #[must_use]
    pub const fn with_solver_params(mut self, solver: SolverParams) -> Self {
        self.solver = solver;
        self
    }

    /// Pins `parameter` to `value`. A later pin of the same parameter
    /// replaces the earlier one.
    #[must_use]
    pub fn with_constraint(mut self, parameter: AffineParameter, value: f64) -> Self {
        self.constraints.retain(|(p, _)| *p != parameter);
        self.constraints.push((parameter, value));
        self
    }

    /// Pinned parameters, in the order they were added.
    #[must_use]
    pub fn constraints(&self) -> &[(AffineParameter, f64)] {
        &self.constraints
    }

    /// Whether `parameter` is pinned.
    #[must_use]
    pub fn is_constrained(&self, parameter: AffineParameter) -> bool {
        self.constraints.iter().any(|(p, _)| *p == parameter)
    }

    /// Fitted decomposition, honouring every constraint.
    ///
    /// # Errors
    ///
    /// Returns an error if weights are missing, the geometry is degenerate
    /// or the constrained iteration does not converge.
    pub fn decomposition(&self) -> EstimationResult<AffineDecomposition> {
        let weights = point_weights(&self.correspondences, self.weighted)?;
        let matrix = fit_linear::<AffineModel>(&self.correspondences, &weights, &self.solver)?;
        let unconstrained = AffineDecomposition::from_affine(&AffineTransform2::from_matrix3(&matrix));
        if self.constraints.is_empty() {
            return Ok(unconstrained);
        }

        let start = self
            .constraints
            .iter()
            .fold(unconstrained, |d, &(p, v)| d.with(p, v));
        let free: Vec<AffineParameter> = AffineParameter::ALL
            .into_iter()
            .filter(|p| !self.is_constrained(*p))
            .collect();
        if free.is_empty() {
            return Ok(start);
        }
        self.refine(start, &free, &weights)
    }

    /// Gauss-Newton over the free parameters.
    fn refine(
        &self,
        start: AffineDecomposition,
        free: &[AffineParameter],
        weights: &[f64],
    ) -> EstimationResult<AffineDecomposition> {
        let n = self.correspondences.len();
        let frame = Frame::new(&self.correspondences, free);
        let mut row_weights = DVector::zeros(2 * n);
        for (i, &w) in weights.iter().enumerate() {
            row_weights[2 * i] = w;
            row_weights[2 * i + 1] = w;
        }

        let mut current = frame.enter(&start);
        let mut correction = f64::INFINITY;
        for iteration in 1..=self.solver.max_iterations {
            let (design, residuals) = frame.linearize(&self.correspondences, &current, free);
            let delta = solve_weighted(&design, &row_weights, &residuals, &self.solver)?;

            let mut values = current.to_array();
            correction = 0.0;
            for (k, parameter) in free.iter().enumerate() {
                values[parameter.index()] += delta[k];
                let scaled = match parameter {
                    AffineParameter::TranslationX | AffineParameter::TranslationY => {
                        delta[k].abs() / frame.spread
                    }
                    _ => delta[k].abs(),
                };
                correction = correction.max(scaled);
            }
            current = AffineDecomposition::from_array(values);
            debug!(iteration, correction, "Constrained affine iteration");

            if !correction.is_finite() {
                break;
            }
            if correction <= self.solver.convergence_threshold {
                let mut fitted = frame.leave(&current);
                if free.contains(&AffineParameter::Rotation) {
                    fitted.rotation = wrap_angle(fitted.rotation);
                }
                if free.contains(&AffineParameter::Skew) {
                    fitted.skew = wrap_angle(fitted.skew);
                }
                return Ok(fitted);
            }
        }
        Err(EstimationError::DidNotConverge {
            iterations: self.solver.max_iterations,
            correction,
        })
    }
}

/// Coordinates the constrained iteration runs in.
///
/// On every axis whose translation is free, sources and targets are taken
/// relative to their centroids and the translation is the offset at the
/// source centroid. Axes with a pinned translation keep raw coordinates so
/// the pin holds in caller units.
#[derive(Debug, Clone, Copy)]
struct Frame {
    source_center: Vector2<f64>,
    target_center: Vector2<f64>,
    centred: [bool; 2],
    spread: f64,
}

impl Frame {
    #[allow(clippy::cast_precision_loss)]
    fn new(correspondences: &[Correspondence2], free: &[AffineParameter]) -> Self {
        let n = correspondences.len().max(1) as f64;
        let (sources, targets) = correspondences
            .iter()
            .fold((Vector2::<f64>::zeros(), Vector2::<f64>::zeros()), |(s, t), c| {
                (s + c.source.coords, t + c.target.coords)
            });
        let target_center = targets / n;
        let spread = correspondences
            .iter()
            .map(|c| (c.target.coords - target_center).norm())
            .sum::<f64>()
            / n;
        Self {
            source_center: sources / n,
            target_center,
            centred: [
                free.contains(&AffineParameter::TranslationX),
                free.contains(&AffineParameter::TranslationY),
            ],
            spread: if spread > 0.0 && spread.is_finite() {
                spread
            } else {
                1.0
            },
        }
    }

    /// Offset between the frame's translation and the caller's, `L·cs − ct`.
    fn shift(&self, d: &AffineDecomposition) -> Vector2<f64> {
        d.to_affine().linear * self.source_center - self.target_center
    }

    fn enter(&self, d: &AffineDecomposition) -> AffineDecomposition {
        let shift = self.shift(d);
        let mut framed = *d;
        for axis in 0..2 {
            if self.centred[axis] {
                framed.translation[axis] += shift[axis];
            }
        }
        framed
    }

    fn leave(&self, d: &AffineDecomposition) -> AffineDecomposition {
        let shift = self.shift(d);
        let mut plain = *d;
        for axis in 0..2 {
            if self.centred[axis] {
                plain.translation[axis] -= shift[axis];
            }
        }
        plain
    }

    /// Jacobian with respect to the free parameters and the residuals
    /// `target − model(source)` in frame coordinates, two rows per
    /// correspondence.
    fn linearize(
        &self,
        correspondences: &[Correspondence2],
        d: &AffineDecomposition,
        free: &[AffineParameter],
    ) -> (DMatrix<f64>, DVector<f64>) {
        let n = correspondences.len();
        let linear = d.to_affine().linear;
        let (sin_t, cos_t) = d.rotation.sin_cos();
        let (sin_tk, cos_tk) = (d.rotation + d.skew).sin_cos();

        let mut design = DMatrix::zeros(2 * n, free.len());
        let mut residuals = DVector::zeros(2 * n);
        for (i, c) in correspondences.iter().enumerate() {
            for axis in 0..2 {
                let (source, target) = if self.centred[axis] {
                    (
                        c.source.coords - self.source_center,
                        c.target[axis] - self.target_center[axis],
                    )
                } else {
                    (c.source.coords, c.target[axis])
                };
                let (x, y) = (source.x, source.y);
                let row = 2 * i + axis;
                residuals[row] = target - (linear * source)[axis] - d.translation[axis];

                for (k, parameter) in free.iter().enumerate() {
                    let partial = match parameter {
                        AffineParameter::Rotation => Vector2::new(
                            -d.scale_x * sin_t * x - d.scale_y * cos_tk * y,
                            d.scale_x * cos_t * x - d.scale_y * sin_tk * y,
                        ),
                        AffineParameter::ScaleX => Vector2::new(cos_t * x, sin_t * x),
                        AffineParameter::ScaleY => Vector2::new(-sin_tk * y, cos_tk * y),
                        AffineParameter::Skew => {
                            Vector2::new(-d.scale_y * cos_tk * y, -d.scale_y * sin_tk * y)
                        }
                        AffineParameter::TranslationX => Vector2::x(),
                        AffineParameter::TranslationY => Vector2::y(),
                    };
                    design[(row, k)] = partial[axis];
                }
            }
        }
        (design, residuals)
    }
}

impl TransformBuilder<2> for AdvancedAffineBuilder {
    type Transform = AffineTransform2;

    fn family(&self) -> TransformFamily {
        TransformFamily::AdvancedAffine
    }

    fn correspondences(&self) -> &[Correspondence2] {
        &self.correspondences
    }

    fn transform(&self) -> EstimationResult<AffineTransform2> {
        let transform = self.decomposition()?.to_affine();
        log_fit(self.family(), self.correspondences.len());
        Ok(transform)
    }

    fn describe(&self) -> EstimationResult<String> {
        let d = self.decomposition()?;
        let mut out = format!("Advanced affine ({} points)\n", self.correspondences.len());
        for parameter in AffineParameter::ALL {
            let value = d.get(parameter);
            let marker = if self.is_constrained(parameter) {
                " (fixed)"
            } else {
                ""
            };
            match parameter {
                AffineParameter::Rotation | AffineParameter::Skew => {
                    let _ = writeln!(
                        out,
                        "  {parameter:<13} = {value:.9} rad ({:.6} deg){marker}",
                        value.to_degrees()
                    );
                }
                _ => {
                    let _ = writeln!(out, "  {parameter:<13} = {value:.9}{marker}");
                }
            }
        }
        Ok(out)
    }
}
