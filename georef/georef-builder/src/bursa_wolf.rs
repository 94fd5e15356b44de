//! Seven-parameter Bursa-Wolf similarity between geocentric frames.
//!
//! ```text
//! t = T + (1 + ppm·1e-6) · R(rx, ry, rz) · s
//! R = Rz(rz) · Ry(ry) · Rx(rx)
//! ```
//!
//! The fit works on coordinates centred on their centroids, which keeps the
//! translation and rotation columns decoupled for points far from the
//! origin. Gauss-Newton starts from the closed-form Kabsch rotation and
//! scale of the centred points, so rotations of any size converge; for the
//! usual sub-arc-second datum shifts the first step is the classic
//! small-angle linearisation.

use crate::checks::{check_input, point_weights};
use crate::error::{EstimationError, EstimationResult};
use crate::family::TransformFamily;
use crate::params::SolverParams;
use crate::solver::solve_weighted;
use crate::statistics::log_fit;
use crate::traits::{CoordinateTransform, TransformBuilder};
use georef_types::Correspondence3;
use nalgebra::{DMatrix, DVector, Matrix3, Point3, Rotation3, Vector3};
use std::fmt;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const ARCSECONDS_PER_RADIAN: f64 = 180.0 * 3600.0 / std::f64::consts::PI;
const PPM: f64 = 1e-6;

/// Translations, rotations and scale of a Bursa-Wolf transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BursaWolfParameters {
    /// Translation along X.
    pub dx: f64,
    /// Translation along Y.
    pub dy: f64,
    /// Translation along Z.
    pub dz: f64,
    /// Rotation about X, radians.
    pub rx: f64,
    /// Rotation about Y, radians.
    pub ry: f64,
    /// Rotation about Z, radians.
    pub rz: f64,
    /// Scale difference, parts per million.
    pub ppm: f64,
}

impl BursaWolfParameters {
    /// Parameters of the identity transform.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            dz: 0.0,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            ppm: 0.0,
        }
    }

    /// Translation vector.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.dx, self.dy, self.dz)
    }

    /// Rotations `(rx, ry, rz)` in arc-seconds.
    #[must_use]
    pub fn rotation_arcseconds(&self) -> [f64; 3] {
        [
            self.rx * ARCSECONDS_PER_RADIAN,
            self.ry * ARCSECONDS_PER_RADIAN,
            self.rz * ARCSECONDS_PER_RADIAN,
        ]
    }

    /// Rotation matrix `Rz · Ry · Rx`.
    #[must_use]
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(self.rx, self.ry, self.rz)
    }

    /// Multiplicative scale `1 + ppm·1e-6`.
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        self.ppm.mul_add(PPM, 1.0)
    }
}

impl fmt::Display for BursaWolfParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [ax, ay, az] = self.rotation_arcseconds();
        writeln!(f, "  dx  = {:.4}", self.dx)?;
        writeln!(f, "  dy  = {:.4}", self.dy)?;
        writeln!(f, "  dz  = {:.4}", self.dz)?;
        writeln!(f, "  rx  = {:.12} rad ({ax:.6}\")", self.rx)?;
        writeln!(f, "  ry  = {:.12} rad ({ay:.6}\")", self.ry)?;
        writeln!(f, "  rz  = {:.12} rad ({az:.6}\")", self.rz)?;
        writeln!(f, "  ppm = {:.6}", self.ppm)
    }
}

/// A fitted Bursa-Wolf transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BursaWolfTransform {
    parameters: BursaWolfParameters,
    rotation: Rotation3<f64>,
    scale: f64,
}

impl BursaWolfTransform {
    /// Creates a transform from its parameters.
    #[must_use]
    pub fn new(parameters: BursaWolfParameters) -> Self {
        Self {
            parameters,
            rotation: parameters.rotation(),
            scale: parameters.scale_factor(),
        }
    }

    /// The transform's parameters.
    #[must_use]
    pub const fn parameters(&self) -> &BursaWolfParameters {
        &self.parameters
    }

    /// Maps a point.
    #[must_use]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.parameters.translation() + self.rotation * point.coords * self.scale)
    }

    /// Combined scaled rotation matrix `(1 + ppm·1e-6)·R`.
    #[must_use]
    pub fn linear_matrix(&self) -> Matrix3<f64> {
        self.rotation.matrix() * self.scale
    }
}

impl CoordinateTransform<3> for BursaWolfTransform {
    fn transform_point(&self, point: &Point3<f64>) -> EstimationResult<Point3<f64>> {
        Ok(self.apply(point))
    }
}

/// Gauss-Newton builder for [`BursaWolfTransform`].
///
/// # Example
///
/// ```
/// use georef_builder::{BursaWolfBuilder, Correspondence3, TransformBuilder};
///
/// let pairs = vec![
///     Correspondence3::from_arrays([1000.0, 0.0, 0.0], [1010.0, 5.0, -3.0]),
///     Correspondence3::from_arrays([0.0, 1000.0, 0.0], [10.0, 1005.0, -3.0]),
///     Correspondence3::from_arrays([0.0, 0.0, 1000.0], [10.0, 5.0, 997.0]),
/// ];
/// let builder = BursaWolfBuilder::new(pairs).unwrap();
/// let params = builder.parameters().unwrap();
///
/// assert!((params.dx - 10.0).abs() < 1e-6);
/// assert!(builder.error_statistics().unwrap().rms() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct BursaWolfBuilder {
    correspondences: Vec<Correspondence3>,
    weighted: bool,
    solver: SolverParams,
}

impl BursaWolfBuilder {
    /// Creates a builder over at least three 3D correspondences.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` with fewer than three correspondences and
    /// `InvalidAccuracy` when an accuracy cannot be used as a weight.
    pub fn new(correspondences: Vec<Correspondence3>) -> EstimationResult<Self> {
        check_input(TransformFamily::BursaWolf, &correspondences)?;
        Ok(Self {
            correspondences,
            weighted: false,
            solver: SolverParams::default(),
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

    /// Fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if weights are missing, the points are collinear or
    /// the iteration does not converge.
    #[allow(clippy::cast_precision_loss)]
    pub fn parameters(&self) -> EstimationResult<BursaWolfParameters> {
        let weights = point_weights(&self.correspondences, self.weighted)?;
        let n = self.correspondences.len();
        let source_center = centroid(self.correspondences.iter().map(|c| &c.source));
        let target_center = centroid(self.correspondences.iter().map(|c| &c.target));
        let sources: Vec<Vector3<f64>> = self
            .correspondences
            .iter()
            .map(|c| c.source - source_center)
            .collect();
        let targets: Vec<Vector3<f64>> = self
            .correspondences
            .iter()
            .map(|c| c.target - target_center)
            .collect();
        let spread = sources.iter().map(|q| q.norm()).sum::<f64>() / n as f64;
        let length = if spread > 0.0 { spread } else { 1.0 };

        let mut row_weights = DVector::zeros(3 * n);
        for (i, &w) in weights.iter().enumerate() {
            for axis in 0..3 {
                row_weights[3 * i + axis] = w;
            }
        }

        // [T'x, T'y, T'z, rx, ry, rz, s]
        let mut x = initial_guess(&sources, &targets, &weights);
        let mut correction = f64::INFINITY;
        for iteration in 1..=self.solver.max_iterations {
            let (design, residuals) = linearize(&x, &sources, &targets);
            let delta = solve_weighted(&design, &row_weights, &residuals, &self.solver)?;
            for (value, d) in x.iter_mut().zip(delta.iter()) {
                *value += d;
            }
            correction = (0..3)
                .map(|k| delta[k].abs() / length)
                .chain((3..7).map(|k| delta[k].abs()))
                .fold(0.0, f64::max);
            debug!(iteration, correction, "Bursa-Wolf iteration");

            if !correction.is_finite() {
                break;
            }
            if correction <= self.solver.convergence_threshold {
                let rotation = Rotation3::from_euler_angles(x[3], x[4], x[5]);
                let scale = 1.0 + x[6];
                let translation = Vector3::new(x[0], x[1], x[2]) + target_center.coords
                    - rotation * source_center.coords * scale;
                return Ok(BursaWolfParameters {
                    dx: translation.x,
                    dy: translation.y,
                    dz: translation.z,
                    rx: x[3],
                    ry: x[4],
                    rz: x[5],
                    ppm: x[6] / PPM,
                });
            }
        }
        Err(EstimationError::DidNotConverge {
            iterations: self.solver.max_iterations,
            correction,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn centroid<'a>(points: impl ExactSizeIterator<Item = &'a Point3<f64>>) -> Point3<f64> {
    let n = points.len().max(1) as f64;
    Point3::from(points.fold(Vector3::zeros(), |acc, p| acc + p.coords) / n)
}

/// Weighted Kabsch rotation and least-squares scale of centred points, as
/// `[0, 0, 0, rx, ry, rz, s]`. Falls back to the identity when the points
/// carry no rotation information.
fn initial_guess(sources: &[Vector3<f64>], targets: &[Vector3<f64>], weights: &[f64]) -> [f64; 7] {
    let mut guess = [0.0_f64; 7];
    let mut h = Matrix3::zeros();
    for ((q, t), w) in sources.iter().zip(targets).zip(weights) {
        h += q * t.transpose() * *w;
    }

    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return guess;
    };
    let mut v = v_t.transpose();
    if (v * u.transpose()).determinant() < 0.0 {
        v.column_mut(2).neg_mut();
    }
    let rotation = Rotation3::from_matrix_unchecked(v * u.transpose());

    let mut aligned = 0.0;
    let mut norm = 0.0;
    for ((q, t), w) in sources.iter().zip(targets).zip(weights) {
        aligned += w * t.dot(&(rotation * q));
        norm += w * q.norm_squared();
    }
    let scale = aligned / norm;
    if !scale.is_finite() || scale <= 0.0 {
        return guess;
    }

    let (rx, ry, rz) = rotation.euler_angles();
    guess[3] = rx;
    guess[4] = ry;
    guess[5] = rz;
    guess[6] = scale - 1.0;
    guess
}

/// Jacobian and residuals of the centred model `t = T' + (1 + s)·R·q`, three
/// rows per correspondence.
fn linearize(
    x: &[f64; 7],
    sources: &[Vector3<f64>],
    targets: &[Vector3<f64>],
) -> (DMatrix<f64>, DVector<f64>) {
    let (rx, ry, rz) = (x[3], x[4], x[5]);
    let scale = 1.0 + x[6];
    let translation = Vector3::new(x[0], x[1], x[2]);

    let (sx, cx) = rx.sin_cos();
    let (sy, cy) = ry.sin_cos();
    let (sz, cz) = rz.sin_cos();
    let r_x = Matrix3::new(1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx);
    let r_y = Matrix3::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
    let r_z = Matrix3::new(cz, -sz, 0.0, sz, cz, 0.0, 0.0, 0.0, 1.0);
    let d_x = Matrix3::new(0.0, 0.0, 0.0, 0.0, -sx, -cx, 0.0, cx, -sx);
    let d_y = Matrix3::new(-sy, 0.0, cy, 0.0, 0.0, 0.0, -cy, 0.0, -sy);
    let d_z = Matrix3::new(-sz, -cz, 0.0, cz, -sz, 0.0, 0.0, 0.0, 0.0);

    let rotation = r_z * r_y * r_x;
    let partials = [r_z * r_y * d_x, r_z * d_y * r_x, d_z * r_y * r_x];

    let n = sources.len();
    let mut design = DMatrix::zeros(3 * n, 7);
    let mut residuals = DVector::zeros(3 * n);
    for (i, (q, t)) in sources.iter().zip(targets).enumerate() {
        let rotated = rotation * q;
        let model = translation + rotated * scale;
        let columns = [
            partials[0] * q * scale,
            partials[1] * q * scale,
            partials[2] * q * scale,
        ];
        for axis in 0..3 {
            let row = 3 * i + axis;
            design[(row, axis)] = 1.0;
            for (k, column) in columns.iter().enumerate() {
                design[(row, 3 + k)] = column[axis];
            }
            design[(row, 6)] = rotated[axis];
            residuals[row] = t[axis] - model[axis];
        }
    }
    (design, residuals)
}

impl TransformBuilder<3> for BursaWolfBuilder {
    type Transform = BursaWolfTransform;

    fn family(&self) -> TransformFamily {
        TransformFamily::BursaWolf
    }

    fn correspondences(&self) -> &[Correspondence3] {
        &self.correspondences
    }

    fn transform(&self) -> EstimationResult<BursaWolfTransform> {
        let transform = BursaWolfTransform::new(self.parameters()?);
        log_fit(self.family(), self.correspondences.len());
        Ok(transform)
    }

    fn describe(&self) -> EstimationResult<String> {
        let parameters = self.parameters()?;
        Ok(format!(
            "Bursa-Wolf ({} points)\n{parameters}",
            self.correspondences.len()
        ))
    }
}
