//! B-spline curves in knots + multiplicities form.

use std::f64::consts::PI;

use curved_kernel_math::{Point3, Transform, Vec3};
use nalgebra::Vector4;

use crate::{
    group_knots, validate_knots, validate_weights, KnotAxis, NurbsError, Result, KNOT_RESOLUTION,
};

/// A (possibly rational, possibly periodic) B-spline curve in 3D.
///
/// Unit weights make it an ordinary polynomial B-spline.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    poles: Vec<Point3>,
    weights: Vec<f64>,
    knots: Vec<f64>,
    mults: Vec<usize>,
    degree: usize,
    periodic: bool,
    axis: KnotAxis,
}

impl BSplineCurve {
    /// Create a B-spline curve.
    ///
    /// `weights` of `None` means all weights are 1.
    ///
    /// # Errors
    /// Returns an error if the knot structure does not match the pole count
    /// or a weight is not strictly positive.
    pub fn new(
        poles: Vec<Point3>,
        weights: Option<Vec<f64>>,
        knots: Vec<f64>,
        mults: Vec<usize>,
        degree: usize,
        periodic: bool,
    ) -> Result<Self> {
        validate_knots(&knots, &mults, degree, periodic, poles.len())?;
        let weights = weights.unwrap_or_else(|| vec![1.0; poles.len()]);
        validate_weights(&weights, poles.len())?;
        let axis = KnotAxis::new(&knots, &mults, degree, periodic, poles.len());
        Ok(Self {
            poles,
            weights,
            knots,
            mults,
            degree,
            periodic,
            axis,
        })
    }

    /// Create a non-periodic curve from a flat knot vector.
    pub fn from_flat_knots(
        poles: Vec<Point3>,
        weights: Option<Vec<f64>>,
        flat: &[f64],
        degree: usize,
    ) -> Result<Self> {
        let (knots, mults) = group_knots(flat);
        Self::new(poles, weights, knots, mults, degree, false)
    }

    /// Create a clamped uniform B-spline with the given degree on `[0, 1]`.
    pub fn clamped_uniform(poles: Vec<Point3>, degree: usize) -> Result<Self> {
        let n = poles.len();
        if n <= degree {
            return Err(NurbsError::TooFewPoints {
                required: degree + 1,
                found: n,
            });
        }
        let n_internal = n - degree - 1;
        let mut knots = Vec::with_capacity(n_internal + 2);
        let mut mults = Vec::with_capacity(n_internal + 2);
        knots.push(0.0);
        mults.push(degree + 1);
        for i in 1..=n_internal {
            knots.push(i as f64 / (n_internal + 1) as f64);
            mults.push(1);
        }
        knots.push(1.0);
        mults.push(degree + 1);
        Self::new(poles, None, knots, mults, degree, false)
    }

    /// Degree-1 segment from `start` to `end` on the parameter range `[t0, t1]`.
    pub fn segment(start: Point3, end: Point3, t0: f64, t1: f64) -> Result<Self> {
        Self::new(vec![start, end], None, vec![t0, t1], vec![2, 2], 1, false)
    }

    /// Rational quadratic circular arc.
    ///
    /// The arc runs from angle `start` to `end` (radians, `end > start`,
    /// at most one full turn) in the frame `center + r (cos a x_dir + sin a y_dir)`.
    /// The parameter domain is `[start, end]`, split into at most four
    /// quarter-turn spans.
    pub fn arc(
        center: Point3,
        x_dir: Vec3,
        y_dir: Vec3,
        radius: f64,
        start: f64,
        end: f64,
    ) -> Result<Self> {
        let sweep = (end - start).min(2.0 * PI);
        if sweep.is_nan() || sweep <= 0.0 {
            return Err(NurbsError::KnotsNotIncreasing(1));
        }
        let n_arcs = ((sweep / (PI / 2.0)).ceil() as usize).clamp(1, 4);
        let d_theta = sweep / n_arcs as f64;
        let w_mid = (d_theta / 2.0).cos();
        let at = |angle: f64, r: f64| -> Point3 {
            let (s, c) = angle.sin_cos();
            center + r * (c * x_dir + s * y_dir)
        };

        let mut poles = vec![at(start, radius)];
        let mut weights = vec![1.0];
        let mut knots = vec![start];
        let mut mults = vec![3];
        for i in 1..=n_arcs {
            let a0 = start + (i - 1) as f64 * d_theta;
            let a1 = a0 + d_theta;
            poles.push(at(a0 + d_theta / 2.0, radius / w_mid));
            weights.push(w_mid);
            poles.push(at(a1, radius));
            weights.push(1.0);
            knots.push(start + i as f64 * d_theta);
            mults.push(if i == n_arcs { 3 } else { 2 });
        }

        Self::new(poles, Some(weights), knots, mults, 2, false)
    }

    /// Control points.
    pub fn poles(&self) -> &[Point3] {
        &self.poles
    }

    /// Pole weights (all 1 for a non-rational curve).
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Distinct knot values.
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Multiplicity of each distinct knot.
    pub fn multiplicities(&self) -> &[usize] {
        &self.mults
    }

    /// Polynomial degree.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// True if the curve is periodic.
    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// True if any weight differs from 1.
    pub fn is_rational(&self) -> bool {
        self.weights.iter().any(|w| (w - 1.0).abs() > 1e-15)
    }

    /// Number of control points.
    pub fn num_poles(&self) -> usize {
        self.poles.len()
    }

    /// Parameter domain `(t_min, t_max)`.
    pub fn parameter_domain(&self) -> (f64, f64) {
        self.axis.domain()
    }

    /// Evaluate the curve at parameter `t`.
    pub fn eval(&self, t: f64) -> Point3 {
        let mut hx = 0.0;
        let mut hy = 0.0;
        let mut hz = 0.0;
        let mut hw = 0.0;
        for (idx, b) in self.axis.basis(t) {
            let p = &self.poles[idx];
            let w = b * self.weights[idx];
            hx += w * p.x;
            hy += w * p.y;
            hz += w * p.z;
            hw += w;
        }
        if hw.abs() < 1e-30 {
            Point3::origin()
        } else {
            Point3::new(hx / hw, hy / hw, hz / hw)
        }
    }

    /// Tangent vector at parameter `t` by central differences.
    pub fn tangent(&self, t: f64) -> Vec3 {
        let (t_min, t_max) = self.parameter_domain();
        let dt = (t_max - t_min) * 1e-7;
        let t0 = (t - dt).max(t_min);
        let t1 = (t + dt).min(t_max);
        (self.eval(t1) - self.eval(t0)) / (t1 - t0)
    }

    /// Apply an affine transform to the control points.
    ///
    /// Rational B-splines are affinely invariant, so the weights stay as they are.
    pub fn transform(&self, t: &Transform) -> Self {
        Self {
            poles: self.poles.iter().map(|p| t.apply_point(p)).collect(),
            ..self.clone()
        }
    }

    /// True if `other` has the same degree, knots, multiplicities, periodicity
    /// and pole count, so the two can be blended pole by pole.
    pub fn is_compatible(&self, other: &BSplineCurve) -> bool {
        self.degree == other.degree
            && self.periodic == other.periodic
            && self.poles.len() == other.poles.len()
            && self.mults == other.mults
            && self.knots.len() == other.knots.len()
            && self
                .knots
                .iter()
                .zip(&other.knots)
                .all(|(a, b)| (a - b).abs() <= 1e-9)
    }

    /// Linear blend of two compatible curves' poles and weights.
    ///
    /// `t = 0` reproduces `self`, `t = 1` reproduces `other`.
    pub fn blend(&self, other: &BSplineCurve, t: f64) -> Option<Self> {
        if !self.is_compatible(other) {
            return None;
        }
        let poles = self
            .poles
            .iter()
            .zip(&other.poles)
            .map(|(a, b)| a + (b - a) * t)
            .collect();
        let weights = self
            .weights
            .iter()
            .zip(&other.weights)
            .map(|(a, b)| a + (b - a) * t)
            .collect();
        Some(Self {
            poles,
            weights,
            ..self.clone()
        })
    }

    /// The part of the curve between `first` and `last` as a non-periodic curve.
    ///
    /// Returns a clone when the range covers the whole domain. Otherwise both
    /// ends are inserted as knots of multiplicity `degree` and the poles
    /// between them are kept, so the shape is reproduced exactly.
    pub fn trimmed(&self, first: f64, last: f64) -> Result<Self> {
        let (t_min, t_max) = self.parameter_domain();
        let first = first.max(t_min);
        let last = last.min(t_max);
        if last - first <= KNOT_RESOLUTION {
            return Err(NurbsError::KnotsNotIncreasing(1));
        }
        if first - t_min <= KNOT_RESOLUTION && t_max - last <= KNOT_RESOLUTION {
            return Ok(self.clone());
        }

        let p = self.degree;
        let mut flat = self.axis.flat.clone();
        let mut hpoles: Vec<Vector4<f64>> = (0..flat.len() - p - 1)
            .map(|ext| {
                let i = self.axis.pole_index(ext);
                let (q, w) = (self.poles[i], self.weights[i]);
                Vector4::new(q.x * w, q.y * w, q.z * w, w)
            })
            .collect();

        let first = snap_to_knot(&flat, first);
        while multiplicity(&flat, first) < p {
            // Span with flat[k] <= first < flat[k + 1].
            let Some(k) = flat.iter().rposition(|&u| u <= first) else {
                break;
            };
            insert_knot(&mut flat, &mut hpoles, p, first, k);
        }
        let last = snap_to_knot(&flat, last);
        while multiplicity(&flat, last) < p {
            // Span with flat[k] < last <= flat[k + 1].
            let Some(k) = flat.iter().rposition(|&u| u < last) else {
                break;
            };
            insert_knot(&mut flat, &mut hpoles, p, last, k);
        }

        let ja = flat
            .iter()
            .rposition(|&u| u == first)
            .ok_or(NurbsError::KnotsNotIncreasing(0))?;
        let ib = flat
            .iter()
            .position(|&u| u == last)
            .ok_or(NurbsError::KnotsNotIncreasing(0))?;
        if ja < p || ib <= ja {
            return Err(NurbsError::KnotsNotIncreasing(ja));
        }

        let kept = &hpoles[ja - p..ib];
        let poles = kept
            .iter()
            .map(|h| Point3::new(h.x / h.w, h.y / h.w, h.z / h.w))
            .collect();
        let weights = kept.iter().map(|h| h.w).collect();

        let mut knots = vec![first];
        let mut mults = vec![p + 1];
        let (inner, inner_mults) = group_knots(&flat[ja + 1..ib]);
        knots.extend(inner);
        mults.extend(inner_mults);
        knots.push(last);
        mults.push(p + 1);
        Self::new(poles, Some(weights), knots, mults, p, false)
    }
}

/// Replace `t` by an existing knot value when it lies within the knot resolution.
fn snap_to_knot(flat: &[f64], t: f64) -> f64 {
    flat.iter()
        .copied()
        .find(|u| (u - t).abs() <= KNOT_RESOLUTION)
        .unwrap_or(t)
}

fn multiplicity(flat: &[f64], t: f64) -> usize {
    flat.iter().filter(|&&u| u == t).count()
}

/// Boehm single knot insertion of `u` after index `k` on homogeneous poles.
fn insert_knot(
    flat: &mut Vec<f64>,
    poles: &mut Vec<Vector4<f64>>,
    degree: usize,
    u: f64,
    k: usize,
) {
    let mut out = Vec::with_capacity(poles.len() + 1);
    for i in 0..=poles.len() {
        let q = if i + degree <= k {
            poles[i]
        } else if i > k {
            poles[i - 1]
        } else {
            let alpha = (u - flat[i]) / (flat[i + degree] - flat[i]);
            poles[i] * alpha + poles[i - 1] * (1.0 - alpha)
        };
        out.push(q);
    }
    *poles = out;
    flat.insert(k + 1, u);
}
