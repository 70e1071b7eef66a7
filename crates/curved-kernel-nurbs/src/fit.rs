//! Global B-spline interpolation through a point sequence.

use curved_kernel_math::Point3;
use nalgebra::{DMatrix, DVector};

use crate::{group_knots, BSplineCurve, KnotAxis, NurbsError, Result};

/// Interpolate a clamped B-spline curve through `points`.
///
/// Parameters follow chord length, knots the averaging method, and the
/// control points come from solving the collocation system. The degree is
/// reduced to `points.len() - 1` when there are too few points for it.
/// The resulting curve passes through every input point, with the domain `[0, 1]`.
pub fn interpolate_points(points: &[Point3], degree: usize) -> Result<BSplineCurve> {
    let n = points.len();
    if n < 2 {
        return Err(NurbsError::TooFewPoints {
            required: 2,
            found: n,
        });
    }
    if degree == 0 {
        return Err(NurbsError::InvalidDegree(degree));
    }
    let p = degree.min(n - 1);

    let params = chord_length_parameters(points);
    let flat = averaging_knot_vector(&params, p);
    let (knots, mults) = group_knots(&flat);
    crate::validate_knots(&knots, &mults, p, false, n)?;

    let axis = KnotAxis::new(&knots, &mults, p, false, n);
    let mut matrix = DMatrix::<f64>::zeros(n, n);
    for (row, &t) in params.iter().enumerate() {
        for (col, b) in axis.basis(t) {
            matrix[(row, col)] = b;
        }
    }

    let lu = matrix.lu();
    let solve = |coord: fn(&Point3) -> f64| -> Result<DVector<f64>> {
        let rhs = DVector::from_iterator(n, points.iter().map(coord));
        lu.solve(&rhs).ok_or(NurbsError::SingularSystem)
    };
    let xs = solve(|p| p.x)?;
    let ys = solve(|p| p.y)?;
    let zs = solve(|p| p.z)?;

    let poles = (0..n).map(|i| Point3::new(xs[i], ys[i], zs[i])).collect();
    BSplineCurve::new(poles, None, knots, mults, p, false)
}

/// Cumulative chord length normalized to `[0, 1]`.
///
/// Coincident points fall back to uniform spacing so the parameters stay
/// strictly increasing.
fn chord_length_parameters(points: &[Point3]) -> Vec<f64> {
    let mut params = Vec::with_capacity(points.len());
    params.push(0.0);
    let mut total = 0.0;
    for w in points.windows(2) {
        total += (w[1] - w[0]).norm();
        params.push(total);
    }
    let strictly_increasing = params.windows(2).all(|w| w[1] - w[0] > 1e-12);
    if total <= 0.0 || !strictly_increasing {
        let last = (points.len() - 1) as f64;
        return (0..points.len()).map(|i| i as f64 / last).collect();
    }
    params.iter_mut().for_each(|t| *t /= total);
    params
}

/// Clamped knot vector with interior knots averaged from `degree` consecutive parameters.
fn averaging_knot_vector(params: &[f64], degree: usize) -> Vec<f64> {
    let n = params.len();
    let mut knots = Vec::with_capacity(n + degree + 1);
    knots.extend(std::iter::repeat(0.0).take(degree + 1));
    for j in 1..n - degree {
        let sum: f64 = params[j..j + degree].iter().sum();
        knots.push(sum / degree as f64);
    }
    knots.extend(std::iter::repeat(1.0).take(degree + 1));
    knots
}
