//! Tensor-product B-spline surfaces.

use curved_kernel_math::{Point3, Transform, Vec3};

use crate::{validate_knots, validate_weights, KnotAxis, NurbsError, Result};

/// Construction arguments for [`BSplineSurface::from_spec`].
///
/// Poles are given as rows: `poles[v][u]`. Each row runs along U; successive
/// rows advance along V.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSpec {
    /// Pole rows, `poles[v][u]`.
    pub poles: Vec<Vec<Point3>>,
    /// Weights, flattened row-major like the poles. `None` means all 1.
    pub weights: Option<Vec<f64>>,
    /// Distinct knots in V.
    pub v_knots: Vec<f64>,
    /// Multiplicities in V.
    pub v_mults: Vec<usize>,
    /// Distinct knots in U.
    pub u_knots: Vec<f64>,
    /// Multiplicities in U.
    pub u_mults: Vec<usize>,
    /// Periodic in V.
    pub v_periodic: bool,
    /// Periodic in U.
    pub u_periodic: bool,
    /// Degree in U.
    pub u_degree: usize,
    /// Degree in V.
    pub v_degree: usize,
}

/// A (possibly rational) tensor-product B-spline surface.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineSurface {
    /// Control points in row-major order: index `v * n_u + u`.
    control_points: Vec<Point3>,
    weights: Vec<f64>,
    n_u: usize,
    n_v: usize,
    u_axis: KnotAxis,
    v_axis: KnotAxis,
    u_degree: usize,
    v_degree: usize,
}

impl BSplineSurface {
    /// Build a surface from pole rows plus knots and multiplicities in both directions.
    ///
    /// # Errors
    /// Returns an error if rows differ in length, the weights do not match
    /// the poles, or either knot structure is inconsistent with the pole grid.
    pub fn from_spec(spec: &SurfaceSpec) -> Result<Self> {
        let n_v = spec.poles.len();
        let n_u = spec.poles.first().map_or(0, Vec::len);
        for (row, poles) in spec.poles.iter().enumerate() {
            if poles.len() != n_u {
                return Err(NurbsError::RaggedPoles {
                    row,
                    expected: n_u,
                    found: poles.len(),
                });
            }
        }

        validate_knots(
            &spec.u_knots,
            &spec.u_mults,
            spec.u_degree,
            spec.u_periodic,
            n_u,
        )?;
        validate_knots(
            &spec.v_knots,
            &spec.v_mults,
            spec.v_degree,
            spec.v_periodic,
            n_v,
        )?;

        let weights = spec.weights.clone().unwrap_or_else(|| vec![1.0; n_u * n_v]);
        validate_weights(&weights, n_u * n_v)?;

        Ok(Self {
            control_points: spec.poles.iter().flatten().copied().collect(),
            weights,
            n_u,
            n_v,
            u_axis: KnotAxis::new(
                &spec.u_knots,
                &spec.u_mults,
                spec.u_degree,
                spec.u_periodic,
                n_u,
            ),
            v_axis: KnotAxis::new(
                &spec.v_knots,
                &spec.v_mults,
                spec.v_degree,
                spec.v_periodic,
                n_v,
            ),
            u_degree: spec.u_degree,
            v_degree: spec.v_degree,
        })
    }

    /// Bilinear patch through four corners, `p00` at `(0,0)` and `p11` at `(1,1)`.
    pub fn bilinear(p00: Point3, p10: Point3, p01: Point3, p11: Point3) -> Result<Self> {
        Self::from_spec(&SurfaceSpec {
            poles: vec![vec![p00, p10], vec![p01, p11]],
            weights: None,
            v_knots: vec![0.0, 1.0],
            v_mults: vec![2, 2],
            u_knots: vec![0.0, 1.0],
            u_mults: vec![2, 2],
            v_periodic: false,
            u_periodic: false,
            u_degree: 1,
            v_degree: 1,
        })
    }

    /// Number of control points along U and V.
    pub fn grid_size(&self) -> (usize, usize) {
        (self.n_u, self.n_v)
    }

    /// Degrees `(u, v)`.
    pub fn degrees(&self) -> (usize, usize) {
        (self.u_degree, self.v_degree)
    }

    /// Control point at grid position `(u, v)`.
    pub fn pole(&self, u: usize, v: usize) -> Point3 {
        self.control_points[v * self.n_u + u]
    }

    /// Weight at grid position `(u, v)`.
    pub fn weight(&self, u: usize, v: usize) -> f64 {
        self.weights[v * self.n_u + u]
    }

    /// Parameter domain `((u_min, u_max), (v_min, v_max))`.
    pub fn parameter_domain(&self) -> ((f64, f64), (f64, f64)) {
        (self.u_axis.domain(), self.v_axis.domain())
    }

    /// Evaluate the surface at `(u, v)`.
    pub fn eval(&self, u: f64, v: f64) -> Point3 {
        let bu = self.u_axis.basis(u);
        let bv = self.v_axis.basis(v);
        let mut hx = 0.0;
        let mut hy = 0.0;
        let mut hz = 0.0;
        let mut hw = 0.0;
        for &(j, nv) in &bv {
            for &(i, nu) in &bu {
                let idx = j * self.n_u + i;
                let w = nu * nv * self.weights[idx];
                let p = &self.control_points[idx];
                hx += w * p.x;
                hy += w * p.y;
                hz += w * p.z;
                hw += w;
            }
        }
        if hw.abs() < 1e-30 {
            Point3::origin()
        } else {
            Point3::new(hx / hw, hy / hw, hz / hw)
        }
    }

    /// Partial derivative with respect to u (finite differences).
    pub fn deriv_u(&self, u: f64, v: f64) -> Vec3 {
        let (lo, hi) = self.u_axis.domain();
        let h = (hi - lo) * 1e-7;
        let u0 = (u - h).max(lo);
        let u1 = (u + h).min(hi);
        (self.eval(u1, v) - self.eval(u0, v)) / (u1 - u0)
    }

    /// Partial derivative with respect to v (finite differences).
    pub fn deriv_v(&self, u: f64, v: f64) -> Vec3 {
        let (lo, hi) = self.v_axis.domain();
        let h = (hi - lo) * 1e-7;
        let v0 = (v - h).max(lo);
        let v1 = (v + h).min(hi);
        (self.eval(u, v1) - self.eval(u, v0)) / (v1 - v0)
    }

    /// Apply an affine transform to the control points.
    pub fn transform(&self, t: &Transform) -> Self {
        Self {
            control_points: self.control_points.iter().map(|p| t.apply_point(p)).collect(),
            ..self.clone()
        }
    }
}
