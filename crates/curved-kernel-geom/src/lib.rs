#![warn(missing_docs)]

//! Surface and curve types for the curved-shapes kernel.
//!
//! Provides trait-based abstractions for parametric surfaces and curves,
//! with the concrete types the rib interpolation needs: planes, lines,
//! circles, B-spline curves and surfaces, and ruled surfaces between two
//! trimmed curves.
//!
//! Curves answer the queries the extent calculator relies on: plane
//! intersection of the untrimmed curve, point projection to a parameter,
//! and conversion to a B-spline.

use std::f64::consts::PI;

use curved_kernel_math::{Aabb3, Dir3, Point2, Point3, Transform, Vec3};
use curved_kernel_nurbs::{BSplineCurve, BSplineSurface, NurbsError};

/// Two parameters closer than this are the same root.
const ROOT_RESOLUTION: f64 = 1e-9;

// =============================================================================
// Surface types
// =============================================================================

/// Parametric surface `S(u, v)`.
pub trait Surface: Send + Sync + std::fmt::Debug {
    /// Point at `(u, v)`.
    fn evaluate(&self, uv: Point2) -> Point3;

    /// Unit normal, `d_du × d_dv`; +Z where that vanishes.
    fn normal(&self, uv: Point2) -> Dir3 {
        let n = self.d_du(uv).cross(&self.d_dv(uv));
        if n.norm() < 1e-12 {
            Dir3::new_normalize(Vec3::z())
        } else {
            Dir3::new_normalize(n)
        }
    }

    /// First derivative along u.
    fn d_du(&self, uv: Point2) -> Vec3;

    /// First derivative along v.
    fn d_dv(&self, uv: Point2) -> Vec3;

    /// Parameter domain as `((u_min, u_max), (v_min, v_max))`.
    fn domain(&self) -> ((f64, f64), (f64, f64));

    /// Clone this surface into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Surface>;

    /// Image of the surface under `t`.
    fn transform(&self, t: &Transform) -> Box<dyn Surface>;
}

impl Clone for Box<dyn Surface> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// =============================================================================
// Plane
// =============================================================================

/// Unbounded plane with an orthonormal in-plane frame.
///
/// `P(u, v) = origin + u * x_dir + v * y_dir`. The extent calculator cuts
/// hull curves with these.
#[derive(Debug, Clone)]
pub struct Plane {
    /// Point at `(0, 0)`.
    pub origin: Point3,
    /// u axis.
    pub x_dir: Dir3,
    /// v axis.
    pub y_dir: Dir3,
    /// `x_dir × y_dir`.
    pub normal_dir: Dir3,
}

impl Plane {
    /// Plane through `origin` spanned by two orthogonal, possibly
    /// unnormalized, vectors.
    pub fn new(origin: Point3, x_dir: Vec3, y_dir: Vec3) -> Self {
        Self {
            origin,
            x_dir: Dir3::new_normalize(x_dir),
            y_dir: Dir3::new_normalize(y_dir),
            normal_dir: Dir3::new_normalize(x_dir.cross(&y_dir)),
        }
    }

    /// Plane through `origin` with the given normal and any in-plane frame.
    pub fn from_normal(origin: Point3, normal: Vec3) -> Self {
        let normal_dir = Dir3::new_normalize(normal);
        let (x_dir, y_dir) = perpendicular_frame(&normal_dir);
        Self {
            origin,
            x_dir,
            y_dir,
            normal_dir,
        }
    }

    /// Distance of `p` from the plane, positive on the normal side.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(self.normal_dir.as_ref())
    }
}

/// Two unit vectors completing `n` to a right-handed frame.
fn perpendicular_frame(n: &Dir3) -> (Dir3, Dir3) {
    let seed = if n.as_ref().x.abs() < 0.9 {
        Vec3::x()
    } else {
        Vec3::y()
    };
    let x = Dir3::new_normalize(seed.cross(n.as_ref()));
    let y = Dir3::new_normalize(n.as_ref().cross(x.as_ref()));
    (x, y)
}

impl Surface for Plane {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.origin + uv.x * self.x_dir.as_ref() + uv.y * self.y_dir.as_ref()
    }

    fn normal(&self, _uv: Point2) -> Dir3 {
        self.normal_dir
    }

    fn d_du(&self, _uv: Point2) -> Vec3 {
        *self.x_dir.as_ref()
    }

    fn d_dv(&self, _uv: Point2) -> Vec3 {
        *self.y_dir.as_ref()
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((-1e10, 1e10), (-1e10, 1e10))
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        let new_origin = t.apply_point(&self.origin);
        let new_x = t.apply_vec(self.x_dir.as_ref());
        let new_y = t.apply_vec(self.y_dir.as_ref());
        Box::new(Plane::new(new_origin, new_x, new_y))
    }
}

// =============================================================================
// BSplineSurface
// =============================================================================

impl Surface for BSplineSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        self.eval(uv.x, uv.y)
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        self.deriv_u(uv.x, uv.y)
    }

    fn d_dv(&self, uv: Point2) -> Vec3 {
        self.deriv_v(uv.x, uv.y)
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        self.parameter_domain()
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        Box::new(BSplineSurface::transform(self, t))
    }
}

// =============================================================================
// RuledSurface
// =============================================================================

/// A ruled surface joining two trimmed curves with straight lines.
///
/// Parameterization on `[0, 1] x [0, 1]`:
/// `P(u, v) = (1 - v) * A(a(u)) + v * B(b(u))`, where `a` and `b` map `u`
/// linearly onto each curve's trim range.
#[derive(Debug, Clone)]
pub struct RuledSurface {
    /// Curve at `v = 0`.
    pub first: Box<dyn Curve3d>,
    /// Trim range of `first`.
    pub first_range: (f64, f64),
    /// Curve at `v = 1`.
    pub second: Box<dyn Curve3d>,
    /// Trim range of `second`.
    pub second_range: (f64, f64),
}

impl RuledSurface {
    /// Create a ruled surface between two trimmed curves.
    pub fn new(
        first: Box<dyn Curve3d>,
        first_range: (f64, f64),
        second: Box<dyn Curve3d>,
        second_range: (f64, f64),
    ) -> Self {
        Self {
            first,
            first_range,
            second,
            second_range,
        }
    }

    fn first_at(&self, u: f64) -> Point3 {
        let (a, b) = self.first_range;
        self.first.evaluate(a + (b - a) * u)
    }

    fn second_at(&self, u: f64) -> Point3 {
        let (a, b) = self.second_range;
        self.second.evaluate(a + (b - a) * u)
    }
}

impl Surface for RuledSurface {
    fn evaluate(&self, uv: Point2) -> Point3 {
        let a = self.first_at(uv.x);
        let b = self.second_at(uv.x);
        a + (b - a) * uv.y
    }

    fn d_du(&self, uv: Point2) -> Vec3 {
        let (a0, a1) = self.first_range;
        let (b0, b1) = self.second_range;
        let ta = self.first.tangent(a0 + (a1 - a0) * uv.x) * (a1 - a0);
        let tb = self.second.tangent(b0 + (b1 - b0) * uv.x) * (b1 - b0);
        ta * (1.0 - uv.y) + tb * uv.y
    }

    fn d_dv(&self, uv: Point2) -> Vec3 {
        self.second_at(uv.x) - self.first_at(uv.x)
    }

    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((0.0, 1.0), (0.0, 1.0))
    }

    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn transform(&self, t: &Transform) -> Box<dyn Surface> {
        let (first, first_range) = transform_trimmed(self.first.as_ref(), self.first_range, t);
        let (second, second_range) =
            transform_trimmed(self.second.as_ref(), self.second_range, t);
        Box::new(RuledSurface::new(first, first_range, second, second_range))
    }
}

/// Transform a trimmed curve, converting it to a B-spline when its kind
/// cannot represent the image.
///
/// The returned range addresses the same points as the input range.
pub fn transform_trimmed(
    curve: &dyn Curve3d,
    range: (f64, f64),
    t: &Transform,
) -> (Box<dyn Curve3d>, (f64, f64)) {
    if let Some(image) = curve.transform(t) {
        return (image, range);
    }
    match curve.to_bspline(range.0, range.1) {
        Ok(bs) => {
            let bs = bs.transform(t);
            let domain = bs.parameter_domain();
            (Box::new(bs), domain)
        }
        // Degenerate trim: keep the samples of the curve at its end points.
        Err(_) => {
            let a = t.apply_point(&curve.evaluate(range.0));
            let b = t.apply_point(&curve.evaluate(range.1));
            (Box::new(Line3d::from_points(a, b)), (0.0, 1.0))
        }
    }
}

// =============================================================================
// Curve types
// =============================================================================

/// A parametric curve in 3D space.
///
/// Curves are untrimmed: an edge pairs one with a `[first, last]` range.
pub trait Curve3d: Send + Sync + std::fmt::Debug {
    /// Point at `t`.
    fn evaluate(&self, t: f64) -> Point3;

    /// First derivative at `t`.
    fn tangent(&self, t: f64) -> Vec3;

    /// Natural parameter range.
    fn domain(&self) -> (f64, f64);

    /// Clone into a boxed trait object.
    fn clone_box(&self) -> Box<dyn Curve3d>;

    /// Period of a closed periodic curve.
    fn period(&self) -> Option<f64> {
        None
    }

    /// Intersection points of the whole (untrimmed) curve with a plane.
    ///
    /// Curves without a closed-form solution sample the signed distance
    /// at `samples` parameters and refine each sign change.
    fn intersect_plane(&self, plane: &Plane, samples: usize) -> Vec<Point3>;

    /// Parameter of the curve point closest to `p`.
    fn parameter_of(&self, p: &Point3) -> f64;

    /// B-spline representation of the curve restricted to `[first, last]`.
    ///
    /// The B-spline keeps the parameter range `[first, last]`.
    fn to_bspline(&self, first: f64, last: f64) -> Result<BSplineCurve, NurbsError>;

    /// Apply an affine transform.
    ///
    /// Returns `None` when the image is not a curve of the same kind, such
    /// as a circle under non-uniform scale. Use [`transform_trimmed`] for a
    /// conversion that always succeeds.
    fn transform(&self, t: &Transform) -> Option<Box<dyn Curve3d>>;

    /// Suggested number of segments for sampling.
    ///
    /// Default returns 32.
    fn suggested_segments(&self) -> usize {
        32
    }

    /// Bounding box of the curve restricted to `[first, last]`.
    fn bounding_box(&self, first: f64, last: f64) -> Aabb3 {
        let n = self.suggested_segments() * 8;
        let mut bb = Aabb3::empty();
        for i in 0..=n {
            bb.include_point(&self.evaluate(first + (last - first) * i as f64 / n as f64));
        }
        bb
    }
}

impl Clone for Box<dyn Curve3d> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// =============================================================================
// Line3d
// =============================================================================

/// An infinite 3D line defined by origin and direction.
///
/// Parameterization: `P(t) = origin + t * direction`
#[derive(Debug, Clone)]
pub struct Line3d {
    /// Point at `t = 0`.
    pub origin: Point3,
    /// Direction (not necessarily unit length; magnitude determines speed).
    pub direction: Vec3,
}

impl Line3d {
    /// Line through `start` (t = 0) and `end` (t = 1).
    pub fn from_points(start: Point3, end: Point3) -> Self {
        Self {
            origin: start,
            direction: end - start,
        }
    }
}

impl Curve3d for Line3d {
    fn evaluate(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }

    fn tangent(&self, _t: f64) -> Vec3 {
        self.direction
    }

    fn domain(&self) -> (f64, f64) {
        (-1e10, 1e10)
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }

    fn intersect_plane(&self, plane: &Plane, _samples: usize) -> Vec<Point3> {
        let n = plane.normal_dir.as_ref();
        let denom = self.direction.dot(n);
        // Parallel or lying in the plane: no isolated crossing.
        if denom.abs() < 1e-14 {
            return Vec::new();
        }
        let t = (plane.origin - self.origin).dot(n) / denom;
        vec![self.evaluate(t)]
    }

    fn parameter_of(&self, p: &Point3) -> f64 {
        let len2 = self.direction.norm_squared();
        if len2 < 1e-30 {
            return 0.0;
        }
        (p - self.origin).dot(&self.direction) / len2
    }

    fn to_bspline(&self, first: f64, last: f64) -> Result<BSplineCurve, NurbsError> {
        BSplineCurve::segment(self.evaluate(first), self.evaluate(last), first, last)
    }

    fn transform(&self, t: &Transform) -> Option<Box<dyn Curve3d>> {
        Some(Box::new(Line3d {
            origin: t.apply_point(&self.origin),
            direction: t.apply_vec(&self.direction),
        }))
    }

    fn suggested_segments(&self) -> usize {
        1
    }

    fn bounding_box(&self, first: f64, last: f64) -> Aabb3 {
        let mut bb = Aabb3::empty();
        bb.include_point(&self.evaluate(first));
        bb.include_point(&self.evaluate(last));
        bb
    }
}

// =============================================================================
// Circle3d
// =============================================================================

/// Full circle, `P(t) = center + radius * (cos t * x_dir + sin t * y_dir)`
/// for `t` in `[0, 2π)`.
///
/// Arcs are circles trimmed to a sub-range, which may extend past `2π`.
#[derive(Debug, Clone)]
pub struct Circle3d {
    /// Center.
    pub center: Point3,
    /// Radius.
    pub radius: f64,
    /// Direction of `P(0)` from the center.
    pub x_dir: Dir3,
    /// Direction of `P(π/2)` from the center.
    pub y_dir: Dir3,
    /// `x_dir × y_dir`.
    pub normal: Dir3,
}

impl Circle3d {
    /// Circle parallel to XY, starting on +X.
    pub fn new(center: Point3, radius: f64) -> Self {
        Self {
            center,
            radius,
            x_dir: Vec3::x_axis(),
            y_dir: Vec3::y_axis(),
            normal: Vec3::z_axis(),
        }
    }

    /// Circle in the plane through `center` perpendicular to `normal`.
    pub fn with_normal(center: Point3, radius: f64, normal: Vec3) -> Self {
        let normal = Dir3::new_normalize(normal);
        let (x_dir, y_dir) = perpendicular_frame(&normal);
        Self {
            center,
            radius,
            x_dir,
            y_dir,
            normal,
        }
    }

    fn angle_of(&self, p: &Point3) -> f64 {
        let d = p - self.center;
        let a = d.dot(self.y_dir.as_ref()).atan2(d.dot(self.x_dir.as_ref()));
        if a < 0.0 {
            a + 2.0 * PI
        } else {
            a
        }
    }
}

impl Curve3d for Circle3d {
    fn evaluate(&self, t: f64) -> Point3 {
        let (sin_t, cos_t) = t.sin_cos();
        self.center + self.radius * (cos_t * self.x_dir.as_ref() + sin_t * self.y_dir.as_ref())
    }

    fn tangent(&self, t: f64) -> Vec3 {
        let (sin_t, cos_t) = t.sin_cos();
        self.radius * (-sin_t * self.x_dir.as_ref() + cos_t * self.y_dir.as_ref())
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 2.0 * PI)
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }

    fn period(&self) -> Option<f64> {
        Some(2.0 * PI)
    }

    fn intersect_plane(&self, plane: &Plane, _samples: usize) -> Vec<Point3> {
        // d(t) = offset + r * (a cos t + b sin t)
        let n = plane.normal_dir.as_ref();
        let offset = plane.signed_distance(&self.center);
        let a = self.radius * self.x_dir.as_ref().dot(n);
        let b = self.radius * self.y_dir.as_ref().dot(n);
        let amplitude = a.hypot(b);
        if amplitude < 1e-14 || offset.abs() > amplitude {
            return Vec::new();
        }
        let phase = b.atan2(a);
        let spread = (-offset / amplitude).clamp(-1.0, 1.0).acos();
        let t0 = phase + spread;
        let t1 = phase - spread;
        let mut points = vec![self.evaluate(t0)];
        if spread > ROOT_RESOLUTION && PI - spread > ROOT_RESOLUTION {
            points.push(self.evaluate(t1));
        }
        points
    }

    fn parameter_of(&self, p: &Point3) -> f64 {
        self.angle_of(p)
    }

    fn to_bspline(&self, first: f64, last: f64) -> Result<BSplineCurve, NurbsError> {
        BSplineCurve::arc(
            self.center,
            *self.x_dir.as_ref(),
            *self.y_dir.as_ref(),
            self.radius,
            first,
            last,
        )
    }

    fn transform(&self, t: &Transform) -> Option<Box<dyn Curve3d>> {
        let x = t.apply_vec(&(self.radius * self.x_dir.as_ref()));
        let y = t.apply_vec(&(self.radius * self.y_dir.as_ref()));
        let (rx, ry) = (x.norm(), y.norm());
        if rx < 1e-14 || (rx - ry).abs() > 1e-12 * rx || x.dot(&y).abs() > 1e-12 * rx * ry {
            return None;
        }
        Some(Box::new(Circle3d {
            center: t.apply_point(&self.center),
            radius: rx,
            x_dir: Dir3::new_normalize(x),
            y_dir: Dir3::new_normalize(y),
            normal: Dir3::new_normalize(x.cross(&y)),
        }))
    }

    fn bounding_box(&self, first: f64, last: f64) -> Aabb3 {
        let mut bb = Aabb3::empty();
        bb.include_point(&self.evaluate(first));
        bb.include_point(&self.evaluate(last));
        // Axis extremes at angles where d/dt of the coordinate vanishes.
        for k in 0..3 {
            let phase = self.y_dir.as_ref()[k].atan2(self.x_dir.as_ref()[k]);
            for base in [phase, phase + PI] {
                let mut t = base;
                while t < first {
                    t += 2.0 * PI;
                }
                while t - 2.0 * PI >= first {
                    t -= 2.0 * PI;
                }
                if t <= last {
                    bb.include_point(&self.evaluate(t));
                }
            }
        }
        bb
    }
}

// =============================================================================
// BSplineCurve
// =============================================================================

impl Curve3d for BSplineCurve {
    fn evaluate(&self, t: f64) -> Point3 {
        self.eval(t)
    }

    fn tangent(&self, t: f64) -> Vec3 {
        BSplineCurve::tangent(self, t)
    }

    fn domain(&self) -> (f64, f64) {
        self.parameter_domain()
    }

    fn clone_box(&self) -> Box<dyn Curve3d> {
        Box::new(self.clone())
    }

    fn period(&self) -> Option<f64> {
        if self.is_periodic() {
            let (a, b) = self.parameter_domain();
            Some(b - a)
        } else {
            None
        }
    }

    fn intersect_plane(&self, plane: &Plane, samples: usize) -> Vec<Point3> {
        let spans = self.knots().len().saturating_sub(1).max(1);
        let n = samples.max(8 * spans).max(2);
        let (t0, t1) = self.parameter_domain();
        let dist = |t: f64| plane.signed_distance(&self.eval(t));

        let mut roots: Vec<f64> = Vec::new();
        let push = |t: f64, roots: &mut Vec<f64>| {
            if roots.last().map_or(true, |&r| (t - r).abs() > ROOT_RESOLUTION * (t1 - t0)) {
                roots.push(t);
            }
        };

        let param = |i: usize| t0 + (t1 - t0) * i as f64 / n as f64;
        let mut prev_t = t0;
        let mut prev_d = dist(t0);
        if prev_d.abs() < 1e-12 {
            push(t0, &mut roots);
        }
        // The end of a periodic curve repeats its start.
        let last = if self.is_periodic() { n - 1 } else { n };
        for i in 1..=last {
            let t = param(i);
            let d = dist(t);
            if d.abs() < 1e-12 {
                push(t, &mut roots);
            } else if prev_d.abs() >= 1e-12 && prev_d * d < 0.0 {
                push(bisect_root(&dist, prev_t, t, prev_d), &mut roots);
            }
            prev_t = t;
            prev_d = d;
        }
        if self.is_periodic() {
            let d = dist(t1);
            if prev_d.abs() >= 1e-12 && d.abs() >= 1e-12 && prev_d * d < 0.0 {
                push(bisect_root(&dist, prev_t, t1, prev_d), &mut roots);
            }
        }

        roots.into_iter().map(|t| self.eval(t)).collect()
    }

    fn parameter_of(&self, p: &Point3) -> f64 {
        let spans = self.knots().len().saturating_sub(1).max(1);
        let n = 32 * spans;
        let (t0, t1) = self.parameter_domain();
        let step = (t1 - t0) / n as f64;
        let dist2 = |t: f64| (self.eval(t) - p).norm_squared();

        let mut best = t0;
        let mut best_d = f64::INFINITY;
        for i in 0..=n {
            let t = t0 + step * i as f64;
            let d = dist2(t);
            if d < best_d {
                best = t;
                best_d = d;
            }
        }

        // Golden-section refinement on the bracketing samples.
        let mut lo = (best - step).max(t0);
        let mut hi = (best + step).min(t1);
        let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
        for _ in 0..80 {
            let a = hi - ratio * (hi - lo);
            let b = lo + ratio * (hi - lo);
            if dist2(a) < dist2(b) {
                hi = b;
            } else {
                lo = a;
            }
        }
        let refined = 0.5 * (lo + hi);
        if dist2(refined) <= best_d {
            refined
        } else {
            best
        }
    }

    fn to_bspline(&self, first: f64, last: f64) -> Result<BSplineCurve, NurbsError> {
        self.trimmed(first, last)
    }

    fn transform(&self, t: &Transform) -> Option<Box<dyn Curve3d>> {
        Some(Box::new(BSplineCurve::transform(self, t)))
    }

    fn suggested_segments(&self) -> usize {
        16 * self.knots().len().saturating_sub(1).max(1)
    }
}

/// Bisection for a root of `f` in `[a, b]`, given `f(a) = fa` with a sign change.
fn bisect_root(f: &dyn Fn(f64) -> f64, mut a: f64, mut b: f64, mut fa: f64) -> f64 {
    for _ in 0..100 {
        let m = 0.5 * (a + b);
        let fm = f(m);
        if fm == 0.0 || (b - a) < 1e-15 {
            return m;
        }
        if fa * fm < 0.0 {
            b = m;
        } else {
            a = m;
            fa = fm;
        }
    }
    0.5 * (a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_evaluate() {
        let plane = Plane::new(Point3::new(0.0, 0.0, 1.0), Vec3::y(), Vec3::z());
        let pt = plane.evaluate(Point2::new(3.0, 4.0));
        assert!((pt - Point3::new(0.0, 3.0, 5.0)).norm() < 1e-12);
        assert!((plane.normal_dir.as_ref().x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_plane_from_normal() {
        let p = Plane::from_normal(Point3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, 3.0));
        assert!((p.normal(Point2::origin()).as_ref().z - 1.0).abs() < 1e-12);
        assert!((p.signed_distance(&Point3::new(5.0, 5.0, 7.0)) - 5.0).abs() < 1e-12);
        assert!(p.x_dir.as_ref().dot(p.normal_dir.as_ref()).abs() < 1e-12);
    }

    #[test]
    fn test_plane_transform() {
        let plane = Plane::new(Point3::origin(), Vec3::x(), Vec3::y());
        let lifted = plane.transform(&Transform::translation(0.0, 0.0, 5.0));
        let pt = lifted.evaluate(Point2::new(1.0, 2.0));
        assert!((pt - Point3::new(1.0, 2.0, 5.0)).norm() < 1e-12);
    }

    #[test]
    fn test_line_plane_intersection_ignores_trim() {
        let line = Line3d::from_points(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 1.0));
        let plane = Plane::from_normal(Point3::new(0.0, 0.0, 5.0), Vec3::z());
        let hits = line.intersect_plane(&plane, 16);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].z - 5.0).abs() < 1e-12);
        assert!((line.parameter_of(&hits[0]) - 5.0).abs() < 1e-12);

        let parallel = Plane::from_normal(Point3::origin(), Vec3::x());
        assert!(line.intersect_plane(&parallel, 16).is_empty());
    }

    #[test]
    fn test_circle3d() {
        let circle = Circle3d::new(Point3::origin(), 5.0);
        assert!((circle.evaluate(0.0) - Point3::new(5.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((circle.evaluate(PI / 2.0) - Point3::new(0.0, 5.0, 0.0)).norm() < 1e-12);
        assert!((circle.parameter_of(&Point3::new(0.0, -5.0, 0.0)) - 1.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_circle_plane_intersection() {
        let circle = Circle3d::new(Point3::origin(), 2.0);
        let plane = Plane::from_normal(Point3::new(1.0, 0.0, 0.0), Vec3::x());
        let mut hits = circle.intersect_plane(&plane, 16);
        assert_eq!(hits.len(), 2);
        hits.sort_by(|a, b| a.y.total_cmp(&b.y));
        assert!((hits[0] - Point3::new(1.0, -(3.0_f64.sqrt()), 0.0)).norm() < 1e-12);
        assert!((hits[1] - Point3::new(1.0, 3.0_f64.sqrt(), 0.0)).norm() < 1e-12);

        let tangent = Plane::from_normal(Point3::new(2.0, 0.0, 0.0), Vec3::x());
        assert_eq!(circle.intersect_plane(&tangent, 16).len(), 1);

        let miss = Plane::from_normal(Point3::new(3.0, 0.0, 0.0), Vec3::x());
        assert!(circle.intersect_plane(&miss, 16).is_empty());
    }

    #[test]
    fn test_circle_arc_bounding_box() {
        let circle = Circle3d::new(Point3::origin(), 1.0);
        let bb = circle.bounding_box(0.0, PI / 2.0);
        assert!((bb.min - Point3::new(0.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((bb.max - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);

        let full = circle.bounding_box(0.0, 2.0 * PI);
        assert!((full.min - Point3::new(-1.0, -1.0, 0.0)).norm() < 1e-12);
        assert!((full.max - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_circle_transform_non_uniform() {
        let circle = Circle3d::new(Point3::origin(), 1.0);
        assert!(circle.transform(&Transform::translation(1.0, 2.0, 3.0)).is_some());
        let scale = Transform::scale(2.0, 1.0, 1.0);
        assert!(circle.transform(&scale).is_none());

        let (ellipse, range) = transform_trimmed(&circle, (0.0, 2.0 * PI), &scale);
        let p = ellipse.evaluate(range.0);
        assert!((p - Point3::new(2.0, 0.0, 0.0)).norm() < 1e-12);
        let bb = ellipse.bounding_box(range.0, range.1);
        assert!((bb.max.x - 2.0).abs() < 1e-9);
        assert!((bb.max.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_bspline_plane_intersection() {
        let circle = Circle3d::new(Point3::origin(), 3.0)
            .to_bspline(0.0, 2.0 * PI)
            .unwrap();
        let plane = Plane::from_normal(Point3::new(0.0, 1.5, 0.0), Vec3::y());
        let hits = circle.intersect_plane(&plane, 64);
        assert_eq!(hits.len(), 2);
        for h in &hits {
            assert!((h.y - 1.5).abs() < 1e-9);
            assert!(((h.x * h.x + h.y * h.y).sqrt() - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bspline_parameter_of() {
        let curve = BSplineCurve::clamped_uniform(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
                Point3::new(3.0, 2.0, 0.0),
                Point3::new(4.0, 0.0, 0.0),
            ],
            2,
        )
        .unwrap();
        let target = curve.eval(0.37);
        assert!((curve.parameter_of(&target) - 0.37).abs() < 1e-6);
    }

    #[test]
    fn test_ruled_surface() {
        let bottom = Line3d::from_points(Point3::origin(), Point3::new(2.0, 0.0, 0.0));
        let top = Line3d::from_points(Point3::new(0.0, 0.0, 4.0), Point3::new(2.0, 0.0, 4.0));
        let ruled = RuledSurface::new(Box::new(bottom), (0.0, 1.0), Box::new(top), (0.0, 1.0));
        let p = ruled.evaluate(Point2::new(0.5, 0.25));
        assert!((p - Point3::new(1.0, 0.0, 1.0)).norm() < 1e-12);
        let n = ruled.normal(Point2::new(0.5, 0.5));
        assert!((n.as_ref().y.abs() - 1.0).abs() < 1e-12);

        let moved = ruled.transform(&Transform::translation(0.0, 1.0, 0.0));
        assert!((moved.evaluate(Point2::new(0.0, 0.0)).y - 1.0).abs() < 1e-12);
    }
}
