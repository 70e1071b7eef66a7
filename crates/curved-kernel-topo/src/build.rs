//! Face, shell and solid construction.

use curved_kernel_geom::{Plane, Surface};
use curved_kernel_math::{Aabb3, Point2, Point3, Tolerance, Vec3};

use crate::{Face, Result, Shell, Solid, TopoError, Wire};

/// Samples per edge used for planarity and closure checks.
const EDGE_SAMPLES: usize = 16;

/// Build a planar face bounded by a closed wire.
///
/// # Errors
/// [`TopoError::EmptyWire`] for a wire without edges, [`TopoError::NotClosed`]
/// if the edges do not form a loop, [`TopoError::NotPlanar`] if the loop
/// does not lie in a plane.
pub fn make_face(wire: &Wire, tol: &Tolerance) -> Result<Face> {
    if wire.edges.is_empty() {
        return Err(TopoError::EmptyWire);
    }
    let flags = wire.orientation(tol).ok_or(TopoError::NotClosed)?;
    if !wire.is_closed(tol) {
        return Err(TopoError::NotClosed);
    }

    // Boundary polygon in loop order, without repeated joints.
    let mut polygon = Vec::new();
    for (edge, &reversed) in wire.edges.iter().zip(&flags) {
        let mut pts = edge.sample(EDGE_SAMPLES);
        if reversed {
            pts.reverse();
        }
        pts.pop();
        polygon.extend(pts);
    }

    let normal = newell_normal(&polygon).ok_or(TopoError::NotPlanar(0.0))?;
    let centroid = polygon
        .iter()
        .fold(Vec3::zeros(), |acc, p| acc + p.coords)
        / polygon.len() as f64;
    let plane = Plane::from_normal(Point3::from(centroid), normal);

    let size = wire.bounding_box().lengths().norm().max(1.0);
    let deviation = polygon
        .iter()
        .map(|p| plane.signed_distance(p).abs())
        .fold(0.0, f64::max);
    if deviation > tol.linear * size {
        return Err(TopoError::NotPlanar(deviation));
    }

    Ok(Face::with_boundary(Box::new(plane), wire.clone()))
}

/// Compute a polygon normal using Newell's method. `None` if degenerate.
fn newell_normal(verts: &[Point3]) -> Option<Vec3> {
    if verts.len() < 3 {
        return None;
    }
    let mut n = Vec3::zeros();
    for i in 0..verts.len() {
        let current = verts[i];
        let next = verts[(i + 1) % verts.len()];
        n.x += (current.y - next.y) * (current.z + next.z);
        n.y += (current.z - next.z) * (current.x + next.x);
        n.z += (current.x - next.x) * (current.y + next.y);
    }
    if n.norm() < 1e-12 {
        None
    } else {
        Some(n.normalize())
    }
}

/// Collect faces into a shell.
///
/// # Errors
/// [`TopoError::EmptyShell`] if `faces` is empty.
pub fn make_shell(faces: Vec<Face>) -> Result<Shell> {
    if faces.is_empty() {
        return Err(TopoError::EmptyShell);
    }
    Ok(Shell { faces })
}

/// Turn a shell into a solid.
///
/// The shell must be closed: every face boundary has to lie on another face
/// boundary within tolerance. Boundaries that collapse to a point are ignored.
///
/// # Errors
/// [`TopoError::EmptyShell`] for a shell without faces and
/// [`TopoError::OpenShell`] with the number of unmatched boundaries.
pub fn make_solid(shell: Shell, tol: &Tolerance) -> Result<Solid> {
    if shell.faces.is_empty() {
        return Err(TopoError::EmptyShell);
    }

    let free = free_boundaries(&shell, tol);
    if free > 0 {
        return Err(TopoError::OpenShell(free));
    }
    Ok(Solid { shell })
}

/// Number of face boundaries not lying on another boundary of the shell.
fn free_boundaries(shell: &Shell, tol: &Tolerance) -> usize {
    let boundaries: Vec<Boundary<'_>> = shell
        .faces
        .iter()
        .flat_map(Boundary::of_face)
        .collect();

    let mut extent = Aabb3::empty();
    for b in &boundaries {
        extent.include_box(&b.bbox);
    }
    let eps = tol.linear.max(1e-6) * extent.lengths().norm().max(1.0);

    let live: Vec<&Boundary<'_>> = boundaries.iter().filter(|b| !b.is_point(eps)).collect();
    live.iter()
        .enumerate()
        .filter(|(i, b)| {
            !live
                .iter()
                .enumerate()
                .any(|(j, other)| *i != j && b.lies_on(other, eps))
        })
        .count()
}

/// One boundary curve of a face, as a parametric function with samples.
struct Boundary<'a> {
    eval: Box<dyn Fn(f64) -> Point3 + 'a>,
    range: (f64, f64),
    samples: Vec<Point3>,
    bbox: Aabb3,
}

impl<'a> Boundary<'a> {
    fn new(eval: Box<dyn Fn(f64) -> Point3 + 'a>, range: (f64, f64)) -> Self {
        let samples: Vec<Point3> = (0..=EDGE_SAMPLES)
            .map(|i| eval(range.0 + (range.1 - range.0) * i as f64 / EDGE_SAMPLES as f64))
            .collect();
        let mut bbox = Aabb3::empty();
        samples.iter().for_each(|p| bbox.include_point(p));
        Self {
            eval,
            range,
            samples,
            bbox,
        }
    }

    /// Boundaries of a face: its wire edges, or the four iso-curves at the
    /// ends of its parameter domain.
    fn of_face(face: &'a Face) -> Vec<Boundary<'a>> {
        if let Some(wire) = &face.outer {
            return wire
                .edges
                .iter()
                .map(|e| Boundary::new(Box::new(move |t| e.curve.evaluate(t)), (e.first, e.last)))
                .collect();
        }
        let surface: &'a dyn Surface = face.surface.as_ref();
        let ((u0, u1), (v0, v1)) = surface.domain();
        let at_v = |v: f64| -> Box<dyn Fn(f64) -> Point3 + 'a> {
            Box::new(move |u| surface.evaluate(Point2::new(u, v)))
        };
        let at_u = |u: f64| -> Box<dyn Fn(f64) -> Point3 + 'a> {
            Box::new(move |v| surface.evaluate(Point2::new(u, v)))
        };
        vec![
            Boundary::new(at_v(v0), (u0, u1)),
            Boundary::new(at_v(v1), (u0, u1)),
            Boundary::new(at_u(u0), (v0, v1)),
            Boundary::new(at_u(u1), (v0, v1)),
        ]
    }

    fn is_point(&self, eps: f64) -> bool {
        let l = self.bbox.lengths();
        l.x <= eps && l.y <= eps && l.z <= eps
    }

    /// True if every sample of `self` is within `eps` of `other`.
    fn lies_on(&self, other: &Boundary<'_>, eps: f64) -> bool {
        let grown = Aabb3::new(
            other.bbox.min - Vec3::repeat(eps),
            other.bbox.max + Vec3::repeat(eps),
        );
        if !self.bbox.overlaps(&grown) {
            return false;
        }
        self.samples
            .iter()
            .all(|p| other.distance_to(p) <= eps)
    }

    /// Distance from `p` to the curve: coarse samples, then golden-section refinement.
    fn distance_to(&self, p: &Point3) -> f64 {
        let (t0, t1) = self.range;
        let n = 4 * EDGE_SAMPLES;
        let step = (t1 - t0) / n as f64;
        let dist2 = |t: f64| ((self.eval)(t) - p).norm_squared();

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

        let (lo_bound, hi_bound) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        let mut lo = (best - step.abs()).max(lo_bound);
        let mut hi = (best + step.abs()).min(hi_bound);
        let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
        for _ in 0..60 {
            let a = hi - ratio * (hi - lo);
            let b = lo + ratio * (hi - lo);
            if dist2(a) < dist2(b) {
                hi = b;
            } else {
                lo = a;
            }
        }
        best_d.min(dist2(0.5 * (lo + hi))).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::square_wire;
    use crate::{make_wire, Edge};
    use curved_kernel_geom::{Circle3d, RuledSurface};
    use curved_kernel_nurbs::BSplineSurface;
    use std::f64::consts::PI;

    fn side_faces(bottom: &Wire, top: &Wire) -> Vec<Face> {
        bottom
            .edges
            .iter()
            .zip(&top.edges)
            .map(|(a, b)| {
                let s = BSplineSurface::bilinear(
                    a.start_point(),
                    a.end_point(),
                    b.start_point(),
                    b.end_point(),
                )
                .unwrap();
                Face::new(Box::new(s))
            })
            .collect()
    }

    #[test]
    fn test_make_face_square() {
        let tol = Tolerance::DEFAULT;
        let face = make_face(&square_wire(2.0, 3.0), &tol).unwrap();
        let n = face.surface.normal(Point2::origin());
        assert!((n.as_ref().z.abs() - 1.0).abs() < 1e-12);
        let bb = face.bounding_box();
        assert!((bb.max - Point3::new(3.0, 3.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_make_face_rejects_open_wire() {
        let tol = Tolerance::DEFAULT;
        let mut wire = square_wire(0.0, 1.0);
        wire.edges.pop();
        assert!(matches!(make_face(&wire, &tol), Err(TopoError::NotClosed)));
        assert!(matches!(make_face(&Wire::default(), &tol), Err(TopoError::EmptyWire)));
    }

    #[test]
    fn test_make_face_rejects_non_planar() {
        let tol = Tolerance::DEFAULT;
        let wire = make_wire(vec![
            Edge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
            Edge::line(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)),
            Edge::line(Point3::new(1.0, 1.0, 1.0), Point3::new(0.0, 1.0, 0.0)),
            Edge::line(Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 0.0, 0.0)),
        ]);
        assert!(matches!(make_face(&wire, &tol), Err(TopoError::NotPlanar(_))));
    }

    #[test]
    fn test_make_shell_empty() {
        assert_eq!(make_shell(Vec::new()).unwrap_err(), TopoError::EmptyShell);
    }

    #[test]
    fn test_closed_box_makes_solid() {
        let tol = Tolerance::DEFAULT;
        let bottom = square_wire(0.0, 2.0);
        let top = square_wire(5.0, 2.0);
        let mut faces = side_faces(&bottom, &top);
        faces.push(make_face(&bottom, &tol).unwrap());
        faces.push(make_face(&top, &tol).unwrap());
        let solid = make_solid(make_shell(faces).unwrap(), &tol).unwrap();
        assert_eq!(solid.shell.faces.len(), 6);
    }

    #[test]
    fn test_open_tube_is_not_solid() {
        let tol = Tolerance::DEFAULT;
        let faces = side_faces(&square_wire(0.0, 2.0), &square_wire(5.0, 2.0));
        let err = make_solid(make_shell(faces).unwrap(), &tol).unwrap_err();
        // Top and bottom edge of each side stay free.
        assert_eq!(err, TopoError::OpenShell(8));
    }

    #[test]
    fn test_cylinder_with_caps_makes_solid() {
        let tol = Tolerance::DEFAULT;
        let circle = |z: f64| {
            Edge::new(Box::new(Circle3d::new(Point3::new(0.0, 0.0, z), 1.5)), 0.0, 2.0 * PI)
        };
        let (bottom, top) = (circle(0.0), circle(4.0));
        let side = RuledSurface::new(
            bottom.curve.clone(),
            (0.0, 2.0 * PI),
            top.curve.clone(),
            (0.0, 2.0 * PI),
        );
        let faces = vec![
            Face::new(Box::new(side)),
            make_face(&make_wire(vec![bottom]), &tol).unwrap(),
            make_face(&make_wire(vec![top]), &tol).unwrap(),
        ];
        assert!(make_solid(make_shell(faces).unwrap(), &tol).is_ok());
    }
}
