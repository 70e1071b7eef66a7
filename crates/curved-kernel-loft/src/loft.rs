//! Ruled loft between wires.

use curved_kernel_geom::RuledSurface;
use curved_kernel_math::Tolerance;
use curved_kernel_topo::{Edge, Face, Shape, Shell, Wire};

use crate::LoftError;

/// Options for the loft operation.
#[derive(Debug, Clone, Default)]
pub struct LoftOptions {
    /// If true, connect the last profile back to the first (creates a tube).
    pub closed: bool,
    /// Tolerance used to chain the edges of each profile.
    pub tolerance: Tolerance,
}

/// Loft between wires to create a shell of ruled faces.
///
/// Edge `i` of each wire is joined to edge `i` of the next wire by one
/// [`RuledSurface`] face. Edges are followed in chain order, so a wire may
/// mix forward and reversed edges.
///
/// # Errors
///
/// Returns an error if:
/// * Less than 2 wires are provided
/// * Wires have different edge counts
/// * A wire is empty or its edges do not connect end to end
///
/// # Example
///
/// ```
/// use curved_kernel_loft::{loft, LoftOptions};
/// use curved_kernel_math::Point3;
/// use curved_kernel_topo::{make_wire, Edge};
///
/// let square = |z: f64| {
///     let p = |x: f64, y: f64| Point3::new(x, y, z);
///     make_wire(vec![
///         Edge::line(p(0.0, 0.0), p(1.0, 0.0)),
///         Edge::line(p(1.0, 0.0), p(1.0, 1.0)),
///         Edge::line(p(1.0, 1.0), p(0.0, 1.0)),
///         Edge::line(p(0.0, 1.0), p(0.0, 0.0)),
///     ])
/// };
///
/// let shell = loft(&[square(0.0), square(4.0)], &LoftOptions::default()).unwrap();
/// assert_eq!(shell.faces().len(), 4);
/// ```
pub fn loft(wires: &[Wire], options: &LoftOptions) -> Result<Shape, LoftError> {
    if wires.len() < 2 {
        return Err(LoftError::TooFewProfiles(wires.len()));
    }

    let n_segments = wires[0].edges.len();
    for wire in wires.iter().skip(1) {
        if wire.edges.len() != n_segments {
            return Err(LoftError::MismatchedSegmentCounts(
                n_segments,
                wire.edges.len(),
            ));
        }
    }

    let mut profiles: Vec<Vec<(&Edge, (f64, f64))>> = Vec::with_capacity(wires.len());
    for (i, wire) in wires.iter().enumerate() {
        if wire.edges.is_empty() {
            return Err(LoftError::InvalidProfile(i, "empty profile".into()));
        }
        let flags = wire
            .orientation(&options.tolerance)
            .ok_or_else(|| LoftError::InvalidProfile(i, "edges are not connected".into()))?;
        profiles.push(
            wire.edges
                .iter()
                .zip(flags)
                .map(|(e, reversed)| {
                    let range = if reversed {
                        (e.last, e.first)
                    } else {
                        (e.first, e.last)
                    };
                    (e, range)
                })
                .collect(),
        );
    }

    let n_profiles = profiles.len();
    let n_transitions = if options.closed {
        n_profiles
    } else {
        n_profiles - 1
    };

    let mut faces = Vec::with_capacity(n_transitions * n_segments);
    for profile_idx in 0..n_transitions {
        let lower = &profiles[profile_idx];
        let upper = &profiles[(profile_idx + 1) % n_profiles];
        for (&(a, a_range), &(b, b_range)) in lower.iter().zip(upper) {
            let surface = RuledSurface::new(a.curve.clone(), a_range, b.curve.clone(), b_range);
            faces.push(Face::new(Box::new(surface)));
        }
    }

    Ok(Shape::shell(Shell { faces }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curved_kernel_geom::Circle3d;
    use curved_kernel_math::{Point2, Point3};
    use curved_kernel_topo::{make_face, make_shell, make_solid, make_wire, ShapeType};
    use std::f64::consts::PI;

    fn create_rectangle_profile(origin: Point3, w: f64, h: f64) -> Wire {
        let p = |x: f64, y: f64| Point3::new(origin.x + x, origin.y + y, origin.z);
        make_wire(vec![
            Edge::line(p(0.0, 0.0), p(w, 0.0)),
            Edge::line(p(w, 0.0), p(w, h)),
            Edge::line(p(w, h), p(0.0, h)),
            Edge::line(p(0.0, h), p(0.0, 0.0)),
        ])
    }

    fn create_circle_profile(center: Point3, radius: f64) -> Wire {
        make_wire(vec![Edge::new(
            Box::new(Circle3d::new(center, radius)),
            0.0,
            2.0 * PI,
        )])
    }

    #[test]
    fn test_loft_two_rectangles() {
        let profile1 = create_rectangle_profile(Point3::origin(), 10.0, 5.0);
        let profile2 = create_rectangle_profile(Point3::new(0.0, 0.0, 20.0), 10.0, 5.0);

        let shape = loft(&[profile1, profile2], &LoftOptions::default()).unwrap();
        assert_eq!(shape.shape_type(), ShapeType::Shell);
        assert_eq!(shape.faces().len(), 4);

        let bb = shape.bounding_box();
        assert!((bb.min - Point3::origin()).norm() < 1e-9);
        assert!((bb.max - Point3::new(10.0, 5.0, 20.0)).norm() < 1e-9);
    }

    #[test]
    fn test_loft_face_passes_through_profiles() {
        let profile1 = create_rectangle_profile(Point3::origin(), 10.0, 10.0);
        let profile2 = create_rectangle_profile(Point3::new(2.5, 2.5, 10.0), 5.0, 5.0);
        let profile3 = create_rectangle_profile(Point3::new(0.0, 0.0, 20.0), 10.0, 10.0);

        let shape = loft(&[profile1, profile2, profile3], &LoftOptions::default()).unwrap();
        let faces = shape.faces();
        assert_eq!(faces.len(), 8);

        // First face of the second band starts on the middle profile.
        let p = faces[4].surface.evaluate(Point2::new(0.0, 0.0));
        assert!((p - Point3::new(2.5, 2.5, 10.0)).norm() < 1e-9);
        let q = faces[4].surface.evaluate(Point2::new(0.0, 1.0));
        assert!((q - Point3::new(0.0, 0.0, 20.0)).norm() < 1e-9);
    }

    #[test]
    fn test_loft_follows_reversed_edges() {
        let profile1 = create_rectangle_profile(Point3::origin(), 2.0, 2.0);
        let mut profile2 = create_rectangle_profile(Point3::new(0.0, 0.0, 3.0), 2.0, 2.0);
        let flipped = {
            let e = &profile2.edges[0];
            Edge::line(e.end_point(), e.start_point())
        };
        profile2.edges[0] = flipped;

        let shape = loft(&[profile1, profile2], &LoftOptions::default()).unwrap();
        let face = &shape.faces()[0];
        let top_start = face.surface.evaluate(Point2::new(0.0, 1.0));
        assert!((top_start - Point3::new(0.0, 0.0, 3.0)).norm() < 1e-9);
    }

    #[test]
    fn test_loft_closed() {
        let profile1 = create_rectangle_profile(Point3::new(10.0, 0.0, 0.0), 2.0, 2.0);
        let profile2 = create_rectangle_profile(Point3::new(0.0, 10.0, 0.0), 2.0, 2.0);
        let profile3 = create_rectangle_profile(Point3::new(-10.0, 0.0, 0.0), 2.0, 2.0);
        let profile4 = create_rectangle_profile(Point3::new(0.0, -10.0, 0.0), 2.0, 2.0);

        let options = LoftOptions {
            closed: true,
            ..Default::default()
        };

        let shape = loft(&[profile1, profile2, profile3, profile4], &options).unwrap();
        // 4 profiles x 4 segments
        assert_eq!(shape.faces().len(), 16);
    }

    #[test]
    fn test_loft_with_caps_is_solid() {
        let tol = Tolerance::DEFAULT;
        let bottom = create_circle_profile(Point3::origin(), 2.0);
        let top = create_circle_profile(Point3::new(0.0, 0.0, 6.0), 1.0);

        let shape = loft(&[bottom.clone(), top.clone()], &LoftOptions::default()).unwrap();
        let mut faces = shape.faces();
        faces.push(make_face(&bottom, &tol).unwrap());
        faces.push(make_face(&top, &tol).unwrap());
        assert!(make_solid(make_shell(faces).unwrap(), &tol).is_ok());
    }

    #[test]
    fn test_loft_too_few_profiles_error() {
        let profile = create_rectangle_profile(Point3::origin(), 10.0, 10.0);

        let result = loft(&[profile], &LoftOptions::default());
        assert!(matches!(result, Err(LoftError::TooFewProfiles(1))));
    }

    #[test]
    fn test_loft_mismatched_segments_error() {
        let profile1 = create_rectangle_profile(Point3::origin(), 10.0, 10.0);
        let profile2 = create_circle_profile(Point3::new(0.0, 0.0, 20.0), 5.0);

        let result = loft(&[profile1, profile2], &LoftOptions::default());
        assert!(matches!(
            result,
            Err(LoftError::MismatchedSegmentCounts(4, 1))
        ));
    }

    #[test]
    fn test_loft_disconnected_profile_error() {
        let profile1 = make_wire(vec![
            Edge::line(Point3::origin(), Point3::new(1.0, 0.0, 0.0)),
            Edge::line(Point3::new(5.0, 5.0, 0.0), Point3::new(6.0, 5.0, 0.0)),
        ]);
        let profile2 = make_wire(vec![
            Edge::line(Point3::new(0.0, 0.0, 1.0), Point3::new(1.0, 0.0, 1.0)),
            Edge::line(Point3::new(1.0, 0.0, 1.0), Point3::new(1.0, 1.0, 1.0)),
        ]);

        let result = loft(&[profile1, profile2], &LoftOptions::default());
        assert!(matches!(result, Err(LoftError::InvalidProfile(0, _))));
    }
}
