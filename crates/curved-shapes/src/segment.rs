//! Curved segment: ribs blended between two endpoint shapes.

use curved_kernel::curved_kernel_math::{Point3, Vec3};
use curved_kernel::curved_kernel_nurbs::interpolate_points;
use curved_kernel::curved_kernel_topo::{Edge, Shape};
use curved_kernel::{GeometryKernel, KernelError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::array::{finish, hull_masks};
use crate::document::{FeatureOutput, FeatureWorker, ObjectId, RecomputeContext, ViewProvider};
use crate::{
    compute_extent, fit_to_extent, AxisMask, CurvedError, Diagnostics, Result, Rib, Settings,
};

/// Numeric options of a curved segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Plane normal at the first shape.
    pub normal_shape1: [f64; 3],
    /// Plane normal at the second shape.
    pub normal_shape2: [f64; 3],
    /// Number of intermediate ribs.
    pub items: usize,
    /// Skin the ribs with a surface.
    pub surface: bool,
    /// Close the skin into a solid.
    pub solid: bool,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            normal_shape1: [0.0, 0.0, 1.0],
            normal_shape2: [0.0, 0.0, 1.0],
            items: 2,
            surface: false,
            solid: false,
        }
    }
}

/// Inputs of a curved segment.
#[derive(Debug, Clone, Default)]
pub struct CurvedSegmentParams {
    /// First endpoint rib.
    pub shape1: Option<Shape>,
    /// Last endpoint rib.
    pub shape2: Option<Shape>,
    /// Optional curves bounding the intermediate ribs.
    pub hullcurves: Vec<Shape>,
    /// Numeric options.
    pub options: SegmentOptions,
}

impl CurvedSegmentParams {
    /// Check the inputs before any geometry is built.
    ///
    /// # Errors
    /// [`CurvedError::Configuration`] if an endpoint is missing, the endpoints
    /// have different or zero edge counts, or a normal is zero.
    pub fn validate(&self, settings: &Settings) -> Result<()> {
        let (Some(s1), Some(s2)) = (&self.shape1, &self.shape2) else {
            return Err(CurvedError::config("curved segment needs two endpoint shapes"));
        };
        let (n1, n2) = (s1.edges().len(), s2.edges().len());
        if n1 == 0 {
            return Err(CurvedError::config("first endpoint shape has no edges"));
        }
        if n1 != n2 {
            return Err(CurvedError::config(format!(
                "endpoint shapes have {n1} and {n2} edges"
            )));
        }
        let o = &self.options;
        for (name, n) in [("normal_shape1", o.normal_shape1), ("normal_shape2", o.normal_shape2)] {
            if Vec3::from(n).norm() <= settings.epsilon {
                return Err(CurvedError::config(format!("{name} is zero")));
            }
        }
        Ok(())
    }
}

/// Blend two edges at `t`.
///
/// Compatible B-splines are blended pole by pole. Otherwise `samples + 1`
/// points are taken along both edges, blended, and a cubic is fitted
/// through them.
fn blend_edges(
    kernel: &dyn GeometryKernel,
    a: &Edge,
    b: &Edge,
    t: f64,
    samples: usize,
) -> std::result::Result<Edge, KernelError> {
    let (ca, cb) = (kernel.to_bspline(a)?, kernel.to_bspline(b)?);
    if let Some(curve) = ca.blend(&cb, t) {
        return Ok(Edge::from_bspline(curve));
    }
    let points: Vec<Point3> = a
        .sample(samples)
        .iter()
        .zip(b.sample(samples))
        .map(|(p, q)| p + (q - p) * t)
        .collect();
    Ok(Edge::from_bspline(interpolate_points(&points, 3)?))
}

/// Build a curved segment.
///
/// `items` intermediate ribs are blended between the two endpoint shapes at
/// `t = k / (items + 1)`. With hull curves, each rib is then fitted to the
/// curves' extent in the plane through the interpolated endpoint centers,
/// normal to the interpolated normal. Without `surface` or `solid` the result
/// is a compound of the intermediate ribs; otherwise the endpoints and ribs
/// are skinned together.
///
/// # Errors
/// [`CurvedError::Configuration`] for invalid inputs, and
/// [`CurvedError::NothingBuilt`] if no rib could be built.
pub fn curved_segment(
    kernel: &dyn GeometryKernel,
    params: &CurvedSegmentParams,
    settings: &Settings,
) -> Result<FeatureOutput> {
    params.validate(settings)?;
    let (Some(shape1), Some(shape2)) = (&params.shape1, &params.shape2) else {
        return Err(CurvedError::config("curved segment needs two endpoint shapes"));
    };
    let options = &params.options;
    let eps = settings.epsilon;
    let mut diagnostics = Diagnostics::new();

    let first = Rib::from_shape("shape1", shape1);
    let last = Rib::from_shape("shape2", shape2);
    let (c1, c2) = (first.bounding_box().center(), last.bounding_box().center());
    let (n1, n2) = (
        Vec3::from(options.normal_shape1).normalize(),
        Vec3::from(options.normal_shape2).normalize(),
    );

    let hull: Vec<Rib> = params
        .hullcurves
        .iter()
        .enumerate()
        .map(|(i, s)| Rib::from_shape(format!("hullcurve{i}"), s))
        .collect();
    let masks = hull_masks(&hull, eps);
    let union = masks.iter().fold(AxisMask::NONE, |acc, m| acc.union(m));

    let mut intermediates = Vec::with_capacity(options.items);
    'ribs: for k in 1..=options.items {
        let t = k as f64 / (options.items + 1) as f64;

        let mut edges = Vec::with_capacity(first.edge_count());
        for (e, (a, b)) in first.edges.iter().zip(&last.edges).enumerate() {
            match blend_edges(kernel, a, b, t, settings.interpolation_points) {
                Ok(edge) => edges.push(edge),
                Err(err) => {
                    diagnostics.warning(format!("rib {k}: blending edge {e} failed: {err}"));
                    continue 'ribs;
                }
            }
        }
        let mut rib = Shape::wire(kernel.make_wire(&edges));

        if !hull.is_empty() {
            let normal = n1 * (1.0 - t) + n2 * t;
            if normal.norm() <= eps {
                diagnostics.warning(format!("rib {k}: interpolated normal vanishes, skipped"));
                continue;
            }
            let normal = normal.normalize();
            let pos = c1 + (c2 - c1) * t;

            let Some(extent) = compute_extent(kernel, &hull, &pos, &normal, &masks, settings)?
            else {
                diagnostics.warning(format!("rib {k}: hull curves do not cross the plane at {pos:?}"));
                continue;
            };
            let fit_mask = union.without_direction(&normal, eps);
            let Some(fitted) = fit_to_extent(kernel, &rib, &extent, fit_mask, eps) else {
                diagnostics.warning(format!("rib {k}: degenerate scale, skipped"));
                continue;
            };

            let center = kernel.bounding_box(&fitted).center();
            let along = normal * (pos - center).dot(&normal);
            let mut shift = Vec3::zeros();
            for i in 0..3 {
                if !fit_mask.get(i) {
                    shift[i] = along[i];
                }
            }
            rib = kernel.translate(&fitted, &shift);
        }
        debug!(rib = k, t, "blended segment rib");
        intermediates.push(rib);
    }

    if options.surface || options.solid {
        let mut ribs = Vec::with_capacity(intermediates.len() + 2);
        ribs.push(first.to_shape());
        ribs.extend(intermediates);
        ribs.push(last.to_shape());
        finish(kernel, ribs, options.surface, options.solid, false, diagnostics)
    } else {
        finish(kernel, intermediates, false, false, false, diagnostics)
    }
}

/// Document worker recomputing a curved segment from other objects.
#[derive(Debug, Clone)]
pub struct CurvedSegmentWorker {
    /// Object providing the first endpoint.
    pub shape1: ObjectId,
    /// Object providing the last endpoint.
    pub shape2: ObjectId,
    /// Objects providing the hull curves.
    pub hullcurves: Vec<ObjectId>,
    /// Numeric options.
    pub options: SegmentOptions,
}

impl FeatureWorker for CurvedSegmentWorker {
    fn type_name(&self) -> &'static str {
        "CurvedSegment"
    }

    fn inputs(&self) -> Vec<ObjectId> {
        let mut ids = vec![self.shape1, self.shape2];
        ids.extend(&self.hullcurves);
        ids
    }

    fn execute(&self, ctx: &RecomputeContext<'_>) -> Result<FeatureOutput> {
        let params = CurvedSegmentParams {
            shape1: Some(ctx.shape(self.shape1)?.clone()),
            shape2: Some(ctx.shape(self.shape2)?.clone()),
            hullcurves: self
                .hullcurves
                .iter()
                .map(|id| ctx.shape(*id).cloned())
                .collect::<Result<_>>()?,
            options: self.options.clone(),
        };
        curved_segment(ctx.kernel, &params, ctx.settings)
    }
}

/// Tree and icon behaviour of a curved segment.
#[derive(Debug, Clone, Default)]
pub struct CurvedSegmentViewProvider;

impl ViewProvider for CurvedSegmentViewProvider {
    fn icon(&self) -> &'static str {
        "curvedSegment.svg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curved_kernel::curved_kernel_geom::Circle3d;
    use curved_kernel::curved_kernel_topo::{make_wire, ShapeKind, ShapeType};
    use curved_kernel::NativeKernel;
    use std::f64::consts::FRAC_PI_2;

    fn square(z: f64, size: f64) -> Shape {
        let p = |x: f64, y: f64| Point3::new(x, y, z);
        Shape::wire(make_wire(vec![
            Edge::line(p(0.0, 0.0), p(size, 0.0)),
            Edge::line(p(size, 0.0), p(size, size)),
            Edge::line(p(size, size), p(0.0, size)),
            Edge::line(p(0.0, size), p(0.0, 0.0)),
        ]))
    }

    fn params(shape1: Shape, shape2: Shape, options: SegmentOptions) -> CurvedSegmentParams {
        CurvedSegmentParams {
            shape1: Some(shape1),
            shape2: Some(shape2),
            hullcurves: Vec::new(),
            options,
        }
    }

    fn children(shape: &Shape) -> &[Shape] {
        match &shape.kind {
            ShapeKind::Compound(children) => children,
            _ => panic!("expected compound, got {:?}", shape.shape_type()),
        }
    }

    #[test]
    fn test_intermediate_ribs_between_squares() {
        let kernel = NativeKernel::default();
        let options = SegmentOptions {
            items: 3,
            ..Default::default()
        };
        let out = curved_segment(
            &kernel,
            &params(square(0.0, 2.0), square(10.0, 2.0), options),
            &Settings::default(),
        )
        .unwrap();
        assert!(out.diagnostics.is_empty());

        let ribs = children(&out.shape);
        assert_eq!(ribs.len(), 3);
        for (rib, z) in ribs.iter().zip([2.5, 5.0, 7.5]) {
            let bb = rib.bounding_box();
            assert!((bb.min - Point3::new(0.0, 0.0, z)).norm() < 1e-9);
            assert!((bb.max - Point3::new(2.0, 2.0, z)).norm() < 1e-9);
            assert_eq!(rib.edges().len(), 4);
        }
    }

    #[test]
    fn test_blend_between_sizes() {
        let kernel = NativeKernel::default();
        let options = SegmentOptions {
            items: 1,
            ..Default::default()
        };
        let out = curved_segment(
            &kernel,
            &params(square(0.0, 2.0), square(10.0, 4.0), options),
            &Settings::default(),
        )
        .unwrap();
        let bb = children(&out.shape)[0].bounding_box();
        assert!((bb.min - Point3::new(0.0, 0.0, 5.0)).norm() < 1e-9);
        assert!((bb.max - Point3::new(3.0, 3.0, 5.0)).norm() < 1e-9);
    }

    #[test]
    fn test_incompatible_edges_are_refitted() {
        let kernel = NativeKernel::default();
        let arc = Shape::edge(Edge::new(
            Box::new(Circle3d::new(Point3::origin(), 1.0)),
            0.0,
            FRAC_PI_2,
        ));
        let line = Shape::edge(Edge::line(
            Point3::new(1.0, 0.0, 4.0),
            Point3::new(0.0, 1.0, 4.0),
        ));
        let options = SegmentOptions {
            items: 1,
            ..Default::default()
        };
        let out = curved_segment(&kernel, &params(arc, line, options), &Settings::default())
            .unwrap();
        assert!(out.diagnostics.is_empty());

        let edge = &children(&out.shape)[0].edges()[0];
        assert!((edge.start_point() - Point3::new(1.0, 0.0, 2.0)).norm() < 1e-9);
        assert!((edge.end_point() - Point3::new(0.0, 1.0, 2.0)).norm() < 1e-9);
        // Halfway between the arc midpoint and the chord midpoint.
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let mid = edge.curve.evaluate(0.5 * (edge.first + edge.last));
        assert!((mid.x - mid.y).abs() < 1e-6);
        assert!((mid.x - 0.5 * (h + 0.5)).abs() < 0.05);
    }

    #[test]
    fn test_segment_solid() {
        let kernel = NativeKernel::default();
        let options = SegmentOptions {
            items: 1,
            solid: true,
            ..Default::default()
        };
        let out = curved_segment(
            &kernel,
            &params(square(0.0, 2.0), square(10.0, 2.0), options),
            &Settings::default(),
        )
        .unwrap();
        assert!(!out.diagnostics.has_errors(), "{:?}", out.diagnostics);
        assert_eq!(out.shape.shape_type(), ShapeType::Solid);
        let bb = out.shape.bounding_box();
        assert!((bb.min - Point3::new(0.0, 0.0, 0.0)).norm() < 1e-9);
        assert!((bb.max - Point3::new(2.0, 2.0, 10.0)).norm() < 1e-9);
    }

    #[test]
    fn test_ribs_fitted_to_hull() {
        let kernel = NativeKernel::default();
        let mut p = params(
            square(0.0, 2.0),
            square(10.0, 2.0),
            SegmentOptions {
                items: 1,
                ..Default::default()
            },
        );
        p.hullcurves = vec![
            Shape::edge(Edge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 10.0))),
            Shape::edge(Edge::line(Point3::new(2.0, 2.0, 0.0), Point3::new(4.0, 4.0, 10.0))),
        ];
        let out = curved_segment(&kernel, &p, &Settings::default()).unwrap();
        let bb = children(&out.shape)[0].bounding_box();
        assert!((bb.min - Point3::new(0.0, 0.0, 5.0)).norm() < 1e-9);
        assert!((bb.max - Point3::new(3.0, 3.0, 5.0)).norm() < 1e-9);
    }

    #[test]
    fn test_rib_outside_hull_skipped() {
        let kernel = NativeKernel::default();
        let mut p = params(
            square(0.0, 2.0),
            square(10.0, 2.0),
            SegmentOptions {
                items: 1,
                ..Default::default()
            },
        );
        p.hullcurves = vec![Shape::edge(Edge::line(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ))];
        let err = curved_segment(&kernel, &p, &Settings::default()).unwrap_err();
        assert!(matches!(err, CurvedError::NothingBuilt(_)));
    }

    #[test]
    fn test_segment_configuration_errors() {
        let kernel = NativeKernel::default();
        let settings = Settings::default();

        let mut missing = params(square(0.0, 1.0), square(1.0, 1.0), SegmentOptions::default());
        missing.shape2 = None;
        assert!(matches!(
            curved_segment(&kernel, &missing, &settings),
            Err(CurvedError::Configuration(_))
        ));

        let single = Shape::edge(Edge::line(Point3::origin(), Point3::new(1.0, 0.0, 1.0)));
        let mismatched = params(square(0.0, 1.0), single, SegmentOptions::default());
        assert!(matches!(
            curved_segment(&kernel, &mismatched, &settings),
            Err(CurvedError::Configuration(_))
        ));

        let zero_normal = params(
            square(0.0, 1.0),
            square(1.0, 1.0),
            SegmentOptions {
                normal_shape2: [0.0; 3],
                ..Default::default()
            },
        );
        assert!(matches!(
            curved_segment(&kernel, &zero_normal, &settings),
            Err(CurvedError::Configuration(_))
        ));
    }
}
