//! Curved array: copies of a base shape fitted between hull curves.

use curved_kernel::curved_kernel_math::{Aabb3, Dir3, Point3, Transform, Vec3};
use curved_kernel::curved_kernel_topo::Shape;
use curved_kernel::GeometryKernel;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{FeatureOutput, FeatureWorker, ObjectId, RecomputeContext, ViewProvider};
use crate::{
    build_surface_or_solid, compute_extent, fit_to_extent, AxisMask, CurvedError, Diagnostics,
    Result, Rib, Settings,
};

/// Numeric options of a curved array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayOptions {
    /// Direction the copies are distributed along.
    pub axis: [f64; 3],
    /// Number of copies.
    pub items: usize,
    /// Distance skipped at the start of the hull curves.
    pub offset_start: f64,
    /// Distance skipped at the end of the hull curves.
    pub offset_end: f64,
    /// Rotation of the last copy about the axis, in degrees. Copies in
    /// between rotate proportionally.
    pub twist: f64,
    /// Skin the copies with a surface.
    pub surface: bool,
    /// Close the skin into a solid.
    pub solid: bool,
    /// Also return the individual copies.
    pub extract: bool,
}

impl Default for ArrayOptions {
    fn default() -> Self {
        Self {
            axis: [0.0, 0.0, 1.0],
            items: 2,
            offset_start: 0.0,
            offset_end: 0.0,
            twist: 0.0,
            surface: false,
            solid: false,
            extract: false,
        }
    }
}

/// Inputs of a curved array.
#[derive(Debug, Clone, Default)]
pub struct CurvedArrayParams {
    /// Shape to copy.
    pub base: Option<Shape>,
    /// Curves bounding the copies.
    pub hullcurves: Vec<Shape>,
    /// Numeric options.
    pub options: ArrayOptions,
}

impl CurvedArrayParams {
    /// Check the inputs before any geometry is built.
    ///
    /// # Errors
    /// [`CurvedError::Configuration`] if the base or the hull curves are
    /// missing, the axis is zero or `items` is zero.
    pub fn validate(&self, settings: &Settings) -> Result<()> {
        if self.base.is_none() {
            return Err(CurvedError::config("curved array needs a base shape"));
        }
        if self.hullcurves.is_empty() {
            return Err(CurvedError::config("curved array needs at least one hull curve"));
        }
        validate_options(&self.options, settings)
    }
}

pub(crate) fn validate_options(options: &ArrayOptions, settings: &Settings) -> Result<()> {
    if Vec3::from(options.axis).norm() <= settings.epsilon {
        return Err(CurvedError::config("curved array axis is zero"));
    }
    if options.items == 0 {
        return Err(CurvedError::config("curved array needs at least one item"));
    }
    Ok(())
}

/// Per-curve masks: a curve only bounds the axes it actually extends along.
pub(crate) fn hull_masks(hull: &[Rib], eps: f64) -> Vec<AxisMask> {
    hull.iter()
        .map(|rib| AxisMask::from_box(&rib.bounding_box(), eps))
        .collect()
}

/// Box the hull curves span together: along each axis, the overlap of the
/// curves that extend along it. Axes no curve extends along take the first
/// curve's box.
fn curve_box(hull: &[Rib], masks: &[AxisMask]) -> Aabb3 {
    let boxes: Vec<Aabb3> = hull.iter().map(Rib::bounding_box).collect();
    let mut out = boxes[0];
    for k in 0..3 {
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        for (bb, mask) in boxes.iter().zip(masks) {
            if mask.get(k) {
                lo = lo.max(bb.min[k]);
                hi = hi.min(bb.max[k]);
            }
        }
        if lo.is_finite() && hi.is_finite() {
            out.min[k] = lo;
            out.max[k] = hi;
        }
    }
    out
}

/// Build a curved array.
///
/// Copies of the base are placed at `items` evenly spaced planes along the
/// axis, between the start and end of the hull curves (less the offsets).
/// At each plane the hull curves' extent gives the size and position of the
/// copy on every axis the curves extend along, except the array axis itself.
/// Along the axis the copy is centered on the plane. Steps with no extent or
/// a degenerate scale are skipped with a warning.
///
/// # Errors
/// [`CurvedError::Configuration`] for invalid inputs, and
/// [`CurvedError::NothingBuilt`] if every step was skipped.
pub fn curved_array(
    kernel: &dyn GeometryKernel,
    params: &CurvedArrayParams,
    settings: &Settings,
) -> Result<FeatureOutput> {
    params.validate(settings)?;
    let Some(base) = params.base.as_ref() else {
        return Err(CurvedError::config("curved array needs a base shape"));
    };
    let options = &params.options;
    let eps = settings.epsilon;
    let axis = Vec3::from(options.axis).normalize();
    let mut diagnostics = Diagnostics::new();

    let hull: Vec<Rib> = params
        .hullcurves
        .iter()
        .enumerate()
        .map(|(i, s)| Rib::from_shape(format!("hullcurve{i}"), s))
        .collect();
    let masks = hull_masks(&hull, eps);
    let fit_mask = masks
        .iter()
        .fold(AxisMask::NONE, |acc, m| acc.union(m))
        .without_direction(&axis, eps);

    let cbox = curve_box(&hull, &masks);
    let area = cbox.lengths();
    let travel = area.component_mul(&axis) - (options.offset_start + options.offset_end) * axis;
    let start = Point3::new(
        if axis.x < 0.0 { cbox.max.x } else { cbox.min.x },
        if axis.y < 0.0 { cbox.max.y } else { cbox.min.y },
        if axis.z < 0.0 { cbox.max.z } else { cbox.min.z },
    );
    let pos0 = start + options.offset_start * axis;

    // Copies are built in world coordinates.
    let world_base = {
        let mut b = kernel.transform_geometry(base, &kernel.placement(base));
        kernel.set_placement(&mut b, Transform::identity());
        b
    };
    let base_center = kernel.bounding_box(&world_base).center();

    let mut copies = Vec::with_capacity(options.items);
    for i in 0..options.items {
        let t = if options.items > 1 {
            i as f64 / (options.items - 1) as f64
        } else {
            0.0
        };
        let pos = pos0 + t * travel;

        let Some(extent) = compute_extent(kernel, &hull, &pos, &axis, &masks, settings)? else {
            diagnostics.warning(format!("item {i}: hull curves do not cross the plane at {pos:?}"));
            continue;
        };

        let Some(fitted) = fit_to_extent(kernel, &world_base, &extent, fit_mask, eps) else {
            diagnostics.warning(format!("item {i}: degenerate scale, skipped"));
            continue;
        };

        // Along the axis, center the copy on the plane.
        let axial = axis * (pos - base_center).dot(&axis);
        let mut shift = Vec3::zeros();
        for k in 0..3 {
            if !fit_mask.get(k) {
                shift[k] = axial[k];
            }
        }
        let mut copy = kernel.translate(&fitted, &shift);

        let angle = options.twist * t;
        if angle.abs() > eps {
            let center = kernel.bounding_box(&copy).center();
            copy = kernel.rotate(&copy, &center, &Dir3::new_normalize(axis), angle.to_radians());
        }
        debug!(item = i, t, "placed array copy");
        copies.push(copy);
    }

    finish(kernel, copies, options.surface, options.solid, options.extract, diagnostics)
}

/// Turn placed ribs into the feature result: a skin when requested and
/// possible, otherwise a compound of the ribs.
pub(crate) fn finish(
    kernel: &dyn GeometryKernel,
    ribs: Vec<Shape>,
    surface: bool,
    solid: bool,
    extract: bool,
    mut diagnostics: Diagnostics,
) -> Result<FeatureOutput> {
    if ribs.is_empty() {
        return Err(CurvedError::NothingBuilt("every step was skipped".into()));
    }

    let shape = if (surface || solid) && ribs.len() >= 2 {
        let stack: Vec<Rib> = ribs
            .iter()
            .enumerate()
            .map(|(i, s)| Rib::from_shape(format!("rib{i}"), s))
            .collect();
        build_surface_or_solid(kernel, &stack, solid, &mut diagnostics)?
    } else {
        if surface || solid {
            diagnostics.warning(format!(
                "{} rib(s) are not enough for a surface, creating compound",
                ribs.len()
            ));
        }
        kernel.make_compound(ribs.clone())
    };

    Ok(FeatureOutput {
        shape,
        ribs: if extract { ribs } else { Vec::new() },
        diagnostics,
    })
}

/// Document worker recomputing a curved array from other objects.
#[derive(Debug, Clone)]
pub struct CurvedArrayWorker {
    /// Object providing the base shape.
    pub base: ObjectId,
    /// Objects providing the hull curves.
    pub hullcurves: Vec<ObjectId>,
    /// Numeric options.
    pub options: ArrayOptions,
}

impl FeatureWorker for CurvedArrayWorker {
    fn type_name(&self) -> &'static str {
        "CurvedArray"
    }

    fn inputs(&self) -> Vec<ObjectId> {
        let mut ids = vec![self.base];
        ids.extend(&self.hullcurves);
        ids
    }

    fn execute(&self, ctx: &RecomputeContext<'_>) -> Result<FeatureOutput> {
        let params = CurvedArrayParams {
            base: Some(ctx.shape(self.base)?.clone()),
            hullcurves: self
                .hullcurves
                .iter()
                .map(|id| ctx.shape(*id).cloned())
                .collect::<Result<_>>()?,
            options: self.options.clone(),
        };
        curved_array(ctx.kernel, &params, ctx.settings)
    }
}

/// Tree and icon behaviour of a curved array.
#[derive(Debug, Clone, Default)]
pub struct CurvedArrayViewProvider;

impl ViewProvider for CurvedArrayViewProvider {
    fn icon(&self) -> &'static str {
        "curvedArray.svg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curved_kernel::curved_kernel_topo::{make_wire, Edge, ShapeKind, ShapeType};
    use curved_kernel::NativeKernel;

    fn square(size: f64) -> Shape {
        let p = |x: f64, y: f64| Point3::new(x, y, 0.0);
        Shape::wire(make_wire(vec![
            Edge::line(p(0.0, 0.0), p(size, 0.0)),
            Edge::line(p(size, 0.0), p(size, size)),
            Edge::line(p(size, size), p(0.0, size)),
            Edge::line(p(0.0, size), p(0.0, 0.0)),
        ]))
    }

    fn line(a: Point3, b: Point3) -> Shape {
        Shape::edge(Edge::line(a, b))
    }

    fn params(hullcurves: Vec<Shape>, options: ArrayOptions) -> CurvedArrayParams {
        CurvedArrayParams {
            base: Some(square(2.0)),
            hullcurves,
            options,
        }
    }

    fn straight_posts() -> Vec<Shape> {
        vec![
            line(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 10.0)),
            line(Point3::new(2.0, 2.0, 0.0), Point3::new(2.0, 2.0, 10.0)),
        ]
    }

    #[test]
    fn test_array_copies_along_axis() {
        let kernel = NativeKernel::default();
        let options = ArrayOptions {
            items: 3,
            ..Default::default()
        };
        let out = curved_array(&kernel, &params(straight_posts(), options), &Settings::default())
            .unwrap();
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.shape.shape_type(), ShapeType::Compound);

        let ShapeKind::Compound(children) = &out.shape.kind else {
            panic!("expected compound");
        };
        assert_eq!(children.len(), 3);
        for (child, z) in children.iter().zip([0.0, 5.0, 10.0]) {
            let bb = child.bounding_box();
            assert!((bb.min - Point3::new(0.0, 0.0, z)).norm() < 1e-9);
            assert!((bb.max - Point3::new(2.0, 2.0, z)).norm() < 1e-9);
        }
    }

    #[test]
    fn test_array_scales_to_tapered_hull() {
        let kernel = NativeKernel::default();
        let hull = vec![
            line(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 10.0)),
            line(Point3::new(2.0, 2.0, 0.0), Point3::new(4.0, 4.0, 10.0)),
        ];
        let options = ArrayOptions {
            items: 2,
            extract: true,
            ..Default::default()
        };
        let out = curved_array(&kernel, &params(hull, options), &Settings::default()).unwrap();
        assert_eq!(out.ribs.len(), 2);

        let top = out.ribs[1].bounding_box();
        assert!((top.min - Point3::new(0.0, 0.0, 10.0)).norm() < 1e-9);
        assert!((top.max - Point3::new(4.0, 4.0, 10.0)).norm() < 1e-9);
    }

    #[test]
    fn test_array_offsets() {
        let kernel = NativeKernel::default();
        let options = ArrayOptions {
            items: 2,
            offset_start: 1.0,
            offset_end: 3.0,
            extract: true,
            ..Default::default()
        };
        let out = curved_array(&kernel, &params(straight_posts(), options), &Settings::default())
            .unwrap();
        let z: Vec<f64> = out.ribs.iter().map(|r| r.bounding_box().min.z).collect();
        assert!((z[0] - 1.0).abs() < 1e-9);
        assert!((z[1] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_array_negative_axis_starts_at_top() {
        let kernel = NativeKernel::default();
        let options = ArrayOptions {
            axis: [0.0, 0.0, -1.0],
            items: 2,
            offset_start: 2.0,
            extract: true,
            ..Default::default()
        };
        let out = curved_array(&kernel, &params(straight_posts(), options), &Settings::default())
            .unwrap();
        let z: Vec<f64> = out.ribs.iter().map(|r| r.bounding_box().min.z).collect();
        assert!((z[0] - 8.0).abs() < 1e-9);
        assert!((z[1] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_array_twist() {
        let kernel = NativeKernel::default();
        let options = ArrayOptions {
            items: 2,
            twist: 90.0,
            extract: true,
            ..Default::default()
        };
        let out = curved_array(&kernel, &params(straight_posts(), options), &Settings::default())
            .unwrap();
        let first = out.ribs[0].edges()[0].start_point();
        assert!((first - Point3::new(0.0, 0.0, 0.0)).norm() < 1e-9);
        // The last copy is turned a quarter about its center (1, 1).
        let last = out.ribs[1].edges()[0].start_point();
        assert!((last - Point3::new(2.0, 0.0, 10.0)).norm() < 1e-9);
    }

    #[test]
    fn test_array_solid_prism() {
        let kernel = NativeKernel::default();
        let options = ArrayOptions {
            items: 2,
            solid: true,
            ..Default::default()
        };
        let out = curved_array(&kernel, &params(straight_posts(), options), &Settings::default())
            .unwrap();
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.shape.shape_type(), ShapeType::Solid);
        assert!(out.ribs.is_empty());

        let bb = out.shape.bounding_box();
        assert!((bb.min - Point3::new(0.0, 0.0, 0.0)).norm() < 1e-9);
        assert!((bb.max - Point3::new(2.0, 2.0, 10.0)).norm() < 1e-9);
    }

    #[test]
    fn test_array_skips_steps_outside_hull() {
        let kernel = NativeKernel::default();
        let hull = vec![
            line(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 10.0)),
            line(Point3::new(2.0, 2.0, 0.0), Point3::new(2.0, 2.0, 4.0)),
        ];
        // The posts overlap on [0, 4]. A negative end offset pushes the
        // second plane to z = 10, past the shorter post.
        let options = ArrayOptions {
            items: 2,
            offset_end: -6.0,
            surface: true,
            ..Default::default()
        };
        let out = curved_array(&kernel, &params(hull, options), &Settings::default()).unwrap();
        assert!(out.diagnostics.contains("do not cross the plane"));
        assert!(out.diagnostics.contains("not enough for a surface"));
        assert_eq!(out.shape.shape_type(), ShapeType::Compound);
    }

    #[test]
    fn test_array_configuration_errors() {
        let kernel = NativeKernel::default();
        let settings = Settings::default();

        let mut missing_base = params(straight_posts(), ArrayOptions::default());
        missing_base.base = None;
        assert!(matches!(
            curved_array(&kernel, &missing_base, &settings),
            Err(CurvedError::Configuration(_))
        ));

        let no_hull = params(Vec::new(), ArrayOptions::default());
        assert!(matches!(
            curved_array(&kernel, &no_hull, &settings),
            Err(CurvedError::Configuration(_))
        ));

        let zero_axis = params(
            straight_posts(),
            ArrayOptions {
                axis: [0.0; 3],
                ..Default::default()
            },
        );
        assert!(matches!(
            curved_array(&kernel, &zero_axis, &settings),
            Err(CurvedError::Configuration(_))
        ));
    }

    #[test]
    fn test_array_options_json() {
        let options: ArrayOptions =
            serde_json::from_str(r#"{ "items": 5, "twist": 45.0, "solid": true }"#).unwrap();
        assert_eq!(options.items, 5);
        assert_eq!(options.axis, [0.0, 0.0, 1.0]);
        assert!(options.solid && !options.surface);
    }

    #[test]
    fn test_curve_box_overlap() {
        let hull: Vec<Rib> = vec![
            Rib::from_shape("a", &line(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 10.0))),
            Rib::from_shape("b", &line(Point3::new(3.0, 0.0, 2.0), Point3::new(3.0, 0.0, 12.0))),
        ];
        let masks = hull_masks(&hull, 1e-7);
        let bb = curve_box(&hull, &masks);
        assert!((bb.min.z - 2.0).abs() < 1e-12);
        assert!((bb.max.z - 10.0).abs() < 1e-12);
        // X is not bounded by any curve: first curve's box.
        assert_eq!((bb.min.x, bb.max.x), (0.0, 0.0));
    }
}
