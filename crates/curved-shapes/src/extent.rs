//! Bounding extent of curves cut by a plane.

use curved_kernel::curved_kernel_geom::Plane;
use curved_kernel::curved_kernel_math::{Aabb3, Point3, Vec3};
use curved_kernel::GeometryKernel;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CurvedError, Result, Rib, Settings};

/// Per-axis switches selecting which coordinates take part in an extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisMask {
    /// Use X coordinates.
    pub x: bool,
    /// Use Y coordinates.
    pub y: bool,
    /// Use Z coordinates.
    pub z: bool,
}

impl AxisMask {
    /// All axes enabled.
    pub const ALL: Self = Self::new(true, true, true);

    /// No axis enabled.
    pub const NONE: Self = Self::new(false, false, false);

    /// Mask from three switches.
    pub const fn new(x: bool, y: bool, z: bool) -> Self {
        Self { x, y, z }
    }

    /// Axes along which `bbox` is longer than `eps`.
    pub fn from_box(bbox: &Aabb3, eps: f64) -> Self {
        let l = bbox.lengths();
        Self::new(l.x > eps, l.y > eps, l.z > eps)
    }

    /// Switch for axis `k` (0 = X, 1 = Y, 2 = Z).
    pub fn get(&self, k: usize) -> bool {
        match k {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Axes enabled in either mask.
    pub fn union(&self, other: &AxisMask) -> Self {
        Self::new(self.x || other.x, self.y || other.y, self.z || other.z)
    }

    /// Same mask with every axis that `direction` runs along switched off.
    pub fn without_direction(&self, direction: &Vec3, eps: f64) -> Self {
        let d = direction.normalize();
        let off = |c: f64| (c.abs() - 1.0).abs() <= eps.max(1e-9);
        Self::new(
            self.x && !off(d.x),
            self.y && !off(d.y),
            self.z && !off(d.z),
        )
    }

    /// True if any axis is enabled.
    pub fn any(&self) -> bool {
        self.x || self.y || self.z
    }
}

/// Box spanned by plane intersection points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingExtent {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl BoundingExtent {
    /// Side lengths.
    pub fn lengths(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }
}

/// Intersect every curve with the plane through `plane_pos` normal to
/// `plane_normal` and return the box of the intersection points.
///
/// Intersections are taken on the untrimmed curves and kept only when their
/// parameter lies in the edge's range (widened by `settings.epsilon`). If any
/// curve has no kept point the extent is undefined and `Ok(None)` is
/// returned. A curve with more than one kept point only contributes along the
/// axes enabled in its mask. Axes no point contributed to collapse to
/// `[0, 0]`.
///
/// # Errors
/// [`CurvedError::Configuration`] if `masks` and `curves` differ in length
/// or the normal is zero.
pub fn compute_extent(
    kernel: &dyn GeometryKernel,
    curves: &[Rib],
    plane_pos: &Point3,
    plane_normal: &Vec3,
    masks: &[AxisMask],
    settings: &Settings,
) -> Result<Option<BoundingExtent>> {
    if curves.is_empty() {
        return Ok(None);
    }
    if masks.len() != curves.len() {
        return Err(CurvedError::config(format!(
            "{} axis masks given for {} curves",
            masks.len(),
            curves.len()
        )));
    }
    if plane_normal.norm() <= settings.epsilon {
        return Err(CurvedError::config("plane normal is zero"));
    }

    let plane = Plane::from_normal(*plane_pos, *plane_normal);
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];

    for (curve, mask) in curves.iter().zip(masks) {
        let mut ipoints = Vec::new();
        for edge in &curve.edges {
            for p in kernel.intersect_curve_with_plane(edge, &plane) {
                let t = kernel.parameter_at(edge, &p);
                if edge.contains_parameter(t, settings.epsilon) {
                    ipoints.push(p);
                }
            }
        }

        if ipoints.is_empty() {
            debug!(curve = %curve.name, "no intersection with plane at {plane_pos:?}");
            return Ok(None);
        }

        let used = if ipoints.len() > 1 {
            *mask
        } else {
            AxisMask::ALL
        };
        for p in &ipoints {
            for k in 0..3 {
                if used.get(k) {
                    min[k] = min[k].min(p[k]);
                    max[k] = max[k].max(p[k]);
                }
            }
        }
    }

    for k in 0..3 {
        if min[k] == f64::INFINITY || max[k] == f64::NEG_INFINITY {
            min[k] = 0.0;
            max[k] = 0.0;
        }
    }

    Ok(Some(BoundingExtent {
        min: Point3::new(min[0], min[1], min[2]),
        max: Point3::new(max[0], max[1], max[2]),
    }))
}
