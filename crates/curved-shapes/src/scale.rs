//! Non-uniform scaling about a point.

use curved_kernel::curved_kernel_math::{Point3, Transform, Vec3};
use curved_kernel::curved_kernel_topo::Shape;
use curved_kernel::GeometryKernel;

use crate::{AxisMask, BoundingExtent};

/// Scale `shape`'s geometry by `delta` about `center` and give the result
/// `placement`.
///
/// `delta == (1, 1, 1)` returns a plain copy that keeps its own placement.
/// Otherwise the scale is applied to the local geometry, which is then moved
/// so that `center` stays fixed.
pub fn scale(
    kernel: &dyn GeometryKernel,
    shape: &Shape,
    placement: &Transform,
    delta: &Vec3,
    center: &Point3,
) -> Shape {
    let copy = kernel.copy_shape(shape);
    if *delta == Vec3::new(1.0, 1.0, 1.0) {
        return copy;
    }

    let scaled = kernel.transform_geometry(&copy, &Transform::scale(delta.x, delta.y, delta.z));
    let correction = -(center.coords.component_mul(delta) - center.coords);
    let mut out = kernel.translate(&scaled, &correction);
    kernel.set_placement(&mut out, placement.clone());
    out
}

/// Scale and move a world-space `shape` so its box matches `extent` on the
/// axes enabled in `mask`.
///
/// The scale factor along a masked axis is the extent length over the
/// shape's length; other axes keep factor 1. The shape is scaled about its
/// box center, then its box minimum is moved onto the extent minimum along
/// the masked axes. Returns `None` when a factor falls below `eps`.
pub fn fit_to_extent(
    kernel: &dyn GeometryKernel,
    shape: &Shape,
    extent: &BoundingExtent,
    mask: AxisMask,
    eps: f64,
) -> Option<Shape> {
    let bbox = kernel.bounding_box(shape);
    let base = bbox.lengths();
    let target = extent.lengths();

    let mut delta = Vec3::new(1.0, 1.0, 1.0);
    for k in 0..3 {
        if mask.get(k) && base[k] > eps {
            delta[k] = target[k] / base[k];
            if delta[k] < eps {
                return None;
            }
        }
    }

    let center = bbox.center();
    let scaled = scale(kernel, shape, &kernel.placement(shape), &delta, &center);

    let scaled_min = kernel.bounding_box(&scaled).min;
    let mut shift = Vec3::zeros();
    for k in 0..3 {
        if mask.get(k) {
            shift[k] = extent.min[k] - scaled_min[k];
        }
    }
    Some(kernel.translate(&scaled, &shift))
}
