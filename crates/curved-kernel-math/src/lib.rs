#![warn(missing_docs)]

//! Math types for the curved-shapes geometry kernel.
//!
//! Points, vectors and directions are nalgebra aliases. [`Transform`] doubles
//! as the placement every shape carries; [`Aabb3`] is the box all extent and
//! scale computations are expressed in.

use nalgebra::{Matrix4, Unit, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// An affine map stored as a homogeneous 4x4 matrix.
///
/// Used both for geometry edits (non-uniform scale, twist) and as a shape
/// placement, the rigid map from local geometry to the parent frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Homogeneous matrix; the last row is `[0, 0, 0, 1]`.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// The identity map.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            matrix: Matrix4::new_translation(&Vec3::new(dx, dy, dz)),
        }
    }

    /// Translation by `v`.
    pub fn translation_vec(v: &Vec3) -> Self {
        Self {
            matrix: Matrix4::new_translation(v),
        }
    }

    /// Axis-aligned scale by `(sx, sy, sz)` about the origin.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            matrix: Matrix4::new_nonuniform_scaling(&Vec3::new(sx, sy, sz)),
        }
    }

    /// Rotation by `angle` radians about the line through `center` along
    /// `axis`. Right-handed.
    pub fn rotation_about_point(center: &Point3, axis: &Dir3, angle: f64) -> Self {
        let rotation = nalgebra::Rotation3::from_axis_angle(axis, angle).to_homogeneous();
        let to_origin = Matrix4::new_translation(&-center.coords);
        let back = Matrix4::new_translation(&center.coords);
        Self {
            matrix: back * rotation * to_origin,
        }
    }

    /// `other` followed by `self`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Map a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let h = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(h.x, h.y, h.z)
    }

    /// Map a direction; translation does not apply.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let h = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(h.x, h.y, h.z)
    }

    /// True if every matrix entry is within `eps` of the identity.
    pub fn is_identity(&self, eps: f64) -> bool {
        (self.matrix - Matrix4::identity()).amax() <= eps
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Distance below which two points are the same.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Linear tolerance in model units.
    pub linear: f64,
}

impl Tolerance {
    /// `1e-7` model units.
    pub const DEFAULT: Self = Self { linear: 1e-7 };

    /// Tolerance of `linear` model units.
    pub fn with_linear(linear: f64) -> Self {
        Self { linear }
    }

    /// True if `a` and `b` are closer than the linear tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Box with the given corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Inverted box that any included point replaces.
    pub fn empty() -> Self {
        Self {
            min: Point3::from(Vec3::repeat(f64::INFINITY)),
            max: Point3::from(Vec3::repeat(f64::NEG_INFINITY)),
        }
    }

    /// True if nothing was included.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|k| self.min[k] > self.max[k])
    }

    /// Grow to contain `p`.
    pub fn include_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow to contain `other`. Empty boxes are ignored.
    pub fn include_box(&mut self, other: &Aabb3) {
        if !other.is_empty() {
            self.include_point(&other.min);
            self.include_point(&other.max);
        }
    }

    /// Side lengths along X, Y and Z.
    pub fn lengths(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// True if the boxes intersect; touching counts.
    pub fn overlaps(&self, other: &Aabb3) -> bool {
        (0..3).all(|k| self.min[k] <= other.max[k] && other.min[k] <= self.max[k])
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}
