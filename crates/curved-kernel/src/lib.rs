#![warn(missing_docs)]

//! Geometry kernel adapter for curved arrays and segments.
//!
//! [`GeometryKernel`] is the narrow set of curve, surface and shape
//! operations the curved-shapes orchestration relies on. [`NativeKernel`]
//! implements it on top of the in-tree NURBS, topology and loft crates.
//!
//! # Example
//!
//! ```
//! use curved_kernel::{GeometryKernel, NativeKernel};
//! use curved_kernel::curved_kernel_geom::Plane;
//! use curved_kernel::curved_kernel_math::{Point3, Vec3};
//! use curved_kernel::curved_kernel_topo::Edge;
//!
//! let kernel = NativeKernel::default();
//! let edge = Edge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 10.0));
//! let plane = Plane::from_normal(Point3::new(0.0, 0.0, 4.0), Vec3::z());
//! let hits = kernel.intersect_curve_with_plane(&edge, &plane);
//! assert_eq!(hits.len(), 1);
//! assert!((kernel.parameter_at(&edge, &hits[0]) - 0.4).abs() < 1e-9);
//! ```

pub use curved_kernel_geom;
pub use curved_kernel_loft;
pub use curved_kernel_math;
pub use curved_kernel_nurbs;
pub use curved_kernel_topo;

use curved_kernel_geom::Plane;
use curved_kernel_loft::{loft, LoftError, LoftOptions};
use curved_kernel_math::{Aabb3, Dir3, Point3, Tolerance, Transform, Vec3};
use curved_kernel_nurbs::{BSplineCurve, BSplineSurface, NurbsError, SurfaceSpec};
use curved_kernel_topo::{
    Edge, Face, Shape, ShapeKind, ShapeType, TopoError, Wire,
};
use thiserror::Error;

/// Errors reported by a [`GeometryKernel`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// B-spline construction or conversion failed.
    #[error("B-spline error: {0}")]
    Nurbs(#[from] NurbsError),

    /// Face, shell or solid construction failed.
    #[error("topology error: {0}")]
    Topo(#[from] TopoError),

    /// Loft construction failed.
    #[error("loft error: {0}")]
    Loft(#[from] LoftError),

    /// The operation does not accept this kind of shape.
    #[error("expected {expected:?}, got {found:?}")]
    WrongShapeType {
        /// Accepted type.
        expected: ShapeType,
        /// Type that was passed.
        found: ShapeType,
    },
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Curve, surface and shape operations used by the curved-shapes features.
///
/// Operations never mutate their inputs, except [`set_placement`]. Every
/// returned shape is a new value.
///
/// [`set_placement`]: GeometryKernel::set_placement
pub trait GeometryKernel: Send + Sync {
    // =========================================================================
    // Curve queries
    // =========================================================================

    /// Points where the underlying (untrimmed) curve of `edge` crosses `plane`.
    fn intersect_curve_with_plane(&self, edge: &Edge, plane: &Plane) -> Vec<Point3>;

    /// Parameter of `point` on the underlying curve of `edge`.
    fn parameter_at(&self, edge: &Edge, point: &Point3) -> f64;

    /// B-spline form of `edge`, restricted to its parameter range.
    fn to_bspline(&self, edge: &Edge) -> Result<BSplineCurve>;

    // =========================================================================
    // Construction
    // =========================================================================

    /// Face on a B-spline surface built from poles, knots and multiplicities.
    fn build_bspline_surface(&self, spec: &SurfaceSpec) -> Result<Shape>;

    /// Wire through `edges` in order.
    fn make_wire(&self, edges: &[Edge]) -> Wire;

    /// True if the wire's edges form a closed loop.
    fn is_closed(&self, wire: &Wire) -> bool;

    /// Planar face bounded by a closed wire.
    fn make_face(&self, wire: &Wire) -> Result<Shape>;

    /// Shell made of every face in `shapes`.
    fn make_shell(&self, shapes: &[Shape]) -> Result<Shape>;

    /// Solid bounded by a closed shell.
    fn make_solid(&self, shell: &Shape) -> Result<Shape>;

    /// Ruled loft through `wires` in order.
    fn make_loft(&self, wires: &[Wire]) -> Result<Shape>;

    /// Compound of `shapes`.
    fn make_compound(&self, shapes: Vec<Shape>) -> Shape;

    // =========================================================================
    // Transforms and placement
    // =========================================================================

    /// Apply `matrix` to the shape's local geometry, keeping its placement.
    fn transform_geometry(&self, shape: &Shape, matrix: &Transform) -> Shape;

    /// Translate the shape's local geometry by `v`.
    fn translate(&self, shape: &Shape, v: &Vec3) -> Shape;

    /// Rotate the shape's local geometry by `angle` radians about the axis
    /// through `center`.
    fn rotate(&self, shape: &Shape, center: &Point3, axis: &Dir3, angle: f64) -> Shape;

    /// Independent copy of `shape`, placement included.
    fn copy_shape(&self, shape: &Shape) -> Shape;

    /// The shape's placement.
    fn placement(&self, shape: &Shape) -> Transform;

    /// Replace the shape's placement.
    fn set_placement(&self, shape: &mut Shape, placement: Transform);

    /// Axis-aligned bounding box in world coordinates.
    fn bounding_box(&self, shape: &Shape) -> Aabb3;
}

/// [`GeometryKernel`] backed by the in-tree kernel crates.
#[derive(Debug, Clone)]
pub struct NativeKernel {
    /// Tolerance for wire chaining and face/solid checks.
    pub tolerance: Tolerance,
    /// Samples per curve for numeric plane intersection.
    pub intersection_samples: usize,
}

impl NativeKernel {
    /// Kernel with the default tolerance and `intersection_samples` samples.
    pub fn new(intersection_samples: usize) -> Self {
        Self {
            tolerance: Tolerance::DEFAULT,
            intersection_samples,
        }
    }

    /// Same kernel with a different linear tolerance.
    pub fn with_tolerance(mut self, linear: f64) -> Self {
        self.tolerance = Tolerance::with_linear(linear);
        self
    }
}

impl Default for NativeKernel {
    fn default() -> Self {
        Self::new(64)
    }
}

impl GeometryKernel for NativeKernel {
    fn intersect_curve_with_plane(&self, edge: &Edge, plane: &Plane) -> Vec<Point3> {
        edge.curve.intersect_plane(plane, self.intersection_samples)
    }

    fn parameter_at(&self, edge: &Edge, point: &Point3) -> f64 {
        edge.curve.parameter_of(point)
    }

    fn to_bspline(&self, edge: &Edge) -> Result<BSplineCurve> {
        Ok(edge.to_bspline()?)
    }

    fn build_bspline_surface(&self, spec: &SurfaceSpec) -> Result<Shape> {
        let surface = BSplineSurface::from_spec(spec)?;
        Ok(Shape::face(Face::new(Box::new(surface))))
    }

    fn make_wire(&self, edges: &[Edge]) -> Wire {
        curved_kernel_topo::make_wire(edges.to_vec())
    }

    fn is_closed(&self, wire: &Wire) -> bool {
        wire.is_closed(&self.tolerance)
    }

    fn make_face(&self, wire: &Wire) -> Result<Shape> {
        let face = curved_kernel_topo::make_face(wire, &self.tolerance)?;
        Ok(Shape::face(face))
    }

    fn make_shell(&self, shapes: &[Shape]) -> Result<Shape> {
        let faces = shapes.iter().flat_map(Shape::faces).collect();
        let shell = curved_kernel_topo::make_shell(faces)?;
        Ok(Shape::shell(shell))
    }

    fn make_solid(&self, shell: &Shape) -> Result<Shape> {
        let located = shell.located();
        let ShapeKind::Shell(inner) = located.kind else {
            return Err(KernelError::WrongShapeType {
                expected: ShapeType::Shell,
                found: shell.shape_type(),
            });
        };
        let solid = curved_kernel_topo::make_solid(inner, &self.tolerance)?;
        Ok(Shape::solid(solid))
    }

    fn make_loft(&self, wires: &[Wire]) -> Result<Shape> {
        let options = LoftOptions {
            tolerance: self.tolerance,
            ..Default::default()
        };
        Ok(loft(wires, &options)?)
    }

    fn make_compound(&self, shapes: Vec<Shape>) -> Shape {
        curved_kernel_topo::make_compound(shapes)
    }

    fn transform_geometry(&self, shape: &Shape, matrix: &Transform) -> Shape {
        shape.transform_geometry(matrix)
    }

    fn translate(&self, shape: &Shape, v: &Vec3) -> Shape {
        shape.translate(v)
    }

    fn rotate(&self, shape: &Shape, center: &Point3, axis: &Dir3, angle: f64) -> Shape {
        shape.transform_geometry(&Transform::rotation_about_point(center, axis, angle))
    }

    fn copy_shape(&self, shape: &Shape) -> Shape {
        shape.clone()
    }

    fn placement(&self, shape: &Shape) -> Transform {
        shape.placement.clone()
    }

    fn set_placement(&self, shape: &mut Shape, placement: Transform) {
        shape.placement = placement;
    }

    fn bounding_box(&self, shape: &Shape) -> Aabb3 {
        shape.bounding_box()
    }
}
