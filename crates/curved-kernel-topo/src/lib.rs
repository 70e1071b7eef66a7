#![warn(missing_docs)]

//! Shape topology for the curved-shapes kernel.
//!
//! A [`Shape`] is a tree of edges, wires, faces, shells, solids and
//! compounds. Geometry is stored in the shape's local frame; the shape's
//! `placement` positions it in its parent (or in the world for a root
//! shape). Compound children carry their own placements.
//!
//! Construction that can fail ([`make_face`], [`make_shell`],
//! [`make_solid`]) returns [`TopoError`] instead of panicking.

mod build;

pub use build::{make_face, make_shell, make_solid};

use curved_kernel_geom::{transform_trimmed, Curve3d, Line3d, Surface};
use curved_kernel_math::{Aabb3, Point2, Point3, Tolerance, Transform, Vec3};
use curved_kernel_nurbs::{BSplineCurve, NurbsError};
use thiserror::Error;

/// Errors from topological construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopoError {
    /// The wire has no edges.
    #[error("wire has no edges")]
    EmptyWire,

    /// The wire does not form a closed loop.
    #[error("wire is not closed")]
    NotClosed,

    /// The wire does not lie in a plane.
    #[error("wire is not planar: deviation {0:.6}")]
    NotPlanar(f64),

    /// A shell needs at least one face.
    #[error("shell has no faces")]
    EmptyShell,

    /// Some face boundaries are not shared with another face.
    #[error("shell is open: {0} free boundaries")]
    OpenShell(usize),

    /// Curve conversion failed.
    #[error("geometry error: {0}")]
    Geometry(#[from] NurbsError),
}

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopoError>;

// =============================================================================
// Edge and wire
// =============================================================================

/// A curve trimmed to the parameter range `[first, last]`.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Underlying (untrimmed) curve.
    pub curve: Box<dyn Curve3d>,
    /// Start parameter.
    pub first: f64,
    /// End parameter.
    pub last: f64,
}

impl Edge {
    /// Create an edge on `curve` between `first` and `last`.
    pub fn new(curve: Box<dyn Curve3d>, first: f64, last: f64) -> Self {
        Self { curve, first, last }
    }

    /// Straight edge from `start` to `end`, parameterized on `[0, 1]`.
    pub fn line(start: Point3, end: Point3) -> Self {
        Self::new(Box::new(Line3d::from_points(start, end)), 0.0, 1.0)
    }

    /// Edge covering the whole domain of a B-spline curve.
    pub fn from_bspline(curve: BSplineCurve) -> Self {
        let (first, last) = curve.parameter_domain();
        Self::new(Box::new(curve), first, last)
    }

    /// Point at `first`.
    pub fn start_point(&self) -> Point3 {
        self.curve.evaluate(self.first)
    }

    /// Point at `last`.
    pub fn end_point(&self) -> Point3 {
        self.curve.evaluate(self.last)
    }

    /// `n + 1` points evenly spaced in parameter, from start to end.
    pub fn sample(&self, n: usize) -> Vec<Point3> {
        let n = n.max(1);
        (0..=n)
            .map(|i| {
                let t = self.first + (self.last - self.first) * i as f64 / n as f64;
                self.curve.evaluate(t)
            })
            .collect()
    }

    /// True if `t` lies in `[first, last]`, widened by `eps`.
    ///
    /// Parameters of periodic curves are first shifted by whole periods
    /// towards the range.
    pub fn contains_parameter(&self, t: f64, eps: f64) -> bool {
        let t = match self.curve.period() {
            Some(period) if period > 0.0 => {
                let mut t = t;
                while t < self.first - eps {
                    t += period;
                }
                while t - period >= self.first - eps {
                    t -= period;
                }
                t
            }
            _ => t,
        };
        t >= self.first - eps && t <= self.last + eps
    }

    /// B-spline representation of the trimmed curve.
    pub fn to_bspline(&self) -> std::result::Result<BSplineCurve, NurbsError> {
        self.curve.to_bspline(self.first, self.last)
    }

    /// Apply an affine transform.
    pub fn transformed(&self, t: &Transform) -> Self {
        let range = (self.first, self.last);
        let (curve, (first, last)) = transform_trimmed(self.curve.as_ref(), range, t);
        Self { curve, first, last }
    }

    /// Bounding box of the trimmed curve.
    pub fn bounding_box(&self) -> Aabb3 {
        self.curve.bounding_box(self.first, self.last)
    }

    /// True if start and end coincide and the edge has no extent.
    pub fn is_degenerate(&self, tol: &Tolerance) -> bool {
        let l = self.bounding_box().lengths();
        l.x < tol.linear && l.y < tol.linear && l.z < tol.linear
    }
}

/// An ordered chain of edges.
#[derive(Debug, Clone, Default)]
pub struct Wire {
    /// Edges in order.
    pub edges: Vec<Edge>,
}

impl Wire {
    /// Create a wire from edges in order.
    pub fn new(edges: Vec<Edge>) -> Self {
        Self { edges }
    }

    /// Orientation of each edge along the chain (`true` = reversed), if the
    /// edges connect end to end within `tol`.
    pub fn orientation(&self, tol: &Tolerance) -> Option<Vec<bool>> {
        let n = self.edges.len();
        if n == 0 {
            return None;
        }
        if n == 1 {
            return Some(vec![false]);
        }
        let ends = |i: usize, reversed: bool| {
            let e = &self.edges[i];
            if reversed {
                (e.end_point(), e.start_point())
            } else {
                (e.start_point(), e.end_point())
            }
        };
        // The first edge is reversed if its start touches the second edge.
        let (s1, e1) = ends(1, false);
        let (s0, e0) = ends(0, false);
        let first_reversed = !(tol.points_equal(&e0, &s1) || tol.points_equal(&e0, &e1))
            && (tol.points_equal(&s0, &s1) || tol.points_equal(&s0, &e1));

        let mut flags = vec![first_reversed];
        let mut tip = ends(0, first_reversed).1;
        for i in 1..n {
            let (s, e) = ends(i, false);
            if tol.points_equal(&tip, &s) {
                flags.push(false);
                tip = e;
            } else if tol.points_equal(&tip, &e) {
                flags.push(true);
                tip = s;
            } else {
                return None;
            }
        }
        Some(flags)
    }

    /// True if the edges form a connected loop ending where it started.
    pub fn is_closed(&self, tol: &Tolerance) -> bool {
        let Some(flags) = self.orientation(tol) else {
            return false;
        };
        let first = &self.edges[0];
        let start = if flags[0] {
            first.end_point()
        } else {
            first.start_point()
        };
        let last_idx = self.edges.len() - 1;
        let last = &self.edges[last_idx];
        let end = if flags[last_idx] {
            last.start_point()
        } else {
            last.end_point()
        };
        tol.points_equal(&start, &end)
    }

    /// Apply an affine transform to every edge.
    pub fn transformed(&self, t: &Transform) -> Self {
        Self::new(self.edges.iter().map(|e| e.transformed(t)).collect())
    }

    /// Bounding box of all edges.
    pub fn bounding_box(&self) -> Aabb3 {
        let mut bb = Aabb3::empty();
        for e in &self.edges {
            bb.include_box(&e.bounding_box());
        }
        bb
    }
}

// =============================================================================
// Faces, shells and solids
// =============================================================================

/// A surface, bounded by an outer wire or by its own parameter domain.
#[derive(Debug, Clone)]
pub struct Face {
    /// Underlying surface.
    pub surface: Box<dyn Surface>,
    /// Outer boundary; `None` means the natural bounds of the surface domain.
    pub outer: Option<Wire>,
}

impl Face {
    /// Face bounded by the surface's parameter domain.
    pub fn new(surface: Box<dyn Surface>) -> Self {
        Self {
            surface,
            outer: None,
        }
    }

    /// Face bounded by `wire`.
    pub fn with_boundary(surface: Box<dyn Surface>, wire: Wire) -> Self {
        Self {
            surface,
            outer: Some(wire),
        }
    }

    /// Apply an affine transform to the surface and its boundary.
    pub fn transformed(&self, t: &Transform) -> Self {
        Self {
            surface: self.surface.transform(t),
            outer: self.outer.as_ref().map(|w| w.transformed(t)),
        }
    }

    /// Bounding box, from the outer wire or from a grid over the domain.
    pub fn bounding_box(&self) -> Aabb3 {
        if let Some(wire) = &self.outer {
            return wire.bounding_box();
        }
        let ((u0, u1), (v0, v1)) = self.surface.domain();
        let n = 24;
        let mut bb = Aabb3::empty();
        for i in 0..=n {
            for j in 0..=n {
                let u = u0 + (u1 - u0) * i as f64 / n as f64;
                let v = v0 + (v1 - v0) * j as f64 / n as f64;
                bb.include_point(&self.surface.evaluate(Point2::new(u, v)));
            }
        }
        bb
    }
}

/// A connected set of faces.
#[derive(Debug, Clone, Default)]
pub struct Shell {
    /// Faces of the shell.
    pub faces: Vec<Face>,
}

/// A volume bounded by a closed shell.
#[derive(Debug, Clone)]
pub struct Solid {
    /// Outer shell.
    pub shell: Shell,
}

// =============================================================================
// Shape
// =============================================================================

/// Shape type enumeration for dispatch without borrowing the contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    /// Single edge.
    Edge,
    /// Chain of edges.
    Wire,
    /// Single face.
    Face,
    /// Set of faces.
    Shell,
    /// Closed volume.
    Solid,
    /// Group of shapes.
    Compound,
}

/// The contents of a shape.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// Single edge.
    Edge(Edge),
    /// Chain of edges.
    Wire(Wire),
    /// Single face.
    Face(Face),
    /// Set of faces.
    Shell(Shell),
    /// Closed volume.
    Solid(Solid),
    /// Group of shapes, each with its own placement.
    Compound(Vec<Shape>),
}

/// A placed shape.
#[derive(Debug, Clone)]
pub struct Shape {
    /// The contents, in local coordinates.
    pub kind: ShapeKind,
    /// Local-to-parent transform.
    pub placement: Transform,
}

impl Shape {
    /// Shape with identity placement.
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            placement: Transform::identity(),
        }
    }

    /// Edge shape.
    pub fn edge(edge: Edge) -> Self {
        Self::new(ShapeKind::Edge(edge))
    }

    /// Wire shape.
    pub fn wire(wire: Wire) -> Self {
        Self::new(ShapeKind::Wire(wire))
    }

    /// Face shape.
    pub fn face(face: Face) -> Self {
        Self::new(ShapeKind::Face(face))
    }

    /// Shell shape.
    pub fn shell(shell: Shell) -> Self {
        Self::new(ShapeKind::Shell(shell))
    }

    /// Solid shape.
    pub fn solid(solid: Solid) -> Self {
        Self::new(ShapeKind::Solid(solid))
    }

    /// Compound of `shapes`.
    pub fn compound(shapes: Vec<Shape>) -> Self {
        Self::new(ShapeKind::Compound(shapes))
    }

    /// Same contents with a different placement.
    pub fn with_placement(mut self, placement: Transform) -> Self {
        self.placement = placement;
        self
    }

    /// The type of this shape.
    pub fn shape_type(&self) -> ShapeType {
        match &self.kind {
            ShapeKind::Edge(_) => ShapeType::Edge,
            ShapeKind::Wire(_) => ShapeType::Wire,
            ShapeKind::Face(_) => ShapeType::Face,
            ShapeKind::Shell(_) => ShapeType::Shell,
            ShapeKind::Solid(_) => ShapeType::Solid,
            ShapeKind::Compound(_) => ShapeType::Compound,
        }
    }

    /// Apply `t` to the local geometry. The placement is unchanged.
    pub fn transform_geometry(&self, t: &Transform) -> Self {
        let kind = match &self.kind {
            ShapeKind::Edge(e) => ShapeKind::Edge(e.transformed(t)),
            ShapeKind::Wire(w) => ShapeKind::Wire(w.transformed(t)),
            ShapeKind::Face(f) => ShapeKind::Face(f.transformed(t)),
            ShapeKind::Shell(s) => ShapeKind::Shell(transform_shell(s, t)),
            ShapeKind::Solid(s) => ShapeKind::Solid(Solid {
                shell: transform_shell(&s.shell, t),
            }),
            ShapeKind::Compound(children) => ShapeKind::Compound(
                children
                    .iter()
                    .map(|c| {
                        c.transform_geometry(&t.then(&c.placement))
                            .with_placement(Transform::identity())
                    })
                    .collect(),
            ),
        };
        Self {
            kind,
            placement: self.placement.clone(),
        }
    }

    /// Translate the local geometry by `v`. The placement is unchanged.
    pub fn translate(&self, v: &Vec3) -> Self {
        self.transform_geometry(&Transform::translation_vec(v))
    }

    /// Copy with the placement applied to the geometry and reset to identity.
    pub fn located(&self) -> Self {
        self.transform_geometry(&self.placement)
            .with_placement(Transform::identity())
    }

    /// All edges in world coordinates, in order.
    ///
    /// Faces contribute the edges of their outer wire; faces bounded by
    /// their parameter domain contribute none.
    pub fn edges(&self) -> Vec<Edge> {
        let mut out = Vec::new();
        collect_edges(&self.located().kind, &mut out);
        out
    }

    /// All faces in world coordinates.
    pub fn faces(&self) -> Vec<Face> {
        let mut out = Vec::new();
        collect_faces(&self.located().kind, &mut out);
        out
    }

    /// Axis-aligned bounding box in world coordinates.
    pub fn bounding_box(&self) -> Aabb3 {
        local_bounding_box(&self.located().kind)
    }
}

fn transform_shell(shell: &Shell, t: &Transform) -> Shell {
    Shell {
        faces: shell.faces.iter().map(|f| f.transformed(t)).collect(),
    }
}

fn collect_edges(kind: &ShapeKind, out: &mut Vec<Edge>) {
    let face_edges = |f: &Face, out: &mut Vec<Edge>| {
        if let Some(w) = &f.outer {
            out.extend(w.edges.iter().cloned());
        }
    };
    match kind {
        ShapeKind::Edge(e) => out.push(e.clone()),
        ShapeKind::Wire(w) => out.extend(w.edges.iter().cloned()),
        ShapeKind::Face(f) => face_edges(f, out),
        ShapeKind::Shell(s) => s.faces.iter().for_each(|f| face_edges(f, out)),
        ShapeKind::Solid(s) => s.shell.faces.iter().for_each(|f| face_edges(f, out)),
        ShapeKind::Compound(children) => {
            children.iter().for_each(|c| collect_edges(&c.kind, out))
        }
    }
}

fn collect_faces(kind: &ShapeKind, out: &mut Vec<Face>) {
    match kind {
        ShapeKind::Edge(_) | ShapeKind::Wire(_) => {}
        ShapeKind::Face(f) => out.push(f.clone()),
        ShapeKind::Shell(s) => out.extend(s.faces.iter().cloned()),
        ShapeKind::Solid(s) => out.extend(s.shell.faces.iter().cloned()),
        ShapeKind::Compound(children) => {
            children.iter().for_each(|c| collect_faces(&c.kind, out))
        }
    }
}

fn local_bounding_box(kind: &ShapeKind) -> Aabb3 {
    let mut bb = Aabb3::empty();
    match kind {
        ShapeKind::Edge(e) => bb.include_box(&e.bounding_box()),
        ShapeKind::Wire(w) => bb.include_box(&w.bounding_box()),
        ShapeKind::Face(f) => bb.include_box(&f.bounding_box()),
        ShapeKind::Shell(s) => s.faces.iter().for_each(|f| bb.include_box(&f.bounding_box())),
        ShapeKind::Solid(s) => s
            .shell
            .faces
            .iter()
            .for_each(|f| bb.include_box(&f.bounding_box())),
        ShapeKind::Compound(children) => children
            .iter()
            .for_each(|c| bb.include_box(&local_bounding_box(&c.kind))),
    }
    bb
}

/// Wire through `edges` in order.
pub fn make_wire(edges: Vec<Edge>) -> Wire {
    Wire::new(edges)
}

/// Compound of `shapes`.
pub fn make_compound(shapes: Vec<Shape>) -> Shape {
    Shape::compound(shapes)
}
