#![warn(missing_docs)]

//! Curved arrays and segments built from rib curves.
//!
//! A curved array places scaled copies of a base shape between hull curves;
//! a curved segment blends ribs between two endpoint shapes. Either can skin
//! its ribs into a B-spline surface or solid, falling back to a loft where
//! the direct surface fit fails.
//!
//! The geometric steps are plain functions over a
//! [`GeometryKernel`](curved_kernel::GeometryKernel):
//! [`compute_extent`], [`build_surface_or_solid`], [`scale`],
//! [`curved_array`] and [`curved_segment`]. [`Document`] hosts them as
//! recomputable feature objects.
//!
//! # Example
//!
//! ```
//! use curved_shapes::{ArrayOptions, Document, ObjectStatus};
//! use curved_kernel::curved_kernel_math::Point3;
//! use curved_kernel::curved_kernel_topo::{make_wire, Edge, Shape};
//!
//! let p = |x: f64, y: f64| Point3::new(x, y, 0.0);
//! let square = Shape::wire(make_wire(vec![
//!     Edge::line(p(0.0, 0.0), p(2.0, 0.0)),
//!     Edge::line(p(2.0, 0.0), p(2.0, 2.0)),
//!     Edge::line(p(2.0, 2.0), p(0.0, 2.0)),
//!     Edge::line(p(0.0, 2.0), p(0.0, 0.0)),
//! ]));
//! let rail = |a: Point3, b: Point3| Shape::edge(Edge::line(a, b));
//!
//! let mut doc = Document::default();
//! let base = doc.add_shape("Base", square);
//! let h1 = doc.add_shape("Hull", rail(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 10.0)));
//! let h2 = doc.add_shape("Hull", rail(Point3::new(2.0, 2.0, 0.0), Point3::new(4.0, 4.0, 10.0)));
//!
//! let options = ArrayOptions { items: 5, solid: true, ..Default::default() };
//! let id = doc.make_curved_array(base, vec![h1, h2], options).unwrap();
//! assert_eq!(doc.get(id).unwrap().status, ObjectStatus::Valid);
//! ```

mod array;
mod config;
mod diagnostics;
mod document;
mod error;
mod extent;
mod interpolate;
mod rib;
mod scale;
mod segment;

pub use array::{
    curved_array, ArrayOptions, CurvedArrayParams, CurvedArrayViewProvider, CurvedArrayWorker,
};
pub use config::Settings;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use document::{
    Document, DocumentObject, FeatureOutput, FeatureWorker, ObjectId, ObjectStatus,
    RecomputeContext, ViewProvider,
};
pub use error::{CurvedError, Result};
pub use extent::{compute_extent, AxisMask, BoundingExtent};
pub use interpolate::{build_surface_or_solid, v_knots};
pub use rib::Rib;
pub use scale::{fit_to_extent, scale};
pub use segment::{
    curved_segment, CurvedSegmentParams, CurvedSegmentViewProvider, CurvedSegmentWorker,
    SegmentOptions,
};
