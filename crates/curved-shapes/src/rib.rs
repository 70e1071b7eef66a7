//! Ribs: ordered edge sets that act as cross-sections.

use curved_kernel::curved_kernel_math::Aabb3;
use curved_kernel::curved_kernel_topo::{make_wire, Edge, Shape};

/// One cross-section of an interpolation stack.
///
/// Edge `i` of every rib in a stack is expected to describe the same
/// feature curve. Edges are in world coordinates.
#[derive(Debug, Clone)]
pub struct Rib {
    /// Name used in diagnostics.
    pub name: String,
    /// Edges in order.
    pub edges: Vec<Edge>,
}

impl Rib {
    /// Rib from edges.
    pub fn new(name: impl Into<String>, edges: Vec<Edge>) -> Self {
        Self {
            name: name.into(),
            edges,
        }
    }

    /// Rib from all edges of `shape`, with the placement applied.
    pub fn from_shape(name: impl Into<String>, shape: &Shape) -> Self {
        Self::new(name, shape.edges())
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Bounding box of all edges.
    pub fn bounding_box(&self) -> Aabb3 {
        let mut bb = Aabb3::empty();
        for e in &self.edges {
            bb.include_box(&e.bounding_box());
        }
        bb
    }

    /// The edges as a wire shape.
    pub fn to_shape(&self) -> Shape {
        Shape::wire(make_wire(self.edges.clone()))
    }
}
