//! Junction points where element terminals meet.

use super::types::{Point, VertexId};

/// A junction in the circuit graph.
///
/// Owned by the [`Circuit`](super::Circuit); elements refer to vertices by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub position: Point,
    /// Solved voltage relative to the reference node of its component
    pub voltage: f64,
    /// Can be moved by the host
    pub draggable: bool,
    /// Can be joined to other vertices
    pub attachable: bool,
    /// Fixed boundary vertex that survives orphaning and cutting
    pub black_box_interface: bool,
    pub selected: bool,
}

impl Vertex {
    /// Create a free vertex at the given position.
    pub fn new(id: VertexId, position: Point) -> Self {
        Self {
            id,
            position,
            voltage: 0.0,
            draggable: true,
            attachable: true,
            black_box_interface: false,
            selected: false,
        }
    }

    /// Create a fixed boundary vertex.
    pub fn black_box_interface(id: VertexId, position: Point) -> Self {
        Self {
            draggable: false,
            black_box_interface: true,
            ..Self::new(id, position)
        }
    }
}
