//! Core types for circuit representation.

use std::fmt;

use nalgebra::Vector2;

/// A stable identifier for a vertex (junction) in the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// A stable identifier for a circuit element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// An abstract node in the nodal system.
///
/// Every vertex maps onto the node with the same index, so a solution can be
/// read back by vertex without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl From<VertexId> for NodeId {
    fn from(vertex: VertexId) -> Self {
        NodeId(vertex.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// A position, or an offset between positions, in view coordinates.
pub type Point = Vector2<f64>;

/// Offset of length `magnitude` along `angle` (radians).
pub fn polar(magnitude: f64, angle: f64) -> Point {
    Point::new(magnitude * angle.cos(), magnitude * angle.sin())
}

/// Direction of an offset in radians.
pub fn angle_of(offset: &Point) -> f64 {
    offset.y.atan2(offset.x)
}

/// Rendering direction label for an element's current.
///
/// The sense is chosen so neighbouring readouts agree; it carries no physics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrentSense {
    Forward,
    Backward,
    #[default]
    Unspecified,
}

impl CurrentSense {
    /// Sense under which `current` reads as positive.
    pub fn for_positive(current: f64) -> Self {
        if current < 0.0 {
            Self::Backward
        } else {
            Self::Forward
        }
    }

    /// Sense under which `current` reads as negative.
    pub fn for_negative(current: f64) -> Self {
        if current < 0.0 {
            Self::Forward
        } else {
            Self::Backward
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
            Self::Unspecified => Self::Unspecified,
        }
    }

    /// Apply the sense to a signed current.
    pub fn apply(self, current: f64) -> f64 {
        match self {
            Self::Backward => -current,
            Self::Forward | Self::Unspecified => current,
        }
    }
}

/// Which carrier the particle layer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrentType {
    /// Negative carriers moving against conventional current
    #[default]
    Electrons,
    /// Positive carriers moving with conventional current
    Conventional,
}

impl CurrentType {
    /// Charge sign of each particle.
    pub fn charge_sign(self) -> f64 {
        match self {
            Self::Electrons => -1.0,
            Self::Conventional => 1.0,
        }
    }
}
