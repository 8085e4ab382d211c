//! Circuit topology, traversal and probes.
//!
//! This module provides the live [`Circuit`]: it owns the vertices and
//! elements, accepts topology edits from the host, decides which elements
//! take part in each solve and writes solved values back for rendering.

mod config;
mod graph;
mod probe;
mod search;
mod senses;
mod types;
mod validate;
mod vertex;

pub use config::{CircuitConfig, DEFAULT_BATTERY_CURRENT_THRESHOLD, DEFAULT_SEED};
pub use graph::{Circuit, CircuitEvent};
pub use probe::VoltageConnection;
pub use types::*;
pub use validate::{validate_circuit, validate_element};
pub use vertex::Vertex;
