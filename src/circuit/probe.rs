//! Meter probes.

use super::graph::Circuit;
use super::types::{ElementId, VertexId};
use crate::components::ElementKind;

/// A point touched by a voltmeter probe: the vertex it is electrically at,
/// and the voltage read there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageConnection {
    pub vertex: VertexId,
    pub voltage: f64,
}

impl Circuit {
    /// Probe placed directly on a vertex.
    pub fn connection_at_vertex(&self, vertex: VertexId) -> Option<VoltageConnection> {
        self.vertices.get(&vertex).map(|v| VoltageConnection {
            vertex,
            voltage: v.voltage,
        })
    }

    /// Probe placed `distance` along a wire or metallic element. The voltage
    /// is interpolated between the terminals; the connection belongs to the
    /// nearer terminal.
    pub fn connection_on_element(&self, id: ElementId, distance: f64) -> Option<VoltageConnection> {
        let element = self.elements.get(&id).filter(|e| e.is_probeable())?;
        let start = self.vertices.get(&element.start)?;
        let end = self.vertices.get(&element.end)?;

        let t = (distance / element.charge_path_length).clamp(0.0, 1.0);
        Some(VoltageConnection {
            vertex: if t < 0.5 { start.id } else { end.id },
            voltage: start.voltage + (end.voltage - start.voltage) * t,
        })
    }

    /// Voltmeter reading `red - black`, or `None` when either probe is
    /// off the circuit or the two points are not electrically connected.
    pub fn voltage_between_connections(
        &self,
        red: Option<VoltageConnection>,
        black: Option<VoltageConnection>,
    ) -> Option<f64> {
        let (red, black) = (red?, black?);
        self.are_vertices_electrically_connected(red.vertex, black.vertex)
            .then(|| red.voltage - black.voltage)
    }

    /// Ammeter reading for a probe on a wire, metallic item or series
    /// ammeter, with the element's sense applied.
    pub fn ammeter_reading(&self, id: ElementId) -> Option<f64> {
        let element = self.elements.get(&id)?;
        let readable =
            element.is_probeable() || matches!(element.kind, ElementKind::SeriesAmmeter(_));
        readable.then(|| element.current_sense.apply(element.current))
    }
}
