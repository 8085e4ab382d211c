//! Circuit element models.
//!
//! This module provides models for every element the host can place:
//! - Resistive: Wire, Resistor (and household items), LightBulb, SeriesAmmeter
//! - Sources: Battery, AC voltage
//! - Controls: Switch, Fuse
//! - Dynamic: Capacitor, Inductor
//!
//! Each element reports how it enters the nodal system through
//! [`CircuitElement::companion_model`].

mod controls;
mod linear;
mod reactive;
mod sources;

pub use controls::{Fuse, Switch};
pub use linear::{LightBulb, Resistor, ResistorType, SeriesAmmeter, Wire};
pub use reactive::{Capacitor, DynamicState, Inductor};
pub use sources::{AcVoltage, Battery};

use crate::circuit::{CurrentSense, ElementId, VertexId};

/// Floor for every resistance handed to the solver. Zero-resistance
/// elements are approximated by this value to keep the system non-singular.
pub const MINIMUM_RESISTANCE: f64 = 1e-8;

/// Default wire resistivity in ohm-meters.
pub const DEFAULT_RESISTIVITY: f64 = 1e-10;

/// Cross-sectional area of every wire in square meters.
pub const WIRE_CROSS_SECTIONAL_AREA: f64 = 1e-4;

/// Physical length of one view unit.
pub const METERS_PER_VIEW_COORDINATE: f64 = 0.0005;

/// Shortest path a charge can travel along.
pub const MINIMUM_PATH_LENGTH: f64 = 1e-6;

/// Type-specific parameters of a circuit element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Wire(Wire),
    Resistor(Resistor),
    Battery(Battery),
    AcVoltage(AcVoltage),
    Switch(Switch),
    Fuse(Fuse),
    Capacitor(Capacitor),
    Inductor(Inductor),
    LightBulb(LightBulb),
    SeriesAmmeter(SeriesAmmeter),
}

impl ElementKind {
    /// Human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Wire(_) => "Wire",
            ElementKind::Resistor(_) => "Resistor",
            ElementKind::Battery(_) => "Battery",
            ElementKind::AcVoltage(_) => "AcVoltage",
            ElementKind::Switch(_) => "Switch",
            ElementKind::Fuse(_) => "Fuse",
            ElementKind::Capacitor(_) => "Capacitor",
            ElementKind::Inductor(_) => "Inductor",
            ElementKind::LightBulb(_) => "LightBulb",
            ElementKind::SeriesAmmeter(_) => "SeriesAmmeter",
        }
    }
}

/// How an element enters the nodal system for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompanionModel {
    /// Two-terminal resistance (before the minimum-resistance clamp)
    Resistive { resistance: f64 },
    /// Voltage source raising the potential from start to end
    Source {
        voltage: f64,
        internal_resistance: f64,
    },
    Capacitive {
        capacitance: f64,
        state: DynamicState,
    },
    Inductive {
        inductance: f64,
        state: DynamicState,
    },
    /// Carries no current and blocks traversal
    Open,
}

/// An element placed between two distinct vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitElement {
    pub id: ElementId,
    pub start: VertexId,
    pub end: VertexId,
    pub kind: ElementKind,
    /// Time-averaged current from start to end over the last step
    pub current: f64,
    pub current_sense: CurrentSense,
    /// Length of the path charges travel along, in view units
    pub charge_path_length: f64,
    /// Whether the host may cut or drag it
    pub interactive: bool,
    pub(crate) charge_layout_dirty: bool,
}

impl CircuitElement {
    /// Create a new element with no current.
    pub fn new(id: ElementId, start: VertexId, end: VertexId, kind: ElementKind) -> Self {
        Self {
            id,
            start,
            end,
            kind,
            current: 0.0,
            current_sense: CurrentSense::Unspecified,
            charge_path_length: MINIMUM_PATH_LENGTH,
            interactive: true,
            charge_layout_dirty: true,
        }
    }

    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.start == vertex || self.end == vertex
    }

    /// The terminal across the element from `vertex`.
    pub fn opposite_vertex(&self, vertex: VertexId) -> Option<VertexId> {
        if vertex == self.start {
            Some(self.end)
        } else if vertex == self.end {
            Some(self.start)
        } else {
            None
        }
    }

    /// Re-attach the terminal on `old` to `new`.
    pub fn replace_vertex(&mut self, old: VertexId, new: VertexId) {
        if self.start == old {
            self.start = new;
        } else if self.end == old {
            self.end = new;
        }
        self.charge_layout_dirty = true;
    }

    /// Whether `distance` lies on the charge path.
    pub fn contains_distance(&self, distance: f64) -> bool {
        (0.0..=self.charge_path_length).contains(&distance)
    }

    /// Update geometry after a terminal moved. Wires follow with their resistance.
    pub fn set_length(&mut self, length: f64) {
        let length = length.max(MINIMUM_PATH_LENGTH);
        if (length - self.charge_path_length).abs() > f64::EPSILON {
            self.charge_layout_dirty = true;
        }
        self.charge_path_length = length;
        if let ElementKind::Wire(wire) = &mut self.kind {
            wire.update_resistance(length);
        }
    }

    /// Open switches and tripped fuses cannot be crossed.
    pub fn is_traversable(&self) -> bool {
        !matches!(self.companion_model(), CompanionModel::Open)
    }

    /// Elements that can drive current around a loop.
    pub fn is_energy_source(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Battery(_)
                | ElementKind::AcVoltage(_)
                | ElementKind::Capacitor(_)
                | ElementKind::Inductor(_)
        )
    }

    /// Everything except wires keeps its length when dragged.
    pub fn is_fixed_length(&self) -> bool {
        !matches!(self.kind, ElementKind::Wire(_))
    }

    /// Whether an ammeter probe can read this element.
    pub fn is_probeable(&self) -> bool {
        match &self.kind {
            ElementKind::Wire(_) => true,
            ElementKind::Resistor(r) => r.resistor_type.is_metallic(),
            _ => false,
        }
    }

    /// Stamp shape for the nodal system.
    pub fn companion_model(&self) -> CompanionModel {
        match &self.kind {
            ElementKind::Wire(w) => CompanionModel::Resistive {
                resistance: w.resistance,
            },
            ElementKind::Resistor(r) => CompanionModel::Resistive {
                resistance: r.resistance,
            },
            ElementKind::LightBulb(b) => CompanionModel::Resistive {
                resistance: b.resistance,
            },
            ElementKind::SeriesAmmeter(_) => CompanionModel::Resistive { resistance: 0.0 },
            ElementKind::Switch(s) if s.closed => CompanionModel::Resistive { resistance: 0.0 },
            ElementKind::Switch(_) => CompanionModel::Open,
            ElementKind::Fuse(f) if f.tripped => CompanionModel::Open,
            ElementKind::Fuse(f) => CompanionModel::Resistive {
                resistance: f.resistance,
            },
            ElementKind::Battery(b) => CompanionModel::Source {
                voltage: b.voltage,
                internal_resistance: b.internal_resistance,
            },
            ElementKind::AcVoltage(ac) => CompanionModel::Source {
                voltage: ac.voltage,
                internal_resistance: ac.internal_resistance,
            },
            ElementKind::Capacitor(c) => CompanionModel::Capacitive {
                capacitance: c.capacitance,
                state: c.state,
            },
            ElementKind::Inductor(l) => CompanionModel::Inductive {
                inductance: l.inductance,
                state: l.state,
            },
        }
    }

    /// Store the companion state computed by the transient engine.
    pub(crate) fn set_dynamic_state(&mut self, new_state: DynamicState) {
        match &mut self.kind {
            ElementKind::Capacitor(c) => c.state = new_state,
            ElementKind::Inductor(l) => l.state = new_state,
            _ => {}
        }
    }

    /// Clear stored charge or field. No-op for other elements.
    pub fn clear_dynamics(&mut self) {
        match &mut self.kind {
            ElementKind::Capacitor(c) => c.clear(),
            ElementKind::Inductor(l) => l.clear(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(kind: ElementKind) -> CircuitElement {
        CircuitElement::new(ElementId(0), VertexId(1), VertexId(2), kind)
    }

    #[test]
    fn test_opposite_vertex() {
        let e = element(ElementKind::Wire(Wire::default()));
        assert_eq!(e.opposite_vertex(VertexId(1)), Some(VertexId(2)));
        assert_eq!(e.opposite_vertex(VertexId(2)), Some(VertexId(1)));
        assert_eq!(e.opposite_vertex(VertexId(3)), None);
    }

    #[test]
    fn test_open_elements_block_traversal() {
        assert!(!element(ElementKind::Switch(Switch::new(false))).is_traversable());
        assert!(element(ElementKind::Switch(Switch::new(true))).is_traversable());

        let mut fuse = Fuse::default();
        fuse.check(100.0);
        assert!(!element(ElementKind::Fuse(fuse)).is_traversable());
    }

    #[test]
    fn test_companion_models() {
        let battery = element(ElementKind::Battery(Battery::new(6.0)));
        assert!(matches!(
            battery.companion_model(),
            CompanionModel::Source { voltage, .. } if voltage == 6.0
        ));
        let ammeter = element(ElementKind::SeriesAmmeter(SeriesAmmeter));
        assert_eq!(
            ammeter.companion_model(),
            CompanionModel::Resistive { resistance: 0.0 }
        );
    }

    #[test]
    fn test_wire_length_updates_resistance() {
        let mut wire = element(ElementKind::Wire(Wire::new(1e-4)));
        wire.charge_layout_dirty = false;
        wire.set_length(100.0);
        assert!(wire.charge_layout_dirty);
        match wire.companion_model() {
            CompanionModel::Resistive { resistance } => assert!((resistance - 0.05).abs() < 1e-12),
            other => panic!("unexpected model {other:?}"),
        }
    }
}
