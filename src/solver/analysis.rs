//! One solve of the live circuit.
//!
//! Builds a transient network from the elements taking part in the solve,
//! runs it over the frame, and writes currents, voltages and dynamic states
//! back onto the circuit. Elements outside the network get their vertex
//! voltages by walking out from solved vertices.

use std::collections::BTreeSet;

use log::{debug, warn};

use super::lta::{LtaCapacitor, LtaCircuit, LtaInductor, LtaState};
use super::mna::{MnaResistor, MnaVoltageSource};
use super::subdivision::{SubdivisionResult, TimestepSubdivisions};
use super::{clamp_magnitude, CURRENT_CONSERVATION_TOLERANCE};
use crate::circuit::{Circuit, ElementId, NodeId, VertexId};
use crate::components::{CompanionModel, DynamicState, ElementKind, LightBulb, MINIMUM_RESISTANCE};
use crate::error::Result;

/// Where an element landed in the transient network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Resistor(usize),
    Source(usize),
    Capacitor(usize),
    Inductor(usize),
}

impl Slot {
    /// Instantaneous element current in a solved sub-step.
    fn current(self, state: &LtaState) -> f64 {
        let Some(solution) = &state.solution else {
            return 0.0;
        };
        match self {
            Slot::Resistor(k) => solution.resistor_current(k),
            Slot::Source(k) => solution.source_current(k),
            Slot::Capacitor(k) => solution.capacitor(k).map_or(0.0, |s| s.current),
            Slot::Inductor(k) => solution.inductor(k).map_or(0.0, |s| s.current),
        }
    }
}

/// The participating part of a circuit as solver primitives.
struct Network {
    lta: LtaCircuit,
    slots: Vec<(ElementId, Slot)>,
    /// Internal resistance of each source, used by the second pass
    internal_resistances: Vec<f64>,
}

impl Network {
    fn build(circuit: &Circuit, participants: &BTreeSet<ElementId>) -> Self {
        let mut lta = LtaCircuit::default().with_method(circuit.config.integration_method);
        let mut slots = Vec::with_capacity(participants.len());
        let mut internal_resistances = Vec::new();

        for element in participants.iter().filter_map(|id| circuit.elements.get(id)) {
            let node0 = NodeId::from(element.start);
            let node1 = NodeId::from(element.end);
            let slot = match element.companion_model() {
                CompanionModel::Resistive { resistance } => {
                    // Zero-resistance elements are approximated by a tiny one
                    let resistance = resistance.max(MINIMUM_RESISTANCE);
                    lta.resistors.push(MnaResistor::new(node0, node1, resistance));
                    Slot::Resistor(lta.resistors.len() - 1)
                }
                CompanionModel::Source {
                    voltage,
                    internal_resistance,
                } => {
                    // First pass treats every source as ideal
                    lta.sources.push(MnaVoltageSource::new(node0, node1, voltage, 0.0));
                    internal_resistances.push(internal_resistance);
                    Slot::Source(lta.sources.len() - 1)
                }
                CompanionModel::Capacitive { capacitance, state } => {
                    lta.capacitors.push(LtaCapacitor {
                        node0,
                        node1,
                        capacitance,
                        state,
                    });
                    Slot::Capacitor(lta.capacitors.len() - 1)
                }
                CompanionModel::Inductive { inductance, state } => {
                    lta.inductors.push(LtaInductor {
                        node0,
                        node1,
                        inductance,
                        state,
                    });
                    Slot::Inductor(lta.inductors.len() - 1)
                }
                CompanionModel::Open => continue,
            };
            slots.push((element.id, slot));
        }

        Self {
            lta,
            slots,
            internal_resistances,
        }
    }
}

/// Solved values ready to be written back.
struct Outcome {
    result: SubdivisionResult<LtaState>,
    /// Filament resistances of real bulbs from the first pass
    bulb_resistances: Vec<(ElementId, f64)>,
}

/// Solve the network, then redo it once with corrected resistances if a
/// source draws more than `threshold` or a real bulb heats up.
fn solve_network(
    circuit: &Circuit,
    network: &mut Network,
    driver: &TimestepSubdivisions,
    dt: f64,
) -> Result<Outcome> {
    let first = network.lta.solve_with_subdivisions(driver, dt)?;
    let threshold = circuit.config.battery_current_threshold;
    let mut needs_second_pass = false;

    for (id, slot) in &network.slots {
        let Slot::Source(k) = *slot else {
            continue;
        };
        let average = first.time_average(|state| slot.current(state));
        if average.abs() > threshold {
            debug!("{id} draws {average:.3e} A, re-solving with internal resistance");
            network.lta.sources[k].resistance = network.internal_resistances[k];
            needs_second_pass = true;
        }
    }

    let final_solution = first.final_state().and_then(|s| s.solution.as_ref());
    let mut bulb_resistances = Vec::new();
    for (id, slot) in &network.slots {
        let Slot::Resistor(k) = *slot else {
            continue;
        };
        let is_real_bulb = circuit
            .elements
            .get(id)
            .is_some_and(|e| matches!(&e.kind, ElementKind::LightBulb(b) if b.real));
        if !is_real_bulb {
            continue;
        }
        let resistor = network.lta.resistors[k];
        let drop = final_solution.map_or(0.0, |s| s.voltage_drop(resistor.node0, resistor.node1));
        let resistance = LightBulb::hot_resistance(drop);
        network.lta.resistors[k].resistance = resistance.max(MINIMUM_RESISTANCE);
        bulb_resistances.push((*id, resistance));
        needs_second_pass = true;
    }

    if !needs_second_pass {
        return Ok(Outcome {
            result: first,
            bulb_resistances,
        });
    }

    let result = match network.lta.solve_with_subdivisions(driver, dt) {
        Ok(second) => second,
        Err(e) => {
            warn!("second pass failed ({e}), keeping the first");
            first
        }
    };
    Ok(Outcome {
        result,
        bulb_resistances,
    })
}

/// Solve `circuit` over a frame of `dt` seconds and store the results on its
/// elements and vertices. Never fails: an unsolvable frame leaves every
/// element without current.
pub(crate) fn solve_circuit(circuit: &mut Circuit, dt: f64) {
    let participants = circuit.participants();
    let mut network = Network::build(circuit, &participants);
    let driver = circuit.config.subdivisions();

    let outcome = match solve_network(circuit, &mut network, &driver, dt) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!("circuit solve failed: {e}");
            None
        }
    };

    let final_state = outcome
        .as_ref()
        .and_then(|o| o.result.final_state())
        .cloned();
    if final_state
        .as_ref()
        .and_then(|s| s.solution.as_ref())
        .is_some_and(|s| s.degraded())
    {
        warn!("circuit solved by least squares, results are approximate");
    }

    match &outcome {
        Some(outcome) => write_back(circuit, &network, outcome, final_state.as_ref()),
        None => {
            for element in circuit.elements.values_mut() {
                element.current = 0.0;
            }
        }
    }

    for element in circuit.elements.values_mut() {
        if participants.contains(&element.id) {
            continue;
        }
        element.current = 0.0;
        match &mut element.kind {
            ElementKind::LightBulb(bulb) => bulb.cool_down(),
            // An inductor off every live loop has no current to remember
            ElementKind::Inductor(inductor) => inductor.clear(),
            _ => {}
        }
    }

    let solved = assign_solved_voltages(circuit, final_state.as_ref());
    propagate_voltages(circuit, &solved);
    conserve_currents(circuit, &participants, &solved);
}

fn write_back(
    circuit: &mut Circuit,
    network: &Network,
    outcome: &Outcome,
    final_state: Option<&LtaState>,
) {
    for &(id, slot) in &network.slots {
        let average = outcome.result.time_average(|state| slot.current(state));
        let dynamic_state = final_state.and_then(|s| match slot {
            Slot::Capacitor(k) => s.circuit.capacitors.get(k).map(|c| c.state),
            Slot::Inductor(k) => s.circuit.inductors.get(k).map(|l| l.state),
            _ => None,
        });

        let Some(element) = circuit.elements.get_mut(&id) else {
            continue;
        };
        element.current = clamp_magnitude("current", average);
        if let Some(state) = dynamic_state {
            element.set_dynamic_state(DynamicState {
                voltage: clamp_magnitude("voltage", state.voltage),
                current: clamp_magnitude("current", state.current),
            });
        }
    }

    for &(id, resistance) in &outcome.bulb_resistances {
        if let Some(ElementKind::LightBulb(bulb)) = circuit.elements.get_mut(&id).map(|e| &mut e.kind)
        {
            bulb.resistance = resistance;
        }
    }
}

/// Copy node voltages onto vertices; vertices outside the solution read 0 V
/// until propagation reaches them. Returns the solved vertices.
fn assign_solved_voltages(circuit: &mut Circuit, final_state: Option<&LtaState>) -> BTreeSet<VertexId> {
    let solution = final_state.and_then(|s| s.solution.as_ref());
    let mut solved = BTreeSet::new();
    for vertex in circuit.vertices.values_mut() {
        match solution.and_then(|s| s.node_voltage(NodeId::from(vertex.id))) {
            Some(voltage) => {
                vertex.voltage = clamp_magnitude("voltage", voltage);
                solved.insert(vertex.id);
            }
            None => vertex.voltage = 0.0,
        }
    }
    solved
}

/// Walk out from solved vertices across traversable elements, inferring
/// each unsolved vertex's voltage from its neighbour. Components with no
/// solved vertex start from 0 V at their lowest vertex.
fn propagate_voltages(circuit: &mut Circuit, solved: &BTreeSet<VertexId>) {
    let roots: Vec<VertexId> = solved
        .iter()
        .copied()
        .chain(circuit.vertices.keys().copied().filter(|v| !solved.contains(v)))
        .collect();
    let mut visited = solved.clone();

    for root in roots {
        if !solved.contains(&root) && !visited.insert(root) {
            continue;
        }
        let mut stack = vec![root];
        while let Some(vertex) = stack.pop() {
            let voltage = circuit.vertices.get(&vertex).map_or(0.0, |v| v.voltage);
            for element in circuit.elements.values() {
                if !element.is_traversable() {
                    continue;
                }
                let Some(opposite) = element.opposite_vertex(vertex) else {
                    continue;
                };
                if visited.contains(&opposite) {
                    continue;
                }
                let sign = if vertex == element.start { 1.0 } else { -1.0 };
                let opposite_voltage = match element.companion_model() {
                    CompanionModel::Resistive { .. } | CompanionModel::Inductive { .. } => voltage,
                    CompanionModel::Source { voltage: emf, .. } => voltage + sign * emf,
                    CompanionModel::Capacitive { state, .. } => voltage - sign * state.voltage,
                    CompanionModel::Open => continue,
                };
                if let Some(v) = circuit.vertices.get_mut(&opposite) {
                    v.voltage = clamp_magnitude("voltage", opposite_voltage);
                }
                visited.insert(opposite);
                stack.push(opposite);
            }
        }
    }
}

/// Net current flowing into `vertex` through `ids`.
fn inflow(circuit: &Circuit, vertex: VertexId, ids: &[ElementId]) -> f64 {
    ids.iter()
        .filter_map(|id| circuit.elements.get(id))
        .map(|e| if e.end == vertex { e.current } else { -e.current })
        .sum()
}

/// Remove residual KCL error left by averaging and clamping. Vertices are
/// balanced children first along a depth-first tree of participating
/// elements; each one spreads its residual over the incident elements
/// nobody has balanced yet and then locks them.
fn conserve_currents(
    circuit: &mut Circuit,
    participants: &BTreeSet<ElementId>,
    solved: &BTreeSet<VertexId>,
) {
    let mut locked: BTreeSet<ElementId> = circuit
        .elements
        .keys()
        .copied()
        .filter(|id| !participants.contains(id))
        .collect();

    let roots: Vec<VertexId> = solved
        .iter()
        .copied()
        .chain(circuit.vertices.keys().copied().filter(|v| !solved.contains(v)))
        .collect();
    let mut visited = BTreeSet::new();

    for root in roots {
        if !visited.insert(root) {
            continue;
        }
        let mut preorder = Vec::new();
        let mut stack = vec![root];
        while let Some(vertex) = stack.pop() {
            preorder.push(vertex);
            for element in circuit.elements.values() {
                if !participants.contains(&element.id) {
                    continue;
                }
                if let Some(opposite) = element.opposite_vertex(vertex) {
                    if visited.insert(opposite) {
                        stack.push(opposite);
                    }
                }
            }
        }

        for vertex in preorder.into_iter().rev() {
            let incident = circuit.neighbor_elements(vertex);
            let residual = inflow(circuit, vertex, &incident);
            if residual.abs() > CURRENT_CONSERVATION_TOLERANCE {
                let unlocked: Vec<ElementId> = incident
                    .iter()
                    .copied()
                    .filter(|id| !locked.contains(id))
                    .collect();
                if !unlocked.is_empty() {
                    let share = residual / unlocked.len() as f64;
                    for id in unlocked {
                        if let Some(element) = circuit.elements.get_mut(&id) {
                            let sign = if element.end == vertex { 1.0 } else { -1.0 };
                            element.current -= sign * share;
                        }
                    }
                }
            }
            locked.extend(incident);
        }
    }
}
