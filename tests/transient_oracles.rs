//! Transient responses checked against closed-form solutions.

use approx::assert_relative_eq;
use circuit_kit_core::circuit::{ElementId, NodeId, Point, VertexId};
use circuit_kit_core::components::{Battery, Capacitor, DynamicState, ElementKind, Inductor, Resistor};
use circuit_kit_core::solver::{
    LtaCapacitor, LtaCircuit, LtaInductor, MnaResistor, MnaVoltageSource, TimestepSubdivisions,
};
use circuit_kit_core::{Circuit, DEFAULT_FRAME_DT};

const STEPS: usize = 250;
const TOLERANCE: f64 = 1e-2;

fn n(i: usize) -> NodeId {
    NodeId(i)
}

fn capacitor(node0: usize, node1: usize, capacitance: f64) -> LtaCapacitor {
    LtaCapacitor {
        node0: n(node0),
        node1: n(node1),
        capacitance,
        state: DynamicState::default(),
    }
}

/// Source 0 -> 1, resistor 1 -> 2, then the given capacitors closing the
/// loop back to node 0.
fn rc_network(voltage: f64, resistance: f64, capacitors: Vec<LtaCapacitor>) -> LtaCircuit {
    LtaCircuit::new(
        vec![MnaResistor::new(n(1), n(2), resistance)],
        vec![MnaVoltageSource::new(n(0), n(1), voltage, 0.0)],
        capacitors,
        vec![],
    )
}

/// Step `circuit` frame by frame, checking `observe` against `expected(t)`.
fn check_against(
    mut circuit: LtaCircuit,
    observe: impl Fn(&LtaCircuit) -> f64,
    expected: impl Fn(f64) -> f64,
) {
    let driver = TimestepSubdivisions::default();
    for step in 1..=STEPS {
        let result = circuit
            .solve_with_subdivisions(&driver, DEFAULT_FRAME_DT)
            .unwrap();
        assert_relative_eq!(result.total_time(), DEFAULT_FRAME_DT, max_relative = 1e-12);
        circuit = result.final_state().unwrap().circuit.clone();

        let t = step as f64 * DEFAULT_FRAME_DT;
        assert_relative_eq!(observe(&circuit), expected(t), max_relative = TOLERANCE);
    }
}

fn check_rc(voltage: f64, resistance: f64, capacitance: f64) {
    check_against(
        rc_network(voltage, resistance, vec![capacitor(2, 0, capacitance)]),
        |c| c.capacitors[0].state.voltage,
        |t| voltage * (1.0 - (-t / (resistance * capacitance)).exp()),
    );
}

fn check_rl(voltage: f64, resistance: f64, inductance: f64) {
    let circuit = LtaCircuit::new(
        vec![MnaResistor::new(n(1), n(2), resistance)],
        vec![MnaVoltageSource::new(n(0), n(1), voltage, 0.0)],
        vec![],
        vec![LtaInductor {
            node0: n(2),
            node1: n(0),
            inductance,
            state: DynamicState::default(),
        }],
    );
    check_against(
        circuit,
        |c| c.inductors[0].state.current,
        |t| voltage / resistance * (1.0 - (-t * resistance / inductance).exp()),
    );
}

#[test]
fn test_rc_charging() {
    for (voltage, resistance, capacitance) in [
        (9.0, 9.0, 1e-2),
        (5.0, 10.0, 1e-2),
        (10.0, 10.0, 1e-2),
        (3.0, 7.0, 0.1),
        (3.0, 7.0, 100.0),
    ] {
        check_rc(voltage, resistance, capacitance);
    }
}

#[test]
fn test_rl_rise() {
    for (voltage, resistance, inductance) in [
        (5.0, 10.0, 1.0),
        (3.0, 11.0, 2.5),
        (7.0, 13.0, 1e4),
        (7.0, 13.0, 0.1),
    ] {
        check_rl(voltage, resistance, inductance);
    }
}

#[test]
fn test_series_capacitors() {
    let (voltage, resistance, c1, c2) = (9.0, 10.0, 0.1, 0.2);
    let equivalent = 1.0 / (1.0 / c1 + 1.0 / c2);
    check_against(
        rc_network(voltage, resistance, vec![capacitor(2, 3, c1), capacitor(3, 0, c2)]),
        |c| c.capacitors.iter().map(|cap| cap.state.voltage).sum(),
        |t| voltage * (1.0 - (-t / (resistance * equivalent)).exp()),
    );
}

#[test]
fn test_parallel_capacitors() {
    let (voltage, resistance, c1, c2) = (9.0, 10.0, 0.1, 0.2);
    check_against(
        rc_network(voltage, resistance, vec![capacitor(2, 0, c1), capacitor(2, 0, c2)]),
        |c| c.capacitors[0].state.voltage,
        |t| voltage * (1.0 - (-t / (resistance * (c1 + c2))).exp()),
    );
}

/// Battery, resistor and `element` around a square, closed by a wire.
fn live_loop(voltage: f64, resistance: f64, element: ElementKind) -> (Circuit, ElementId) {
    let mut circuit = Circuit::new();
    let v: Vec<VertexId> = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]
        .iter()
        .map(|&(x, y)| circuit.create_vertex(Point::new(x, y)))
        .collect();
    let battery = Battery::new(voltage).with_internal_resistance(0.0);
    circuit
        .add_element(v[0], v[1], ElementKind::Battery(battery))
        .unwrap();
    circuit
        .add_element(v[1], v[2], ElementKind::Resistor(Resistor::new(resistance)))
        .unwrap();
    let id = circuit.add_element(v[2], v[3], element).unwrap();
    circuit.add_wire(v[3], v[0]).unwrap();
    (circuit, id)
}

#[test]
fn test_live_circuit_rc() {
    let (voltage, resistance, capacitance) = (5.0, 10.0, 1e-2);
    let (mut circuit, cap) = live_loop(
        voltage,
        resistance,
        ElementKind::Capacitor(Capacitor::new(capacitance)),
    );
    for _ in 0..STEPS {
        circuit.step(DEFAULT_FRAME_DT);
        let expected = voltage * (1.0 - (-circuit.time() / (resistance * capacitance)).exp());
        assert_relative_eq!(
            circuit.element_voltage_drop(cap).unwrap(),
            expected,
            max_relative = TOLERANCE
        );
    }
}

#[test]
fn test_live_circuit_rl() {
    for (voltage, resistance, inductance) in [(5.0, 10.0, 1.0), (7.0, 13.0, 1e4)] {
        let (mut circuit, inductor) = live_loop(
            voltage,
            resistance,
            ElementKind::Inductor(Inductor::new(inductance)),
        );
        for _ in 0..STEPS {
            circuit.step(DEFAULT_FRAME_DT);
            let current = match &circuit.element(inductor).unwrap().kind {
                ElementKind::Inductor(l) => l.state.current,
                other => panic!("unexpected element {other:?}"),
            };
            let expected =
                voltage / resistance * (1.0 - (-circuit.time() * resistance / inductance).exp());
            assert_relative_eq!(current, expected, max_relative = TOLERANCE);
        }
    }
}

#[test]
fn test_clear_dynamics_discharges() {
    let (mut circuit, cap) = live_loop(9.0, 10.0, ElementKind::Capacitor(Capacitor::new(0.1)));
    for _ in 0..30 {
        circuit.step(DEFAULT_FRAME_DT);
    }
    assert!(circuit.element_voltage_drop(cap).unwrap() > 1.0);

    circuit.clear_dynamics();
    match &circuit.element(cap).unwrap().kind {
        ElementKind::Capacitor(c) => assert_eq!(c.state, DynamicState::default()),
        other => panic!("unexpected element {other:?}"),
    }
}
