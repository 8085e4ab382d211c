//! Linear transient analysis.
//!
//! Capacitors and inductors are replaced for one step by companion models:
//!
//! ```text
//! capacitor:  G = k*C/dt in parallel with I_hist = G*v_old (+ i_old)
//! inductor:   source E = r*i_old (+ v_old) in series with r = k*L/dt
//! ```
//!
//! with k = 1 for backward Euler and k = 2 (plus the bracketed terms) for
//! the trapezoidal rule.

use super::mna::{MnaCircuit, MnaCurrent, MnaResistor, MnaSolution, MnaVoltageSource};
use super::subdivision::{Steppable, SubdivisionResult, TimestepSubdivisions};
use crate::circuit::NodeId;
use crate::components::DynamicState;
use crate::error::{CircuitError, Result};

/// Companion-model integration rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationMethod {
    /// First-order implicit; never rings
    #[default]
    BackwardEuler,
    /// Second-order; needs consistent initial conditions
    Trapezoidal,
}

impl IntegrationMethod {
    fn factor(self) -> f64 {
        match self {
            Self::BackwardEuler => 1.0,
            Self::Trapezoidal => 2.0,
        }
    }
}

/// A capacitor between two nodes with its state from the previous step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LtaCapacitor {
    pub node0: NodeId,
    pub node1: NodeId,
    pub capacitance: f64,
    pub state: DynamicState,
}

/// An inductor between two nodes with its state from the previous step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LtaInductor {
    pub node0: NodeId,
    pub node1: NodeId,
    pub inductance: f64,
    pub state: DynamicState,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LtaCircuit {
    pub resistors: Vec<MnaResistor>,
    pub sources: Vec<MnaVoltageSource>,
    pub capacitors: Vec<LtaCapacitor>,
    pub inductors: Vec<LtaInductor>,
    pub method: IntegrationMethod,
}

impl LtaCircuit {
    pub fn new(
        resistors: Vec<MnaResistor>,
        sources: Vec<MnaVoltageSource>,
        capacitors: Vec<LtaCapacitor>,
        inductors: Vec<LtaInductor>,
    ) -> Self {
        Self {
            resistors,
            sources,
            capacitors,
            inductors,
            method: IntegrationMethod::default(),
        }
    }

    pub fn with_method(mut self, method: IntegrationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn has_dynamic_elements(&self) -> bool {
        !self.capacitors.is_empty() || !self.inductors.is_empty()
    }

    /// Conductance and history current of a capacitor companion.
    fn capacitor_companion(&self, c: &LtaCapacitor, dt: f64) -> (f64, f64) {
        let g = self.method.factor() * c.capacitance / dt;
        let history = match self.method {
            IntegrationMethod::BackwardEuler => g * c.state.voltage,
            IntegrationMethod::Trapezoidal => g * c.state.voltage + c.state.current,
        };
        (g, history)
    }

    /// Resistance and source voltage of an inductor companion.
    fn inductor_companion(&self, l: &LtaInductor, dt: f64) -> (f64, f64) {
        let r = self.method.factor() * l.inductance / dt;
        let voltage = match self.method {
            IntegrationMethod::BackwardEuler => r * l.state.current,
            IntegrationMethod::Trapezoidal => r * l.state.current + l.state.voltage,
        };
        (r, voltage)
    }

    /// The resistive network equivalent to this circuit over one step.
    /// Companion resistors and sources follow the originals.
    pub fn companion_circuit(&self, dt: f64) -> MnaCircuit {
        let mut resistors = self.resistors.clone();
        let mut sources = self.sources.clone();
        let mut currents = Vec::with_capacity(self.capacitors.len());

        for c in &self.capacitors {
            let (g, history) = self.capacitor_companion(c, dt);
            resistors.push(MnaResistor::new(c.node0, c.node1, 1.0 / g));
            currents.push(MnaCurrent::new(c.node1, c.node0, history));
        }
        for l in &self.inductors {
            let (r, voltage) = self.inductor_companion(l, dt);
            sources.push(MnaVoltageSource::new(l.node0, l.node1, voltage, r));
        }

        MnaCircuit::new(resistors, sources, currents)
    }

    /// Solve one step of `dt` and compute the new dynamic states.
    pub fn solve_propagate(&self, dt: f64) -> Result<LtaSolution> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(CircuitError::InvalidSimulationParam {
                message: format!("timestep must be positive, got {dt}"),
            });
        }

        let mna = self.companion_circuit(dt).solve()?;

        let capacitors = self
            .capacitors
            .iter()
            .map(|c| {
                let (g, history) = self.capacitor_companion(c, dt);
                let voltage = mna.voltage_drop(c.node0, c.node1);
                DynamicState {
                    voltage,
                    current: g * voltage - history,
                }
            })
            .collect();

        let base = self.sources.len();
        let inductors = self
            .inductors
            .iter()
            .enumerate()
            .map(|(k, l)| DynamicState {
                voltage: mna.voltage_drop(l.node0, l.node1),
                current: mna.source_current(base + k),
            })
            .collect();

        Ok(LtaSolution {
            mna,
            capacitors,
            inductors,
        })
    }

    /// This circuit carrying the dynamic states of `solution`.
    pub fn updated(&self, solution: &LtaSolution) -> Self {
        let mut next = self.clone();
        for (c, state) in next.capacitors.iter_mut().zip(&solution.capacitors) {
            c.state = *state;
        }
        for (l, state) in next.inductors.iter_mut().zip(&solution.inductors) {
            l.state = *state;
        }
        next
    }

    /// Advance by `dt` using adaptive sub-steps.
    pub fn solve_with_subdivisions(
        &self,
        driver: &TimestepSubdivisions,
        dt: f64,
    ) -> Result<SubdivisionResult<LtaState>> {
        driver.step(&LtaState::new(self.clone()), dt)
    }
}

/// Result of one transient step.
#[derive(Debug, Clone, PartialEq)]
pub struct LtaSolution {
    pub mna: MnaSolution,
    pub capacitors: Vec<DynamicState>,
    pub inductors: Vec<DynamicState>,
}

impl LtaSolution {
    pub fn node_voltage(&self, node: NodeId) -> Option<f64> {
        self.mna.node_voltage(node)
    }

    pub fn voltage_drop(&self, node0: NodeId, node1: NodeId) -> f64 {
        self.mna.voltage_drop(node0, node1)
    }

    /// Current through the i-th resistor of the circuit.
    pub fn resistor_current(&self, index: usize) -> f64 {
        self.mna.resistor_current(index)
    }

    /// Current through the i-th voltage source of the circuit.
    pub fn source_current(&self, index: usize) -> f64 {
        self.mna.source_current(index)
    }

    pub fn capacitor(&self, index: usize) -> Option<DynamicState> {
        self.capacitors.get(index).copied()
    }

    pub fn inductor(&self, index: usize) -> Option<DynamicState> {
        self.inductors.get(index).copied()
    }

    pub fn degraded(&self) -> bool {
        self.mna.degraded
    }
}

/// A circuit together with the solution that produced its states.
#[derive(Debug, Clone, PartialEq)]
pub struct LtaState {
    pub circuit: LtaCircuit,
    pub solution: Option<LtaSolution>,
}

impl LtaState {
    pub fn new(circuit: LtaCircuit) -> Self {
        Self {
            circuit,
            solution: None,
        }
    }

    fn characteristic_currents(&self) -> impl Iterator<Item = f64> + '_ {
        self.circuit
            .capacitors
            .iter()
            .map(|c| c.state.current)
            .chain(self.circuit.inductors.iter().map(|l| l.state.current))
    }
}

impl Steppable for LtaState {
    fn update(&self, dt: f64) -> Result<Self> {
        let solution = self.circuit.solve_propagate(dt)?;
        Ok(Self {
            circuit: self.circuit.updated(&solution),
            solution: Some(solution),
        })
    }

    fn distance(&self, other: &Self) -> f64 {
        self.characteristic_currents()
            .zip(other.characteristic_currents())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    fn needs_subdivision(&self) -> bool {
        self.circuit.has_dynamic_elements()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn n(i: usize) -> NodeId {
        NodeId(i)
    }

    fn rc(voltage: f64, resistance: f64, capacitance: f64) -> LtaCircuit {
        LtaCircuit::new(
            vec![MnaResistor::new(n(1), n(2), resistance)],
            vec![MnaVoltageSource::new(n(0), n(1), voltage, 0.0)],
            vec![LtaCapacitor {
                node0: n(2),
                node1: n(0),
                capacitance,
                state: DynamicState::default(),
            }],
            vec![],
        )
    }

    fn rl(voltage: f64, resistance: f64, inductance: f64) -> LtaCircuit {
        LtaCircuit::new(
            vec![MnaResistor::new(n(1), n(2), resistance)],
            vec![MnaVoltageSource::new(n(0), n(1), voltage, 0.0)],
            vec![],
            vec![LtaInductor {
                node0: n(2),
                node1: n(0),
                inductance,
                state: DynamicState::default(),
            }],
        )
    }

    #[test]
    fn test_capacitor_single_step() {
        // v = V / (1 + R*C/dt) = 10 / 2
        let solution = rc(10.0, 1.0, 1.0).solve_propagate(1.0).unwrap();
        let cap = solution.capacitor(0).unwrap();
        assert_abs_diff_eq!(cap.voltage, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(cap.current, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.resistor_current(0), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.source_current(0), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inductor_single_step() {
        // I = V / (R + L/dt)
        let solution = rl(10.0, 2.0, 3.0).solve_propagate(1.0).unwrap();
        let ind = solution.inductor(0).unwrap();
        assert_abs_diff_eq!(ind.current, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ind.voltage, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_updated_carries_states() {
        let circuit = rc(10.0, 1.0, 1.0);
        let solution = circuit.solve_propagate(1.0).unwrap();
        let next = circuit.updated(&solution);
        assert_abs_diff_eq!(next.capacitors[0].state.voltage, 5.0, epsilon = 1e-9);

        // Second step: v = (V*dt/R + C*v_old/dt) / (1/R + C/dt) = 7.5
        let second = next.solve_propagate(1.0).unwrap();
        assert_abs_diff_eq!(second.capacitor(0).unwrap().voltage, 7.5, epsilon = 1e-9);
    }

    #[test]
    fn test_rc_charging_with_subdivisions() {
        let (v, r, c) = (5.0, 10.0, 0.01);
        let driver = TimestepSubdivisions::default();
        let dt = 1.0 / 60.0;
        let mut circuit = rc(v, r, c);
        for frame in 1..=60 {
            let result = circuit.solve_with_subdivisions(&driver, dt).unwrap();
            circuit = result.final_state().unwrap().circuit.clone();

            let t = frame as f64 * dt;
            let expected = v * (1.0 - (-t / (r * c)).exp());
            assert_abs_diff_eq!(circuit.capacitors[0].state.voltage, expected, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_trapezoidal_steady_state() {
        // Charged capacitor at the source voltage stays put
        let mut circuit = rc(6.0, 2.0, 0.5).with_method(IntegrationMethod::Trapezoidal);
        circuit.capacitors[0].state = DynamicState {
            voltage: 6.0,
            current: 0.0,
        };
        let solution = circuit.solve_propagate(0.1).unwrap();
        let cap = solution.capacitor(0).unwrap();
        assert_abs_diff_eq!(cap.voltage, 6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(cap.current, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_resistive_state_skips_subdivision() {
        let circuit = LtaCircuit::new(
            vec![MnaResistor::new(n(1), n(0), 4.0)],
            vec![MnaVoltageSource::new(n(0), n(1), 8.0, 0.0)],
            vec![],
            vec![],
        );
        let result = circuit
            .solve_with_subdivisions(&TimestepSubdivisions::default(), 1.0 / 60.0)
            .unwrap();
        assert_eq!(result.steps.len(), 1);
        let solution = result.final_state().unwrap().solution.as_ref().unwrap();
        assert_abs_diff_eq!(solution.source_current(0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        assert!(matches!(
            rc(1.0, 1.0, 1.0).solve_propagate(0.0),
            Err(CircuitError::InvalidSimulationParam { .. })
        ));
    }
}
