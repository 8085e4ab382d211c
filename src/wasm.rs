//! WASM bindings for Circuit Kit Core.
//!
//! This module provides JavaScript-friendly bindings for a browser renderer.
//! Ids cross the boundary as plain numbers and bulk queries come back as
//! flat arrays in id order.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCircuit } from 'circuit_kit_core';
//!
//! await init();
//!
//! const circuit = new WasmCircuit();
//! const a = circuit.add_vertex(0, 0);
//! const b = circuit.add_vertex(100, 0);
//! circuit.add_battery(a, b, 9);
//! circuit.add_resistor(b, a, 10);
//!
//! // Once per animation frame:
//! circuit.step(1 / 60);
//! const charges = circuit.charge_positions(); // [x, y, angle, sign, ...]
//! ```

use log::Level;
use wasm_bindgen::prelude::*;

use crate::circuit::{ElementId, Point, VertexId};
use crate::components::{
    AcVoltage, Battery, Capacitor, ElementKind, Fuse, Inductor, LightBulb, Resistor,
    SeriesAmmeter, Switch,
};
use crate::{Circuit, CircuitConfig};

/// Install the panic hook and route `log` output to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    let _ = console_log::init_with_level(Level::Info);
    console_error_panic_hook::set_once();
}

fn to_js(e: crate::CircuitError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-compatible handle on a live circuit.
#[wasm_bindgen]
pub struct WasmCircuit {
    circuit: Circuit,
}

impl WasmCircuit {
    fn add(&mut self, start: usize, end: usize, kind: ElementKind) -> Result<usize, JsValue> {
        self.circuit
            .add_element(VertexId(start), VertexId(end), kind)
            .map(|id| id.0)
            .map_err(to_js)
    }
}

impl Default for WasmCircuit {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmCircuit {
    /// Create an empty circuit with default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmCircuit {
        WasmCircuit {
            circuit: Circuit::new(),
        }
    }

    /// Create an empty circuit whose charge animation uses `seed`.
    #[wasm_bindgen]
    pub fn with_seed(seed: u64) -> Result<WasmCircuit, JsValue> {
        let circuit = Circuit::with_config(CircuitConfig::new().with_seed(seed)).map_err(to_js)?;
        Ok(WasmCircuit { circuit })
    }

    // ============ Topology ============

    #[wasm_bindgen]
    pub fn add_vertex(&mut self, x: f64, y: f64) -> usize {
        self.circuit.create_vertex(Point::new(x, y)).0
    }

    #[wasm_bindgen]
    pub fn add_wire(&mut self, start: usize, end: usize) -> Result<usize, JsValue> {
        self.circuit
            .add_wire(VertexId(start), VertexId(end))
            .map(|id| id.0)
            .map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn add_resistor(&mut self, start: usize, end: usize, ohms: f64) -> Result<usize, JsValue> {
        self.add(start, end, ElementKind::Resistor(Resistor::new(ohms)))
    }

    #[wasm_bindgen]
    pub fn add_battery(&mut self, start: usize, end: usize, volts: f64) -> Result<usize, JsValue> {
        self.add(start, end, ElementKind::Battery(Battery::new(volts)))
    }

    #[wasm_bindgen]
    pub fn add_ac_source(
        &mut self,
        start: usize,
        end: usize,
        amplitude: f64,
        frequency: f64,
    ) -> Result<usize, JsValue> {
        self.add(start, end, ElementKind::AcVoltage(AcVoltage::new(amplitude, frequency)))
    }

    #[wasm_bindgen]
    pub fn add_capacitor(&mut self, start: usize, end: usize, farads: f64) -> Result<usize, JsValue> {
        self.add(start, end, ElementKind::Capacitor(Capacitor::new(farads)))
    }

    #[wasm_bindgen]
    pub fn add_inductor(&mut self, start: usize, end: usize, henries: f64) -> Result<usize, JsValue> {
        self.add(start, end, ElementKind::Inductor(Inductor::new(henries)))
    }

    #[wasm_bindgen]
    pub fn add_switch(&mut self, start: usize, end: usize, closed: bool) -> Result<usize, JsValue> {
        self.add(start, end, ElementKind::Switch(Switch::new(closed)))
    }

    #[wasm_bindgen]
    pub fn add_fuse(&mut self, start: usize, end: usize, rating: f64) -> Result<usize, JsValue> {
        self.add(start, end, ElementKind::Fuse(Fuse::new(rating)))
    }

    /// Add a bulb; `real` bulbs heat up and ignore `ohms`.
    #[wasm_bindgen]
    pub fn add_light_bulb(
        &mut self,
        start: usize,
        end: usize,
        ohms: f64,
        real: bool,
    ) -> Result<usize, JsValue> {
        let bulb = if real {
            LightBulb::real()
        } else {
            LightBulb::new(ohms)
        };
        self.add(start, end, ElementKind::LightBulb(bulb))
    }

    #[wasm_bindgen]
    pub fn add_series_ammeter(&mut self, start: usize, end: usize) -> Result<usize, JsValue> {
        self.add(start, end, ElementKind::SeriesAmmeter(SeriesAmmeter))
    }

    #[wasm_bindgen]
    pub fn remove_element(&mut self, id: usize) -> Result<(), JsValue> {
        self.circuit.remove_element(ElementId(id)).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn move_vertex(&mut self, id: usize, x: f64, y: f64) -> Result<(), JsValue> {
        self.circuit
            .move_vertex(VertexId(id), Point::new(x, y))
            .map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn set_switch_closed(&mut self, id: usize, closed: bool) -> Result<(), JsValue> {
        self.circuit
            .set_switch_closed(ElementId(id), closed)
            .map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn reset_fuse(&mut self, id: usize) -> Result<(), JsValue> {
        self.circuit.reset_fuse(ElementId(id)).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn flip(&mut self, id: usize) -> Result<(), JsValue> {
        self.circuit.flip(ElementId(id)).map_err(to_js)
    }

    /// Split a vertex, returning the ids of the new vertices.
    #[wasm_bindgen]
    pub fn cut_vertex(&mut self, id: usize) -> Result<Vec<usize>, JsValue> {
        self.circuit
            .cut_vertex(VertexId(id))
            .map(|created| created.into_iter().map(|v| v.0).collect())
            .map_err(to_js)
    }

    /// Merge vertex `old` into `target`.
    #[wasm_bindgen]
    pub fn connect(&mut self, target: usize, old: usize) -> Result<(), JsValue> {
        self.circuit
            .connect(VertexId(target), VertexId(old))
            .map_err(to_js)
    }

    // ============ Simulation ============

    /// Advance one animation frame of `dt` seconds.
    #[wasm_bindgen]
    pub fn step(&mut self, dt: f64) {
        self.circuit.step(dt);
    }

    #[wasm_bindgen(getter)]
    pub fn time(&self) -> f64 {
        self.circuit.time()
    }

    /// Animation slowdown applied this frame, 1 is full speed.
    #[wasm_bindgen(getter)]
    pub fn time_scale(&self) -> f64 {
        self.circuit.time_scale()
    }

    // ============ Queries ============

    #[wasm_bindgen]
    pub fn element_ids(&self) -> Vec<usize> {
        self.circuit.elements().map(|e| e.id.0).collect()
    }

    /// Currents in the order of [`element_ids`](Self::element_ids).
    #[wasm_bindgen]
    pub fn element_currents(&self) -> Vec<f64> {
        self.circuit.elements().map(|e| e.current).collect()
    }

    #[wasm_bindgen]
    pub fn vertex_ids(&self) -> Vec<usize> {
        self.circuit.vertices().map(|v| v.id.0).collect()
    }

    /// Voltages in the order of [`vertex_ids`](Self::vertex_ids).
    #[wasm_bindgen]
    pub fn vertex_voltages(&self) -> Vec<f64> {
        self.circuit.vertices().map(|v| v.voltage).collect()
    }

    /// `[x, y, ...]` in the order of [`vertex_ids`](Self::vertex_ids).
    #[wasm_bindgen]
    pub fn vertex_positions(&self) -> Vec<f64> {
        self.circuit
            .vertices()
            .flat_map(|v| [v.position.x, v.position.y])
            .collect()
    }

    /// `[x, y, angle, sign, ...]` for every charge.
    #[wasm_bindgen]
    pub fn charge_positions(&self) -> Vec<f64> {
        self.circuit
            .charges()
            .iter()
            .filter_map(|c| {
                let (position, angle) = self.circuit.charge_position(c)?;
                Some([position.x, position.y, angle, c.charge])
            })
            .flatten()
            .collect()
    }

    /// Reading of an ammeter probe on the element, if it can be read.
    #[wasm_bindgen]
    pub fn ammeter_reading(&self, id: usize) -> Option<f64> {
        self.circuit.ammeter_reading(ElementId(id))
    }

    /// Voltmeter reading between two vertices, if they are connected.
    #[wasm_bindgen]
    pub fn voltmeter_reading(&self, red: usize, black: usize) -> Option<f64> {
        self.circuit.voltage_between_connections(
            self.circuit.connection_at_vertex(VertexId(red)),
            self.circuit.connection_at_vertex(VertexId(black)),
        )
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get the default frame length in seconds.
#[wasm_bindgen]
pub fn default_frame_dt() -> f64 {
    crate::DEFAULT_FRAME_DT
}
