//! # Circuit Kit Core
//!
//! A real-time DC/AC circuit simulation engine for interactive circuit
//! building, with animated charge flow.
//!
//! This library provides:
//! - A live circuit graph that accepts edits between frames (add, remove,
//!   move, cut, connect, switch, flip)
//! - Modified Nodal Analysis (MNA) with per-component reference nodes
//! - Companion-model transients for capacitors and inductors with adaptive
//!   timestep subdivision
//! - Particle animation that keeps charges evenly spaced and conserved
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Circuit graph, traversal, current senses and probes
//! - [`components`] - Element models (wires, resistors, sources, switches, ...)
//! - [`solver`] - MNA assembly, transient engine and subdivision driver
//! - [`charges`] - Charge layout and the charge animator
//!
//! ## Usage
//!
//! ```
//! use circuit_kit_core::circuit::Point;
//! use circuit_kit_core::components::{Battery, ElementKind, Resistor};
//! use circuit_kit_core::{Circuit, DEFAULT_FRAME_DT};
//!
//! let mut circuit = Circuit::new();
//! let a = circuit.create_vertex(Point::new(0.0, 0.0));
//! let b = circuit.create_vertex(Point::new(100.0, 0.0));
//! circuit.add_element(a, b, ElementKind::Battery(Battery::new(9.0))).unwrap();
//! circuit.add_element(b, a, ElementKind::Resistor(Resistor::new(10.0))).unwrap();
//!
//! circuit.step(DEFAULT_FRAME_DT);
//! let current = circuit.elements().next().unwrap().current;
//! assert!((current - 0.9).abs() < 1e-3);
//! ```
//!
//! ## Simulation Method
//!
//! Each call to [`Circuit::step`] advances one animation frame:
//!
//! 1. Find the elements on closed, energized loops
//! 2. Replace capacitors and inductors with companion models and solve the
//!    resulting resistive network over adaptively chosen sub-steps
//! 3. Write back time-averaged currents and node voltages, and infer the
//!    voltages of dangling branches
//! 4. Move the charges along the solved currents

pub mod charges;
pub mod circuit;
pub mod components;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{Circuit, CircuitConfig, CircuitEvent};
pub use error::{CircuitError, Result};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmCircuit;

/// Default animation frame length in seconds
pub const DEFAULT_FRAME_DT: f64 = 1.0 / 60.0;
