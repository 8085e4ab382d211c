//! Nodal solver and transient engine.
//!
//! This module provides the numerical side of the simulation.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and voltage-source currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect voltage sources to nodes
//! - D holds the internal resistance of each voltage source
//! - v is the vector of node voltages
//! - j is the vector of voltage source currents
//! - i is the sum of current injections into each node
//! - e is the vector of voltage source values
//!
//! Each connected component gets its own reference node, so disjoint
//! sub-circuits solve in one system.
//!
//! ## Transient analysis
//!
//! Capacitors and inductors are replaced by companion models for every
//! sub-step ([`LtaCircuit`]). [`TimestepSubdivisions`] chooses the
//! sub-steps by comparing one full step against two half steps.

mod analysis;
mod lta;
mod mna;
mod subdivision;

pub(crate) use analysis::solve_circuit;
pub use lta::{IntegrationMethod, LtaCapacitor, LtaCircuit, LtaInductor, LtaSolution, LtaState};
pub use mna::{MnaCircuit, MnaCurrent, MnaMatrix, MnaResistor, MnaSolution, MnaVoltageSource};
pub use subdivision::{Steppable, SubStep, SubdivisionResult, TimestepSubdivisions};

use log::warn;

use crate::error::{CircuitError, Result};

/// Largest magnitude stored for any solved voltage or current.
pub const MAX_MAGNITUDE: f64 = 1e20;

/// Sub-step error threshold on the characteristic currents.
pub const DEFAULT_ERROR_THRESHOLD: f64 = 1e-7;

/// Smallest sub-step the subdivision driver will take (seconds).
pub const DEFAULT_MIN_DT: f64 = 1e-5;

/// Maximum number of halvings while searching for a sub-step.
pub const DEFAULT_MAX_SUBDIVISION_DEPTH: usize = 24;

/// Residual KCL sum tolerated at a vertex before redistribution.
pub const CURRENT_CONSERVATION_TOLERANCE: f64 = 1e-10;

/// Fail if `value` is non-finite or larger than [`MAX_MAGNITUDE`].
pub fn check_magnitude(quantity: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value.abs() <= MAX_MAGNITUDE {
        Ok(value)
    } else {
        Err(CircuitError::numeric_overflow(quantity, value))
    }
}

/// Clamp `value` into the storable range, logging when it had to move.
/// Non-finite values become zero.
pub fn clamp_magnitude(quantity: &str, value: f64) -> f64 {
    check_magnitude(quantity, value).unwrap_or_else(|e| {
        warn!("{e}, clamping");
        if value.is_finite() {
            value.clamp(-MAX_MAGNITUDE, MAX_MAGNITUDE)
        } else {
            0.0
        }
    })
}
