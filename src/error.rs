//! Error types for the circuit simulation engine.
//!
//! This module provides a unified error type [`CircuitError`] covering
//! malformed element construction, topology edits that reference unknown
//! pieces, and the numeric conditions the solver recovers from.

use thiserror::Error;

use crate::circuit::{ElementId, VertexId};

/// Result type alias using [`CircuitError`].
pub type Result<T> = std::result::Result<T, CircuitError>;

/// Unified error type for all circuit operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CircuitError {
    // ============ Construction Errors ============
    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for element '{element}': {message}")]
    InvalidParameter {
        element: String,
        param: String,
        message: String,
    },

    /// Both terminals of an element resolve to the same vertex
    #[error("Element terminals must be distinct, both ends are {vertex}")]
    DegenerateElement { vertex: VertexId },

    // ============ Topology Errors ============
    /// Vertex not found in circuit
    #[error("Vertex {vertex} not found in circuit")]
    VertexNotFound { vertex: VertexId },

    /// Element not found in circuit
    #[error("Element {element} not found in circuit")]
    ElementNotFound { element: ElementId },

    /// Operation does not apply to the target
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    // ============ Simulation Errors ============
    /// The nodal system has no unique solution
    #[error("Singular system of size {size} - shorted sources or floating node")]
    SingularSystem { size: usize },

    /// A solved quantity left the representable range
    #[error("Numeric overflow in {quantity} (value: {value:.2e})")]
    NumericOverflow { quantity: String, value: f64 },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },
}

impl CircuitError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        element: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            element: element.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a numeric overflow error
    pub fn numeric_overflow(quantity: impl Into<String>, value: f64) -> Self {
        Self::NumericOverflow {
            quantity: quantity.into(),
            value,
        }
    }
}
