//! Simulation configuration.

use super::types::CurrentType;
use crate::components::DEFAULT_RESISTIVITY;
use crate::error::{CircuitError, Result};
use crate::solver::{
    IntegrationMethod, TimestepSubdivisions, DEFAULT_ERROR_THRESHOLD,
    DEFAULT_MAX_SUBDIVISION_DEPTH, DEFAULT_MIN_DT,
};

/// Battery current above which internal resistance is switched in (amps).
pub const DEFAULT_BATTERY_CURRENT_THRESHOLD: f64 = 1e-4;

/// Seed for the charge animator's generator.
pub const DEFAULT_SEED: u64 = 0;

/// Configuration for a [`Circuit`](super::Circuit).
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitConfig {
    /// Resistivity applied to new wires (ohm-meters).
    pub wire_resistivity: f64,
    /// Average source current that triggers the internal-resistance re-solve.
    pub battery_current_threshold: f64,
    /// Sub-step acceptance threshold on capacitor and inductor currents.
    pub error_threshold: f64,
    /// Smallest sub-step (seconds).
    pub min_dt: f64,
    /// Maximum halvings per sub-step.
    pub max_subdivision_depth: usize,
    pub integration_method: IntegrationMethod,
    pub current_type: CurrentType,
    /// Seed for the charge animator, so runs are reproducible.
    pub seed: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            wire_resistivity: DEFAULT_RESISTIVITY,
            battery_current_threshold: DEFAULT_BATTERY_CURRENT_THRESHOLD,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            min_dt: DEFAULT_MIN_DT,
            max_subdivision_depth: DEFAULT_MAX_SUBDIVISION_DEPTH,
            integration_method: IntegrationMethod::default(),
            current_type: CurrentType::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl CircuitConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wire_resistivity(mut self, wire_resistivity: f64) -> Self {
        self.wire_resistivity = wire_resistivity;
        self
    }

    pub fn with_battery_current_threshold(mut self, threshold: f64) -> Self {
        self.battery_current_threshold = threshold;
        self
    }

    /// Set the sub-step error threshold.
    ///
    /// Lower values track fast RC/RL transients more closely at the cost
    /// of more solves per frame.
    pub fn with_error_threshold(mut self, error_threshold: f64) -> Self {
        self.error_threshold = error_threshold;
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = min_dt;
        self
    }

    pub fn with_max_subdivision_depth(mut self, depth: usize) -> Self {
        self.max_subdivision_depth = depth;
        self
    }

    pub fn with_integration_method(mut self, method: IntegrationMethod) -> Self {
        self.integration_method = method;
        self
    }

    pub fn with_current_type(mut self, current_type: CurrentType) -> Self {
        self.current_type = current_type;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("error_threshold", self.error_threshold),
            ("min_dt", self.min_dt),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CircuitError::InvalidSimulationParam {
                    message: format!("{name} must be positive, got {value}"),
                });
            }
        }

        let non_negative = [
            ("wire_resistivity", self.wire_resistivity),
            ("battery_current_threshold", self.battery_current_threshold),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CircuitError::InvalidSimulationParam {
                    message: format!("{name} must be non-negative, got {value}"),
                });
            }
        }

        Ok(())
    }

    /// The subdivision driver these settings describe.
    pub fn subdivisions(&self) -> TimestepSubdivisions {
        TimestepSubdivisions::new(self.error_threshold, self.min_dt, self.max_subdivision_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CircuitConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CircuitConfig::new()
            .with_min_dt(1e-4)
            .with_integration_method(IntegrationMethod::Trapezoidal)
            .with_seed(7);
        assert_eq!(config.min_dt, 1e-4);
        assert_eq!(config.subdivisions().min_dt, 1e-4);
        assert_eq!(config.integration_method, IntegrationMethod::Trapezoidal);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(CircuitConfig::new().with_min_dt(0.0).validate().is_err());
        assert!(CircuitConfig::new().with_error_threshold(f64::NAN).validate().is_err());
        assert!(CircuitConfig::new()
            .with_wire_resistivity(-1.0)
            .validate()
            .is_err());
    }
}
