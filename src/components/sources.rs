//! Voltage sources: Battery and AC voltage.

use std::f64::consts::PI;

/// A DC battery.
///
/// The battery raises the potential from its start vertex to its end vertex:
///   V(end) - V(start) = voltage - internal_resistance * I
#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    pub voltage: f64,
    /// Series resistance applied once the battery is overloaded
    pub internal_resistance: f64,
}

impl Battery {
    pub const DEFAULT_VOLTAGE: f64 = 9.0;
    pub const DEFAULT_INTERNAL_RESISTANCE: f64 = 1e-4;

    /// Create a new battery.
    pub fn new(voltage: f64) -> Self {
        Self {
            voltage,
            internal_resistance: Self::DEFAULT_INTERNAL_RESISTANCE,
        }
    }

    /// Set the internal resistance.
    pub fn with_internal_resistance(mut self, internal_resistance: f64) -> Self {
        self.internal_resistance = internal_resistance;
        self
    }
}

impl Default for Battery {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VOLTAGE)
    }
}

/// A sinusoidal voltage source.
///
/// The instantaneous voltage is re-evaluated every step:
///   v(t) = amplitude * sin(2π * frequency * t + phase)
#[derive(Debug, Clone, PartialEq)]
pub struct AcVoltage {
    /// Peak voltage
    pub amplitude: f64,
    /// Frequency in Hz
    pub frequency: f64,
    /// Phase offset in radians
    pub phase: f64,
    pub internal_resistance: f64,
    /// Voltage at the last evaluated time
    pub voltage: f64,
}

impl AcVoltage {
    /// Create a new AC source starting at phase zero.
    pub fn new(amplitude: f64, frequency: f64) -> Self {
        Self {
            amplitude,
            frequency,
            phase: 0.0,
            internal_resistance: Battery::DEFAULT_INTERNAL_RESISTANCE,
            voltage: 0.0,
        }
    }

    /// Set the phase offset (radians).
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    /// Evaluate the source at simulated time `time` and return the new voltage.
    pub fn tick(&mut self, time: f64) -> f64 {
        self.voltage = self.amplitude * (2.0 * PI * self.frequency * time + self.phase).sin();
        self.voltage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ac_voltage_waveform() {
        let mut source = AcVoltage::new(10.0, 1.0);
        assert_abs_diff_eq!(source.tick(0.0), 0.0);
        assert_abs_diff_eq!(source.tick(0.25), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(source.tick(0.75), -10.0, epsilon = 1e-12);

        let mut shifted = AcVoltage::new(10.0, 1.0).with_phase(PI / 2.0);
        assert_abs_diff_eq!(shifted.tick(0.0), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_battery_defaults() {
        let battery = Battery::default();
        assert_eq!(battery.voltage, 9.0);
        assert_eq!(battery.internal_resistance, Battery::DEFAULT_INTERNAL_RESISTANCE);
    }
}
