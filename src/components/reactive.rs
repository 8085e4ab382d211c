//! Energy-storage elements: Capacitor and Inductor.
//!
//! Both carry the instantaneous voltage and current from the end of the
//! previous step. The transient engine builds its companion models from
//! this state and hands back the new one.

/// Instantaneous companion state of a dynamic element.
///
/// `voltage` is the drop from start to end vertex; `current` flows from
/// start to end through the element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DynamicState {
    pub voltage: f64,
    pub current: f64,
}

/// A capacitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Capacitor {
    pub capacitance: f64,
    pub state: DynamicState,
}

impl Capacitor {
    pub const DEFAULT_CAPACITANCE: f64 = 0.1;

    /// Create a new, discharged capacitor.
    pub fn new(capacitance: f64) -> Self {
        Self {
            capacitance,
            state: DynamicState::default(),
        }
    }

    /// Stored charge in coulombs.
    pub fn charge(&self) -> f64 {
        self.capacitance * self.state.voltage
    }

    /// Discharge instantly.
    pub fn clear(&mut self) {
        self.state = DynamicState::default();
    }
}

impl Default for Capacitor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITANCE)
    }
}

/// An inductor.
#[derive(Debug, Clone, PartialEq)]
pub struct Inductor {
    pub inductance: f64,
    pub state: DynamicState,
}

impl Inductor {
    pub const DEFAULT_INDUCTANCE: f64 = 5.0;

    /// Create a new inductor with no stored current.
    pub fn new(inductance: f64) -> Self {
        Self {
            inductance,
            state: DynamicState::default(),
        }
    }

    /// Stored magnetic energy in joules.
    pub fn energy(&self) -> f64 {
        0.5 * self.inductance * self.state.current * self.state.current
    }

    /// Collapse the stored field.
    pub fn clear(&mut self) {
        self.state = DynamicState::default();
    }
}

impl Default for Inductor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INDUCTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_capacitor_charge() {
        let mut c = Capacitor::new(2e-3);
        c.state.voltage = 5.0;
        assert_abs_diff_eq!(c.charge(), 1e-2);
        c.clear();
        assert_eq!(c.state, DynamicState::default());
    }

    #[test]
    fn test_inductor_energy() {
        let mut l = Inductor::new(2.0);
        l.state.current = 3.0;
        assert_abs_diff_eq!(l.energy(), 9.0);
    }
}
