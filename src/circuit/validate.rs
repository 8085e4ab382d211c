//! Element and circuit validation.

use crate::components::ElementKind;
use crate::error::{CircuitError, Result};

use super::Circuit;

fn finite(element: &ElementKind, param: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CircuitError::invalid_parameter(
            element.type_name(),
            param,
            format!("must be finite, got {value}"),
        ))
    }
}

fn non_negative(element: &ElementKind, param: &str, value: f64) -> Result<()> {
    finite(element, param, value)?;
    if value < 0.0 {
        return Err(CircuitError::invalid_parameter(
            element.type_name(),
            param,
            format!("must be non-negative, got {value}"),
        ));
    }
    Ok(())
}

fn positive(element: &ElementKind, param: &str, value: f64) -> Result<()> {
    finite(element, param, value)?;
    if value <= 0.0 {
        return Err(CircuitError::invalid_parameter(
            element.type_name(),
            param,
            format!("must be positive, got {value}"),
        ));
    }
    Ok(())
}

/// Check an element's parameters are physically meaningful.
pub fn validate_element(kind: &ElementKind) -> Result<()> {
    match kind {
        ElementKind::Wire(w) => non_negative(kind, "resistivity", w.resistivity),
        ElementKind::Resistor(r) => non_negative(kind, "resistance", r.resistance),
        ElementKind::LightBulb(b) => non_negative(kind, "resistance", b.resistance),
        ElementKind::Battery(b) => {
            finite(kind, "voltage", b.voltage)?;
            non_negative(kind, "internal_resistance", b.internal_resistance)
        }
        ElementKind::AcVoltage(ac) => {
            non_negative(kind, "amplitude", ac.amplitude)?;
            non_negative(kind, "frequency", ac.frequency)?;
            finite(kind, "phase", ac.phase)?;
            non_negative(kind, "internal_resistance", ac.internal_resistance)
        }
        ElementKind::Fuse(f) => {
            positive(kind, "current_rating", f.current_rating)?;
            non_negative(kind, "resistance", f.resistance)
        }
        ElementKind::Capacitor(c) => positive(kind, "capacitance", c.capacitance),
        ElementKind::Inductor(l) => positive(kind, "inductance", l.inductance),
        ElementKind::Switch(_) | ElementKind::SeriesAmmeter(_) => Ok(()),
    }
}

/// Validate a whole circuit.
///
/// Checks:
/// - Every element has two distinct terminals
/// - Both terminals exist
/// - Element parameters are valid
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    for element in circuit.elements() {
        if element.start == element.end {
            return Err(CircuitError::DegenerateElement {
                vertex: element.start,
            });
        }
        for vertex in [element.start, element.end] {
            if circuit.vertex(vertex).is_none() {
                return Err(CircuitError::VertexNotFound { vertex });
            }
        }
        validate_element(&element.kind)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Point, VertexId};
    use crate::components::{AcVoltage, Battery, Capacitor, Fuse, Inductor, Resistor, Wire};

    #[test]
    fn test_rejects_negative_resistance() {
        let result = validate_element(&ElementKind::Resistor(Resistor::new(-1.0)));
        assert!(matches!(
            result,
            Err(CircuitError::InvalidParameter { ref param, .. }) if param == "resistance"
        ));
    }

    #[test]
    fn test_rejects_non_positive_storage() {
        assert!(validate_element(&ElementKind::Capacitor(Capacitor::new(0.0))).is_err());
        assert!(validate_element(&ElementKind::Inductor(Inductor::new(-2.0))).is_err());
        assert!(validate_element(&ElementKind::Fuse(Fuse::new(0.0))).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(validate_element(&ElementKind::Battery(Battery::new(f64::INFINITY))).is_err());
        assert!(validate_element(&ElementKind::Wire(Wire::new(f64::NAN))).is_err());
        assert!(validate_element(&ElementKind::AcVoltage(AcVoltage::new(5.0, f64::NAN))).is_err());
    }

    #[test]
    fn test_accepts_defaults() {
        assert!(validate_element(&ElementKind::Battery(Battery::default())).is_ok());
        assert!(validate_element(&ElementKind::Capacitor(Capacitor::default())).is_ok());
        assert!(validate_element(&ElementKind::Resistor(Resistor::new(0.0))).is_ok());
        // Batteries may be reversed by sign
        assert!(validate_element(&ElementKind::Battery(Battery::new(-1.5))).is_ok());
    }

    #[test]
    fn test_validate_circuit() {
        let mut circuit = Circuit::new();
        circuit
            .add_element_at(
                Point::zeros(),
                Point::new(10.0, 0.0),
                ElementKind::Resistor(Resistor::new(1.0)),
            )
            .unwrap();
        assert!(validate_circuit(&circuit).is_ok());

        circuit.vertices.remove(&VertexId(0));
        assert!(matches!(
            validate_circuit(&circuit),
            Err(CircuitError::VertexNotFound { .. })
        ));
    }
}
