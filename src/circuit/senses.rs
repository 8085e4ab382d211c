//! Current sense assignment.
//!
//! A sense only decides which way a readout shows an element's current.
//! Senses spread outward from elements that already have one, so that
//! readouts around a loop agree.

use std::collections::{BTreeSet, VecDeque};

use super::graph::Circuit;
use super::types::{CurrentSense, ElementId, VertexId};
use crate::components::ElementKind;

/// Sense for `target_current` that matches the reading of a reference
/// element: both read positive or both read negative.
fn matching_sense(
    target_current: f64,
    reference_current: f64,
    reference_sense: CurrentSense,
) -> CurrentSense {
    let reference_reads_positive = reference_sense.apply(reference_current) >= 0.0;
    if reference_reads_positive {
        CurrentSense::for_positive(target_current)
    } else {
        CurrentSense::for_negative(target_current)
    }
}

impl Circuit {
    /// Give every element carrying current a sense.
    pub(crate) fn determine_senses(&mut self) {
        // Disconnected elements forget their sense
        for element in self.elements.values_mut() {
            if element.current == 0.0 {
                element.current_sense = CurrentSense::Unspecified;
            }
        }

        let with_current: Vec<ElementId> = self
            .elements
            .values()
            .filter(|e| e.current != 0.0)
            .map(|e| e.id)
            .collect();

        loop {
            if self.unsensed(&with_current).is_empty() {
                break;
            }
            self.propagate_senses();

            let remaining = self.unsensed(&with_current);
            let Some(&first) = remaining.first() else {
                break;
            };

            // Keep AC sources in phase with one another
            let reference_ac = remaining
                .iter()
                .copied()
                .find(|id| self.is_ac_source(*id))
                .and_then(|ac| {
                    self.elements
                        .values()
                        .find(|e| {
                            e.id != ac
                                && matches!(e.kind, ElementKind::AcVoltage(_))
                                && e.current_sense != CurrentSense::Unspecified
                        })
                        .map(|reference| (ac, reference.current, reference.current_sense))
                });

            match reference_ac {
                Some((ac, reference_current, reference_sense)) => {
                    if let Some(element) = self.elements.get_mut(&ac) {
                        element.current_sense =
                            matching_sense(element.current, reference_current, reference_sense);
                    }
                }
                None => {
                    if let Some(element) = self.elements.get_mut(&first) {
                        element.current_sense = CurrentSense::for_positive(element.current);
                    }
                }
            }
        }
    }

    fn unsensed(&self, ids: &[ElementId]) -> Vec<ElementId> {
        ids.iter()
            .copied()
            .filter(|id| {
                self.elements
                    .get(id)
                    .is_some_and(|e| e.current_sense == CurrentSense::Unspecified)
            })
            .collect()
    }

    fn is_ac_source(&self, id: ElementId) -> bool {
        self.elements
            .get(&id)
            .is_some_and(|e| matches!(e.kind, ElementKind::AcVoltage(_)))
    }

    /// Walk out breadth-first from every sensed element, copying senses onto
    /// unsensed neighbours that carry current.
    fn propagate_senses(&mut self) {
        let mut to_visit: VecDeque<VertexId> = VecDeque::new();
        for element in self.elements.values() {
            if element.current_sense == CurrentSense::Unspecified {
                continue;
            }
            for vertex in [element.start, element.end] {
                if !to_visit.contains(&vertex) {
                    to_visit.push_back(vertex);
                }
            }
        }

        let mut visited = BTreeSet::new();
        while let Some(vertex) = to_visit.pop_front() {
            if visited.contains(&vertex) {
                continue;
            }
            let neighbors = self.neighbor_elements(vertex);
            for &id in &neighbors {
                let Some((current, sense, opposite)) = self
                    .elements
                    .get(&id)
                    .and_then(|e| Some((e.current, e.current_sense, e.opposite_vertex(vertex)?)))
                else {
                    continue;
                };

                if sense == CurrentSense::Unspecified && current != 0.0 {
                    let reference = neighbors
                        .iter()
                        .filter(|&&n| n != id)
                        .filter_map(|n| self.elements.get(n))
                        .find(|n| n.current_sense != CurrentSense::Unspecified)
                        .map(|n| (n.current, n.current_sense));
                    if let Some((reference_current, reference_sense)) = reference {
                        if let Some(element) = self.elements.get_mut(&id) {
                            element.current_sense =
                                matching_sense(current, reference_current, reference_sense);
                        }
                    }
                }

                if !visited.contains(&opposite) && !to_visit.contains(&opposite) {
                    to_visit.push_back(opposite);
                }
            }
            visited.insert(vertex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Point;
    use crate::components::{AcVoltage, Battery, Resistor};

    #[test]
    fn test_matching_sense() {
        // Reference reads +2 A, so the target should read positive too
        assert_eq!(
            matching_sense(-1.0, 2.0, CurrentSense::Forward),
            CurrentSense::Backward
        );
        assert_eq!(
            matching_sense(1.0, 2.0, CurrentSense::Forward),
            CurrentSense::Forward
        );
        // Reference reads -2 A
        assert_eq!(
            matching_sense(1.0, 2.0, CurrentSense::Backward),
            CurrentSense::Backward
        );
        assert_eq!(
            matching_sense(1.0, -2.0, CurrentSense::Backward),
            CurrentSense::Forward
        );
    }

    #[test]
    fn test_loop_readouts_agree() {
        let mut circuit = Circuit::new();
        let v: Vec<_> = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]
            .iter()
            .map(|&(x, y)| circuit.create_vertex(Point::new(x, y)))
            .collect();
        circuit
            .add_element(v[0], v[1], ElementKind::Battery(Battery::new(9.0)))
            .unwrap();
        // Resistor drawn against the loop direction
        circuit
            .add_element(v[2], v[1], ElementKind::Resistor(Resistor::new(10.0)))
            .unwrap();
        circuit.add_wire(v[2], v[0]).unwrap();
        circuit.step(1.0 / 60.0);

        let readings: Vec<f64> = circuit
            .elements()
            .map(|e| {
                assert_ne!(e.current_sense, CurrentSense::Unspecified);
                e.current_sense.apply(e.current)
            })
            .collect();
        assert!(readings.iter().all(|r| *r > 0.0) || readings.iter().all(|r| *r < 0.0));
    }

    #[test]
    fn test_senses_spread_along_long_loop() {
        let mut circuit = Circuit::new();
        let v: Vec<_> = (0..8)
            .map(|k| circuit.create_vertex(Point::new(100.0 * k as f64, 0.0)))
            .collect();
        let battery = circuit
            .add_element(v[0], v[1], ElementKind::Battery(Battery::new(9.0)))
            .unwrap();
        // Every other resistor drawn against the loop direction
        for k in 1..7 {
            let (start, end) = if k % 2 == 0 { (v[k + 1], v[k]) } else { (v[k], v[k + 1]) };
            circuit
                .add_element(start, end, ElementKind::Resistor(Resistor::new(3.0)))
                .unwrap();
        }
        circuit.add_wire(v[7], v[0]).unwrap();
        circuit.step(1.0 / 60.0);

        // Only the battery is seeded; propagation reaches the rest
        let expected = {
            let e = circuit.element(battery).unwrap();
            e.current_sense.apply(e.current).signum()
        };
        for e in circuit.elements() {
            assert_ne!(e.current_sense, CurrentSense::Unspecified);
            assert_eq!(e.current_sense.apply(e.current).signum(), expected);
        }
    }

    #[test]
    fn test_idle_elements_lose_sense() {
        let mut circuit = Circuit::new();
        let id = circuit
            .add_element_at(
                Point::zeros(),
                Point::new(50.0, 0.0),
                ElementKind::Resistor(Resistor::new(1.0)),
            )
            .unwrap();
        circuit.elements.get_mut(&id).unwrap().current_sense = CurrentSense::Forward;
        circuit.step(1.0 / 60.0);
        assert_eq!(
            circuit.element(id).unwrap().current_sense,
            CurrentSense::Unspecified
        );
    }

    #[test]
    fn test_ac_sources_share_phase() {
        let mut circuit = Circuit::new();
        let a = circuit.create_vertex(Point::new(0.0, 0.0));
        let b = circuit.create_vertex(Point::new(100.0, 0.0));
        let c = circuit.create_vertex(Point::new(300.0, 0.0));
        let d = circuit.create_vertex(Point::new(400.0, 0.0));
        let first = circuit
            .add_element(a, b, ElementKind::AcVoltage(AcVoltage::new(10.0, 1.0)))
            .unwrap();
        circuit
            .add_element(b, a, ElementKind::Resistor(Resistor::new(5.0)))
            .unwrap();
        // Second loop drawn the other way round and half a cycle behind
        let second = circuit
            .add_element(
                d,
                c,
                ElementKind::AcVoltage(AcVoltage::new(10.0, 1.0).with_phase(std::f64::consts::PI)),
            )
            .unwrap();
        circuit
            .add_element(c, d, ElementKind::Resistor(Resistor::new(5.0)))
            .unwrap();
        circuit.step(0.1);

        let reading = |id| {
            let e = circuit.element(id).unwrap();
            e.current_sense.apply(e.current)
        };
        assert!(reading(first) * reading(second) > 0.0);
    }
}
