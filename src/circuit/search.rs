//! Graph traversals over the circuit.

use std::collections::{BTreeMap, BTreeSet};

use super::graph::Circuit;
use super::types::{ElementId, VertexId};
use crate::components::CircuitElement;
use crate::error::Result;

impl Circuit {
    /// Every vertex reachable from `vertex` through elements accepted by
    /// `ok_to_visit(from, element, to)`, including `vertex` itself.
    pub fn search_vertices(
        &self,
        vertex: VertexId,
        ok_to_visit: impl Fn(VertexId, &CircuitElement, VertexId) -> bool,
    ) -> Vec<VertexId> {
        let mut found = Vec::new();
        let mut visited = BTreeSet::new();
        let mut to_visit = vec![vertex];

        while let Some(current) = to_visit.pop() {
            if !visited.insert(current) {
                continue;
            }
            found.push(current);

            for element in self.elements.values().filter(|e| e.contains_vertex(current)) {
                let Some(neighbor) = element.opposite_vertex(current) else {
                    continue;
                };
                if !visited.contains(&neighbor)
                    && !to_visit.contains(&neighbor)
                    && ok_to_visit(current, element, neighbor)
                {
                    to_visit.push(neighbor);
                }
            }
        }
        found
    }

    pub fn find_all_connected_vertices(&self, vertex: VertexId) -> Vec<VertexId> {
        self.search_vertices(vertex, |_, _, _| true)
    }

    /// Vertices joined to `vertex` by fixed-length elements (everything but
    /// wires). These move together when the group is dragged.
    pub fn find_all_fixed_vertices(&self, vertex: VertexId) -> Vec<VertexId> {
        self.search_vertices(vertex, |_, element, _| element.is_fixed_length())
    }

    pub(crate) fn has_fixed_connection_to_black_box(&self, vertex: VertexId) -> bool {
        self.find_all_fixed_vertices(vertex)
            .iter()
            .any(|v| self.vertices.get(v).is_some_and(|v| v.black_box_interface))
    }

    /// Whether current could flow between the two vertices. Open switches
    /// and tripped fuses break the connection.
    pub fn are_vertices_electrically_connected(&self, a: VertexId, b: VertexId) -> bool {
        self.search_vertices(a, |_, element, _| element.is_traversable())
            .contains(&b)
    }

    /// Whether the element closes a loop: its end is reachable from its start
    /// without crossing the element itself or anything open.
    pub fn is_in_loop(&self, id: ElementId) -> Result<bool> {
        Ok(self.element_in_loop(self.element_or_err(id)?))
    }

    pub(crate) fn element_in_loop(&self, element: &CircuitElement) -> bool {
        // Its own terminals may be joined elsewhere, but an open element
        // never carries loop current
        if !element.is_traversable() {
            return false;
        }

        let mut stack = vec![element.start];
        let mut visited = BTreeSet::new();
        while let Some(vertex) = stack.pop() {
            if !visited.insert(vertex) {
                continue;
            }
            for neighbor in self.elements.values() {
                if neighbor.id == element.id
                    || !neighbor.is_traversable()
                    || !neighbor.contains_vertex(vertex)
                {
                    continue;
                }
                let Some(opposite) = neighbor.opposite_vertex(vertex) else {
                    continue;
                };
                if opposite == element.end {
                    return true;
                }
                stack.push(opposite);
            }
        }
        false
    }

    /// Elements that take part in the solve: on a closed loop, in a part of
    /// the circuit that holds a battery, AC source, capacitor or inductor.
    pub fn participants(&self) -> BTreeSet<ElementId> {
        let mut component: BTreeMap<VertexId, usize> = BTreeMap::new();
        for (index, &vertex) in self.vertices.keys().enumerate() {
            if component.contains_key(&vertex) {
                continue;
            }
            for member in self.search_vertices(vertex, |_, e, _| e.is_traversable()) {
                component.insert(member, index);
            }
        }

        let energized: BTreeSet<usize> = self
            .elements
            .values()
            .filter(|e| e.is_energy_source() && e.is_traversable())
            .filter_map(|e| component.get(&e.start).copied())
            .collect();

        self.elements
            .values()
            .filter(|e| {
                component
                    .get(&e.start)
                    .is_some_and(|c| energized.contains(c))
            })
            .filter(|e| self.element_in_loop(e))
            .map(|e| e.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Point;
    use crate::components::{Battery, ElementKind, Resistor, Switch};

    fn line(circuit: &mut Circuit, n: usize) -> Vec<VertexId> {
        (0..n)
            .map(|i| circuit.create_vertex(Point::new(100.0 * i as f64, 0.0)))
            .collect()
    }

    #[test]
    fn test_loop_detection() {
        let mut circuit = Circuit::new();
        let v = line(&mut circuit, 3);
        let battery = circuit
            .add_element(v[0], v[1], ElementKind::Battery(Battery::new(9.0)))
            .unwrap();
        let resistor = circuit
            .add_element(v[1], v[2], ElementKind::Resistor(Resistor::new(10.0)))
            .unwrap();
        assert!(!circuit.is_in_loop(battery).unwrap());

        let wire = circuit.add_wire(v[2], v[0]).unwrap();
        for id in [battery, resistor, wire] {
            assert!(circuit.is_in_loop(id).unwrap());
        }
        assert_eq!(circuit.participants().len(), 3);
    }

    #[test]
    fn test_open_switch_breaks_loop() {
        let mut circuit = Circuit::new();
        let v = line(&mut circuit, 3);
        let battery = circuit
            .add_element(v[0], v[1], ElementKind::Battery(Battery::new(9.0)))
            .unwrap();
        circuit.add_wire(v[1], v[2]).unwrap();
        let switch = circuit
            .add_element(v[2], v[0], ElementKind::Switch(Switch::new(false)))
            .unwrap();

        assert!(!circuit.is_in_loop(battery).unwrap());
        assert!(!circuit.is_in_loop(switch).unwrap());
        // The switch terminals are still joined the long way round
        assert!(circuit.are_vertices_electrically_connected(v[2], v[0]));
        assert!(circuit.participants().is_empty());

        circuit.set_switch_closed(switch, true).unwrap();
        assert!(circuit.is_in_loop(battery).unwrap());
        assert!(circuit.is_in_loop(switch).unwrap());
    }

    #[test]
    fn test_open_switch_isolates_vertices() {
        let mut circuit = Circuit::new();
        let v = line(&mut circuit, 3);
        circuit.add_wire(v[0], v[1]).unwrap();
        let switch = circuit
            .add_element(v[1], v[2], ElementKind::Switch(Switch::new(false)))
            .unwrap();

        assert!(circuit.are_vertices_electrically_connected(v[0], v[1]));
        assert!(!circuit.are_vertices_electrically_connected(v[0], v[2]));

        circuit.set_switch_closed(switch, true).unwrap();
        assert!(circuit.are_vertices_electrically_connected(v[0], v[2]));
    }

    #[test]
    fn test_open_switch_in_parallel_is_not_in_loop() {
        let mut circuit = Circuit::new();
        let v = line(&mut circuit, 2);
        circuit.add_wire(v[0], v[1]).unwrap();
        circuit
            .add_element(v[0], v[1], ElementKind::Resistor(Resistor::new(1.0)))
            .unwrap();
        let switch = circuit
            .add_element(v[0], v[1], ElementKind::Switch(Switch::new(false)))
            .unwrap();
        assert!(!circuit.is_in_loop(switch).unwrap());
        assert!(circuit.is_in_loop(ElementId(0)).unwrap());
    }

    #[test]
    fn test_sourceless_loop_does_not_participate() {
        let mut circuit = Circuit::new();
        let v = line(&mut circuit, 2);
        circuit.add_wire(v[0], v[1]).unwrap();
        circuit
            .add_element(v[1], v[0], ElementKind::Resistor(Resistor::new(1.0)))
            .unwrap();
        assert!(circuit.participants().is_empty());
    }

    #[test]
    fn test_fixed_vertex_groups() {
        let mut circuit = Circuit::new();
        let v = line(&mut circuit, 4);
        circuit
            .add_element(v[0], v[1], ElementKind::Battery(Battery::new(1.5)))
            .unwrap();
        circuit.add_wire(v[1], v[2]).unwrap();
        circuit
            .add_element(v[2], v[3], ElementKind::Resistor(Resistor::new(1.0)))
            .unwrap();

        let mut group = circuit.find_all_fixed_vertices(v[0]);
        group.sort();
        assert_eq!(group, vec![v[0], v[1]]);
        assert_eq!(circuit.find_all_connected_vertices(v[0]).len(), 4);
    }
}
