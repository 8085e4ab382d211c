//! Even placement of particles along an element.

use super::{Charge, CHARGE_SEPARATION};
use crate::components::CircuitElement;

/// Particle distances for a path of `length` view units.
///
/// Particles sit half a separation in from each end so they line up with
/// the neighbours' particles; a single particle goes in the middle.
pub fn charge_distances(length: f64) -> Vec<f64> {
    let offset = CHARGE_SEPARATION / 2.0;
    let first = offset;
    let last = length - offset;
    let length_for_charges = last - first;

    let count = (length_for_charges / CHARGE_SEPARATION).ceil();
    if !(count >= 1.0) {
        return Vec::new();
    }
    let count = count as usize;
    if count == 1 {
        return vec![(first + last) / 2.0];
    }

    let spacing = length_for_charges / (count - 1) as f64;
    (0..count).map(|i| offset + i as f64 * spacing).collect()
}

/// Replace the particles on `element` with a fresh even layout.
///
/// Existing particles of the element are reused in order; surplus ones are
/// dropped and missing ones appended.
pub(crate) fn layout_charges(charges: &mut Vec<Charge>, element: &CircuitElement, sign: f64) {
    let mut slots = charge_distances(element.charge_path_length).into_iter();
    charges.retain_mut(|charge| {
        if charge.element != element.id {
            return true;
        }
        match slots.next() {
            Some(distance) => {
                charge.distance = distance;
                charge.charge = sign;
                true
            }
            None => false,
        }
    });
    charges.extend(slots.map(|distance| Charge::new(element.id, distance, sign)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{ElementId, VertexId};
    use crate::components::{ElementKind, Wire};
    use approx::assert_abs_diff_eq;

    fn wire(id: usize, length: f64) -> CircuitElement {
        let mut element = CircuitElement::new(
            ElementId(id),
            VertexId(0),
            VertexId(1),
            ElementKind::Wire(Wire::default()),
        );
        element.set_length(length);
        element
    }

    #[test]
    fn test_charge_distances() {
        // 72 units between the end offsets, three particles 36 apart
        let distances = charge_distances(100.0);
        assert_eq!(distances.len(), 3);
        assert_abs_diff_eq!(distances[0], 14.0);
        assert_abs_diff_eq!(distances[1], 50.0);
        assert_abs_diff_eq!(distances[2], 86.0);
    }

    #[test]
    fn test_short_paths() {
        assert_eq!(charge_distances(40.0), vec![20.0]);
        assert!(charge_distances(28.0).is_empty());
        assert!(charge_distances(5.0).is_empty());
    }

    #[test]
    fn test_layout_reuses_and_trims() {
        let mut charges = vec![
            Charge::new(ElementId(1), 3.0, -1.0),
            Charge::new(ElementId(2), 4.0, -1.0),
            Charge::new(ElementId(1), 5.0, -1.0),
        ];
        layout_charges(&mut charges, &wire(1, 40.0), 1.0);

        assert_eq!(charges.len(), 2);
        assert_eq!(charges[0], Charge::new(ElementId(1), 20.0, 1.0));
        assert_eq!(charges[1], Charge::new(ElementId(2), 4.0, -1.0));

        layout_charges(&mut charges, &wire(1, 100.0), 1.0);
        let on_first = charges.iter().filter(|c| c.element == ElementId(1)).count();
        assert_eq!(on_first, 3);
    }
}
