//! Per-frame particle motion.
//!
//! Each particle advances at `current * charge * SPEED_SCALE` view units per
//! second. When the fastest element would move particles further than
//! [`MAX_POSITION_CHANGE`] in one frame, the whole animation is slowed by a
//! common factor. Particles leaving an element continue on the adjacent
//! element that carries current away from the junction and has the lowest
//! particle density.

use std::collections::{BTreeMap, HashMap, VecDeque};

use log::trace;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{Charge, CHARGE_SEPARATION};
use crate::circuit::{ElementId, VertexId};
use crate::components::CircuitElement;

/// Below this current (amps) particles stand still.
pub const MINIMUM_CURRENT: f64 = 1e-3;

/// Furthest a particle may move in one frame before time is slowed.
pub const MAX_POSITION_CHANGE: f64 = CHARGE_SEPARATION * 0.43;

/// View units per second per amp.
pub const SPEED_SCALE: f64 = 25.0;

/// Largest frame the animator integrates at once (seconds).
pub const MAX_DT: f64 = 1.0 / 30.0;

const NUMBER_OF_EQUALIZE_STEPS: usize = 2;
const TIME_SCALE_WINDOW: usize = 30;

/// Elements shorter than this borrow their neighbours' density when empty.
const SHORT_SEGMENT_LENGTH: f64 = 30.0;

/// Mean of the last `window` samples.
#[derive(Debug, Clone)]
struct RunningAverage {
    window: usize,
    samples: VecDeque<f64>,
    total: f64,
}

impl RunningAverage {
    fn new(window: usize) -> Self {
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            total: 0.0,
        }
    }

    fn update(&mut self, value: f64) -> f64 {
        self.samples.push_back(value);
        self.total += value;
        if self.samples.len() > self.window {
            if let Some(old) = self.samples.pop_front() {
                self.total -= old;
            }
        }
        self.total / self.samples.len() as f64
    }

    fn clear(&mut self) {
        self.samples.clear();
        self.total = 0.0;
    }
}

/// A place a particle could move to, with the density found there.
#[derive(Debug, Clone, Copy)]
struct CircuitLocation {
    element: ElementId,
    distance: f64,
    density: f64,
}

/// Moves particles along the circuit.
#[derive(Debug, Clone)]
pub struct ChargeAnimator {
    rng: ChaCha8Rng,
    seed: u64,
    /// Slowdown applied this frame
    scale: f64,
    time_scale_average: RunningAverage,
    /// Smoothed slowdown, 1 is full speed
    time_scale: f64,
}

impl ChargeAnimator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            scale: 1.0,
            time_scale_average: RunningAverage::new(TIME_SCALE_WINDOW),
            time_scale: 1.0,
        }
    }

    /// How much the animation is slowed, 1 is full speed.
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Restore the initial state, including the generator.
    pub fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.scale = 1.0;
        self.time_scale_average.clear();
        self.time_scale = 1.0;
    }

    /// Advance every particle by one frame.
    pub fn step(
        &mut self,
        charges: &mut [Charge],
        elements: &BTreeMap<ElementId, CircuitElement>,
        dt: f64,
    ) {
        if charges.is_empty() || elements.is_empty() {
            return;
        }

        let dt = dt.min(MAX_DT);

        let max_current = elements
            .values()
            .map(|e| e.current.abs())
            .fold(0.0, f64::max);

        // Use MAX_DT instead of dt so the scale does not flicker with frame timing
        let max_position_change = max_current * SPEED_SCALE * MAX_DT;
        self.scale = if max_position_change >= MAX_POSITION_CHANGE {
            MAX_POSITION_CHANGE / max_position_change
        } else {
            1.0
        };
        self.time_scale = self.time_scale_average.update(self.scale).clamp(0.0, 1.0);

        let mut counts: HashMap<ElementId, usize> = HashMap::new();
        for charge in charges.iter() {
            *counts.entry(charge.element).or_default() += 1;
        }

        for charge in charges.iter_mut() {
            let settled = elements
                .get(&charge.element)
                .is_some_and(|e| !e.charge_layout_dirty);
            if settled {
                self.propagate(charge, elements, &mut counts, dt);
            }
        }

        for _ in 0..NUMBER_OF_EQUALIZE_STEPS {
            self.equalize_all(charges, elements, dt);
        }
    }

    /// Move one particle, handing it to a neighbour when it leaves its element.
    fn propagate(
        &self,
        charge: &mut Charge,
        elements: &BTreeMap<ElementId, CircuitElement>,
        counts: &mut HashMap<ElementId, usize>,
        dt: f64,
    ) {
        let Some(element) = elements.get(&charge.element) else {
            return;
        };
        let current = element.current * charge.charge;
        if current.abs() <= MINIMUM_CURRENT {
            return;
        }

        let new_distance = charge.distance + current * SPEED_SCALE * dt * self.scale;
        if element.contains_distance(new_distance) {
            charge.distance = new_distance;
            return;
        }

        // The side it left through decides both the junction and the overshoot
        let (vertex, overshoot) = if new_distance < 0.0 {
            (element.start, -new_distance)
        } else {
            (element.end, new_distance - element.charge_path_length)
        };

        let chosen = candidate_locations(elements, counts, vertex, overshoot, charge.charge)
            .into_iter()
            .min_by(|a, b| a.density.total_cmp(&b.density));

        if let Some(location) = chosen {
            trace!(
                "charge moved from {} to {} at {:.2}",
                charge.element,
                location.element,
                location.distance
            );
            if let Some(count) = counts.get_mut(&charge.element) {
                *count = count.saturating_sub(1);
            }
            *counts.entry(location.element).or_default() += 1;
            charge.element = location.element;
            charge.distance = location.distance;
        }
    }

    /// Nudge every particle towards the midpoint of its neighbours, in a
    /// shuffled order.
    fn equalize_all(
        &mut self,
        charges: &mut [Charge],
        elements: &BTreeMap<ElementId, CircuitElement>,
        dt: f64,
    ) {
        let mut indices: Vec<usize> = (0..charges.len()).collect();
        indices.shuffle(&mut self.rng);

        for index in indices {
            let Some(element) = elements.get(&charges[index].element) else {
                continue;
            };
            if element.charge_layout_dirty || element.current.abs() < MINIMUM_CURRENT {
                continue;
            }
            equalize_charge(charges, index, element, dt);
        }
    }
}

impl Default for ChargeAnimator {
    fn default() -> Self {
        Self::new(0)
    }
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Move a particle between two others on the same element closer to their
/// midpoint. Particles never move against the current.
fn equalize_charge(charges: &mut [Charge], index: usize, element: &CircuitElement, dt: f64) {
    let charge = charges[index];

    let mut siblings: Vec<(f64, usize)> = charges
        .iter()
        .enumerate()
        .filter(|(_, c)| c.element == charge.element)
        .map(|(i, c)| (c.distance, i))
        .collect();
    siblings.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let Some(position) = siblings.iter().position(|&(_, i)| i == index) else {
        return;
    };
    if position == 0 || position + 1 >= siblings.len() {
        return;
    }
    let lower = siblings[position - 1].0;
    let upper = siblings[position + 1].0;

    let current_position = charge.distance;
    let midpoint = lower + (upper - lower) / 2.0;
    if sign(midpoint - current_position) != sign(element.current * charge.charge) {
        return;
    }

    let step = (5.5 / NUMBER_OF_EQUALIZE_STEPS as f64 * SPEED_SCALE * dt).abs();
    let desired = if (midpoint - current_position).abs() > step {
        if midpoint < current_position {
            current_position - step
        } else {
            current_position + step
        }
    } else {
        midpoint
    };

    if element.contains_distance(desired) {
        charges[index].distance = desired;
    }
}

/// Elements at `vertex` carrying current away from it, with the entry
/// distance a particle would take on each.
fn candidate_locations(
    elements: &BTreeMap<ElementId, CircuitElement>,
    counts: &HashMap<ElementId, usize>,
    vertex: VertexId,
    overshoot: f64,
    charge: f64,
) -> Vec<CircuitLocation> {
    elements
        .values()
        .filter(|neighbor| neighbor.contains_vertex(vertex))
        .filter_map(|neighbor| {
            let current = neighbor.current * charge;
            let length = neighbor.charge_path_length;
            let distance = if current > MINIMUM_CURRENT && neighbor.start == vertex {
                overshoot.clamp(0.0, length)
            } else if current < -MINIMUM_CURRENT && neighbor.end == vertex {
                (length - overshoot).clamp(0.0, length)
            } else {
                return None;
            };
            Some(CircuitLocation {
                element: neighbor.id,
                distance,
                density: density(elements, counts, neighbor, distance),
            })
        })
        .collect()
}

/// Particles per unit length on `element`. Empty short elements report the
/// mean density of the elements downstream of `distance`.
fn density(
    elements: &BTreeMap<ElementId, CircuitElement>,
    counts: &HashMap<ElementId, usize>,
    element: &CircuitElement,
    distance: f64,
) -> f64 {
    let per_length =
        |e: &CircuitElement| counts.get(&e.id).copied().unwrap_or(0) as f64 / e.charge_path_length;

    let density = per_length(element);
    if density != 0.0 || element.charge_path_length >= SHORT_SEGMENT_LENGTH {
        return density;
    }

    let distance_from_start = distance.abs();
    let distance_from_end = (element.charge_path_length - distance).abs();
    let downstream = if distance_from_start < distance_from_end {
        element.end
    } else {
        element.start
    };

    let densities: Vec<f64> = elements
        .values()
        .filter(|e| e.contains_vertex(downstream))
        .map(per_length)
        .collect();
    if densities.is_empty() {
        density
    } else {
        densities.iter().sum::<f64>() / densities.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ElementKind, Wire};
    use approx::assert_abs_diff_eq;

    fn wire(id: usize, start: usize, end: usize, length: f64, current: f64) -> CircuitElement {
        let mut element = CircuitElement::new(
            ElementId(id),
            VertexId(start),
            VertexId(end),
            ElementKind::Wire(Wire::default()),
        );
        element.set_length(length);
        element.current = current;
        element.charge_layout_dirty = false;
        element
    }

    fn elements(list: Vec<CircuitElement>) -> BTreeMap<ElementId, CircuitElement> {
        list.into_iter().map(|e| (e.id, e)).collect()
    }

    #[test]
    fn test_running_average() {
        let mut average = RunningAverage::new(2);
        assert_eq!(average.update(1.0), 1.0);
        assert_eq!(average.update(3.0), 2.0);
        assert_eq!(average.update(5.0), 4.0);
    }

    #[test]
    fn test_charge_moves_with_current() {
        let elements = elements(vec![wire(0, 0, 1, 100.0, 1.0)]);
        let mut charges = vec![Charge::new(ElementId(0), 50.0, 1.0)];
        let mut animator = ChargeAnimator::new(1);

        animator.step(&mut charges, &elements, 0.02);
        assert_abs_diff_eq!(charges[0].distance, 50.0 + 25.0 * 0.02, epsilon = 1e-12);

        // Electrons move against conventional current
        let mut electrons = vec![Charge::new(ElementId(0), 50.0, -1.0)];
        animator.step(&mut electrons, &elements, 0.02);
        assert!(electrons[0].distance < 50.0);
    }

    #[test]
    fn test_small_current_is_still() {
        let elements = elements(vec![wire(0, 0, 1, 100.0, 1e-4)]);
        let mut charges = vec![Charge::new(ElementId(0), 50.0, 1.0)];
        ChargeAnimator::default().step(&mut charges, &elements, 0.02);
        assert_eq!(charges[0].distance, 50.0);
    }

    #[test]
    fn test_dt_is_capped() {
        let elements = elements(vec![wire(0, 0, 1, 100.0, 0.2)]);
        let mut charges = vec![Charge::new(ElementId(0), 10.0, 1.0)];
        ChargeAnimator::default().step(&mut charges, &elements, 1.0);
        assert_abs_diff_eq!(charges[0].distance, 10.0 + 0.2 * 25.0 * MAX_DT, epsilon = 1e-12);
    }

    #[test]
    fn test_fast_current_slows_time() {
        let elements = elements(vec![wire(0, 0, 1, 1000.0, 100.0)]);
        let mut charges = vec![Charge::new(ElementId(0), 500.0, 1.0)];
        let mut animator = ChargeAnimator::default();
        animator.step(&mut charges, &elements, MAX_DT);

        assert!(animator.time_scale() < 1.0);
        assert_abs_diff_eq!(charges[0].distance, 500.0 + MAX_POSITION_CHANGE, epsilon = 1e-9);
    }

    #[test]
    fn test_handoff_prefers_lower_density() {
        // Junction at vertex 1 feeding two branches
        let elements = elements(vec![
            wire(0, 0, 1, 100.0, 2.0),
            wire(1, 1, 2, 100.0, 1.0),
            wire(2, 1, 3, 100.0, 1.0),
        ]);
        let mut charges = vec![
            Charge::new(ElementId(0), 99.9, 1.0),
            Charge::new(ElementId(1), 50.0, 1.0),
            Charge::new(ElementId(1), 80.0, 1.0),
            Charge::new(ElementId(2), 80.0, 1.0),
        ];
        ChargeAnimator::default().step(&mut charges, &elements, 0.01);

        assert_eq!(charges[0].element, ElementId(2));
        assert_abs_diff_eq!(charges[0].distance, 99.9 + 0.5 - 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reverse_current_exits_through_start() {
        // Current runs end to start, so the particle leaves through vertex 0
        let elements = elements(vec![
            wire(0, 0, 1, 100.0, -1.0),
            wire(1, 2, 0, 100.0, -1.0),
        ]);
        let mut charges = vec![Charge::new(ElementId(0), 0.1, 1.0)];
        ChargeAnimator::default().step(&mut charges, &elements, 0.02);

        assert_eq!(charges[0].element, ElementId(1));
        assert_abs_diff_eq!(charges[0].distance, 100.0 - 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_handoff_onto_exact_start() {
        // Landing exactly on a junction is still a valid location
        let elements = elements(vec![wire(0, 0, 1, 100.0, 4.0), wire(1, 1, 2, 100.0, 4.0)]);
        let mut charges = vec![Charge::new(ElementId(0), 100.0, 1.0)];
        let animator = ChargeAnimator::default();
        animator.propagate(&mut charges[0], &elements, &mut HashMap::new(), 0.0);
        assert_eq!(charges[0].element, ElementId(0));

        let mut counts = HashMap::new();
        let locations = candidate_locations(&elements, &counts, VertexId(1), 0.0, 1.0);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].distance, 0.0);

        animator.propagate(&mut charges[0], &elements, &mut counts, 0.01);
        assert_eq!(charges[0].element, ElementId(1));
        assert_abs_diff_eq!(charges[0].distance, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_equalize_moves_towards_midpoint() {
        let element = wire(0, 0, 1, 200.0, 1.0);
        let mut charges = vec![
            Charge::new(ElementId(0), 10.0, 1.0),
            Charge::new(ElementId(0), 20.0, 1.0),
            Charge::new(ElementId(0), 110.0, 1.0),
        ];
        equalize_charge(&mut charges, 1, &element, 0.01);
        // Midpoint is 60 but one step is 5.5 / 2 * 25 * 0.01
        assert_abs_diff_eq!(charges[1].distance, 20.0 + 0.6875, epsilon = 1e-12);

        // Never pushed against the current
        let mut backwards = vec![
            Charge::new(ElementId(0), 10.0, 1.0),
            Charge::new(ElementId(0), 100.0, 1.0),
            Charge::new(ElementId(0), 110.0, 1.0),
        ];
        equalize_charge(&mut backwards, 1, &element, 0.01);
        assert_eq!(backwards[1].distance, 100.0);
    }

    #[test]
    fn test_seeded_runs_match() {
        let elements = elements(vec![wire(0, 0, 1, 300.0, 1.0)]);
        let initial: Vec<Charge> = [14.0, 30.0, 90.0, 100.0, 200.0, 286.0]
            .iter()
            .map(|&d| Charge::new(ElementId(0), d, 1.0))
            .collect();

        let run = |seed| {
            let mut animator = ChargeAnimator::new(seed);
            let mut charges = initial.clone();
            for _ in 0..20 {
                animator.step(&mut charges, &elements, 1.0 / 60.0);
            }
            charges
        };
        assert_eq!(run(3), run(3));
    }
}
