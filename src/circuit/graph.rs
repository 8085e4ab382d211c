//! The live circuit graph.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use log::{debug, warn};

use super::config::CircuitConfig;
use super::types::{angle_of, polar, CurrentType, ElementId, Point, VertexId};
use super::validate::validate_element;
use super::vertex::Vertex;
use crate::charges::{layout_charges, Charge, ChargeAnimator};
use crate::components::{CircuitElement, ElementKind, Wire};
use crate::error::{CircuitError, Result};
use crate::solver::solve_circuit;

/// Distance a cut vertex's new copies are pushed away from it.
const CUT_DISTANCE: f64 = 30.0;

/// Notifications for the host, drained with [`Circuit::drain_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitEvent {
    VertexAdded(VertexId),
    VertexRemoved(VertexId),
    ElementAdded(ElementId),
    ElementRemoved(ElementId),
    /// Currents and voltages were recomputed
    CircuitChanged,
    FuseTripped(ElementId),
}

/// A circuit: vertices, the elements between them and their particles.
///
/// Topology edits mark the circuit dirty; the next [`step`](Circuit::step)
/// re-solves it.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub(crate) vertices: BTreeMap<VertexId, Vertex>,
    pub(crate) elements: BTreeMap<ElementId, CircuitElement>,
    pub(crate) charges: Vec<Charge>,
    pub(crate) animator: ChargeAnimator,
    pub(crate) config: CircuitConfig,
    pub(crate) time: f64,
    pub(crate) dirty: bool,
    next_vertex_id: usize,
    next_element_id: usize,
    events: Vec<CircuitEvent>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Create an empty circuit with default configuration.
    pub fn new() -> Self {
        Self::build(CircuitConfig::default())
    }

    /// Create an empty circuit with custom configuration.
    pub fn with_config(config: CircuitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CircuitConfig) -> Self {
        Self {
            vertices: BTreeMap::new(),
            elements: BTreeMap::new(),
            charges: Vec::new(),
            animator: ChargeAnimator::new(config.seed),
            config,
            time: 0.0,
            dirty: false,
            next_vertex_id: 0,
            next_element_id: 0,
            events: Vec::new(),
        }
    }

    // ============ Queries ============

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a re-solve on the next step.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn element(&self, id: ElementId) -> Option<&CircuitElement> {
        self.elements.get(&id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &CircuitElement> {
        self.elements.values()
    }

    pub fn charges(&self) -> &[Charge] {
        &self.charges
    }

    /// Animation slowdown, 1 is full speed.
    pub fn time_scale(&self) -> f64 {
        self.animator.time_scale()
    }

    pub(crate) fn vertex_or_err(&self, id: VertexId) -> Result<&Vertex> {
        self.vertices
            .get(&id)
            .ok_or(CircuitError::VertexNotFound { vertex: id })
    }

    pub(crate) fn element_or_err(&self, id: ElementId) -> Result<&CircuitElement> {
        self.elements
            .get(&id)
            .ok_or(CircuitError::ElementNotFound { element: id })
    }

    fn element_mut(&mut self, id: ElementId) -> Result<&mut CircuitElement> {
        self.elements
            .get_mut(&id)
            .ok_or(CircuitError::ElementNotFound { element: id })
    }

    /// Elements with a terminal on `vertex`, in id order.
    pub fn neighbor_elements(&self, vertex: VertexId) -> Vec<ElementId> {
        self.elements
            .values()
            .filter(|e| e.contains_vertex(vertex))
            .map(|e| e.id)
            .collect()
    }

    /// `V(start) - V(end)` from the last solve.
    pub fn element_voltage_drop(&self, id: ElementId) -> Result<f64> {
        let element = self.element_or_err(id)?;
        let start = self.vertex_or_err(element.start)?;
        let end = self.vertex_or_err(element.end)?;
        Ok(start.voltage - end.voltage)
    }

    /// True when the element touches no other element.
    pub fn is_single(&self, id: ElementId) -> Result<bool> {
        let element = self.element_or_err(id)?;
        Ok(self.neighbor_elements(element.start).len() == 1
            && self.neighbor_elements(element.end).len() == 1)
    }

    /// Where a particle is drawn, and the direction of its element (radians).
    pub fn charge_position(&self, charge: &Charge) -> Option<(Point, f64)> {
        let element = self.elements.get(&charge.element)?;
        let start = self.vertices.get(&element.start)?.position;
        let end = self.vertices.get(&element.end)?.position;
        let t = charge.distance / element.charge_path_length;
        Some((start.lerp(&end, t), angle_of(&(end - start))))
    }

    /// Take the pending events.
    pub fn drain_events(&mut self) -> Vec<CircuitEvent> {
        std::mem::take(&mut self.events)
    }

    // ============ Topology edits ============

    /// Add a free vertex.
    pub fn create_vertex(&mut self, position: Point) -> VertexId {
        let id = VertexId(self.next_vertex_id);
        self.insert_vertex(Vertex::new(id, position));
        id
    }

    /// Add a fixed boundary vertex that is never removed when orphaned.
    pub fn create_black_box_vertex(&mut self, position: Point) -> VertexId {
        let id = VertexId(self.next_vertex_id);
        self.insert_vertex(Vertex::black_box_interface(id, position));
        id
    }

    fn insert_vertex(&mut self, vertex: Vertex) {
        let id = vertex.id;
        self.next_vertex_id = self.next_vertex_id.max(id.0.saturating_add(1));
        self.vertices.insert(id, vertex);
        self.events.push(CircuitEvent::VertexAdded(id));
    }

    /// Add an element between two vertices. Unknown vertex ids are created
    /// at the origin.
    pub fn add_element(
        &mut self,
        start: VertexId,
        end: VertexId,
        kind: ElementKind,
    ) -> Result<ElementId> {
        validate_element(&kind)?;
        if start == end {
            return Err(CircuitError::DegenerateElement { vertex: start });
        }

        // The id counter must stay above every vertex id
        for vertex in [start, end] {
            if vertex.0 == usize::MAX && !self.vertices.contains_key(&vertex) {
                return Err(CircuitError::invalid_parameter(
                    kind.type_name(),
                    "vertex",
                    format!("{vertex} is out of range"),
                ));
            }
        }

        for vertex in [start, end] {
            if !self.vertices.contains_key(&vertex) {
                self.insert_vertex(Vertex::new(vertex, Point::zeros()));
            }
        }

        let id = ElementId(self.next_element_id);
        self.next_element_id += 1;

        let mut element = CircuitElement::new(id, start, end, kind);
        element.set_length(self.distance_between(start, end));
        self.elements.insert(id, element);

        debug!("added element {id} between {start} and {end}");
        self.events.push(CircuitEvent::ElementAdded(id));
        self.dirty = true;
        Ok(id)
    }

    /// Add an element between two new vertices at the given positions.
    pub fn add_element_at(
        &mut self,
        start: Point,
        end: Point,
        kind: ElementKind,
    ) -> Result<ElementId> {
        validate_element(&kind)?;
        let start = self.create_vertex(start);
        let end = self.create_vertex(end);
        self.add_element(start, end, kind)
    }

    /// Add a wire with the configured resistivity.
    pub fn add_wire(&mut self, start: VertexId, end: VertexId) -> Result<ElementId> {
        let wire = Wire::new(self.config.wire_resistivity);
        self.add_element(start, end, ElementKind::Wire(wire))
    }

    /// Remove an element and any vertex it leaves orphaned.
    pub fn remove_element(&mut self, id: ElementId) -> Result<()> {
        let element = self
            .elements
            .remove(&id)
            .ok_or(CircuitError::ElementNotFound { element: id })?;
        self.charges.retain(|c| c.element != id);
        self.events.push(CircuitEvent::ElementRemoved(id));

        self.remove_vertex_if_orphaned(element.start);
        self.remove_vertex_if_orphaned(element.end);
        self.dirty = true;
        Ok(())
    }

    fn remove_vertex_if_orphaned(&mut self, vertex: VertexId) {
        let orphaned = self
            .vertices
            .get(&vertex)
            .is_some_and(|v| !v.black_box_interface)
            && self.neighbor_elements(vertex).is_empty();
        if orphaned {
            self.vertices.remove(&vertex);
            self.events.push(CircuitEvent::VertexRemoved(vertex));
        }
    }

    /// Move a vertex; attached elements follow with their new lengths.
    pub fn move_vertex(&mut self, id: VertexId, position: Point) -> Result<()> {
        let vertex = self
            .vertices
            .get_mut(&id)
            .ok_or(CircuitError::VertexNotFound { vertex: id })?;
        vertex.position = position;
        self.refresh_lengths(id);
        self.dirty = true;
        Ok(())
    }

    fn distance_between(&self, a: VertexId, b: VertexId) -> f64 {
        match (self.vertices.get(&a), self.vertices.get(&b)) {
            (Some(a), Some(b)) => (b.position - a.position).norm(),
            _ => 0.0,
        }
    }

    /// Recompute the lengths of the elements attached to `vertex`.
    fn refresh_lengths(&mut self, vertex: VertexId) {
        for id in self.neighbor_elements(vertex) {
            let Some((start, end)) = self.elements.get(&id).map(|e| (e.start, e.end)) else {
                continue;
            };
            let length = self.distance_between(start, end);
            if let Some(element) = self.elements.get_mut(&id) {
                element.set_length(length);
            }
        }
    }

    /// Open or close a switch.
    pub fn set_switch_closed(&mut self, id: ElementId, closed: bool) -> Result<()> {
        match &mut self.element_mut(id)?.kind {
            ElementKind::Switch(switch) => switch.set_state(closed),
            other => {
                return Err(CircuitError::invalid_operation(format!(
                    "{id} is a {}, not a switch",
                    other.type_name()
                )))
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Restore a tripped fuse.
    pub fn reset_fuse(&mut self, id: ElementId) -> Result<()> {
        match &mut self.element_mut(id)?.kind {
            ElementKind::Fuse(fuse) => fuse.reset(),
            other => {
                return Err(CircuitError::invalid_operation(format!(
                    "{id} is a {}, not a fuse",
                    other.type_name()
                )))
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Change an element's parameters. The edit is rejected, leaving the
    /// element untouched, when the result fails validation.
    pub fn modify_element(
        &mut self,
        id: ElementId,
        edit: impl FnOnce(&mut ElementKind),
    ) -> Result<()> {
        let element = self.element_mut(id)?;
        let mut kind = element.kind.clone();
        edit(&mut kind);
        validate_element(&kind)?;

        element.kind = kind;
        let length = element.charge_path_length;
        element.set_length(length);
        self.dirty = true;
        Ok(())
    }

    /// Swap an element's terminals.
    pub fn flip(&mut self, id: ElementId) -> Result<()> {
        let element = self.element_mut(id)?;
        std::mem::swap(&mut element.start, &mut element.end);
        element.current = -element.current;
        element.current_sense = element.current_sense.flipped();
        element.charge_layout_dirty = true;
        self.dirty = true;
        Ok(())
    }

    /// Discharge every capacitor and collapse every inductor field.
    pub fn clear_dynamics(&mut self) {
        for element in self.elements.values_mut() {
            element.clear_dynamics();
        }
        self.dirty = true;
    }

    /// Switch between electron and conventional particles.
    pub fn set_current_type(&mut self, current_type: CurrentType) {
        self.config.current_type = current_type;
        for element in self.elements.values_mut() {
            element.charge_layout_dirty = true;
        }
        self.layout_dirty_charges();
    }

    /// Split a junction so every interactive element attached to it gets its
    /// own new vertex. The new vertices are pushed apart so the pieces do not
    /// overlap. Returns the new vertices.
    pub fn cut_vertex(&mut self, id: VertexId) -> Result<Vec<VertexId>> {
        let position = self.vertex_or_err(id)?.position;
        let mut neighbors = self.neighbor_elements(id);
        if neighbors.len() <= 1 {
            return Ok(Vec::new());
        }
        neighbors.retain(|n| self.elements.get(n).is_some_and(|e| e.interactive));
        if neighbors.is_empty() {
            return Ok(Vec::new());
        }

        let mut translations = self.cut_translations(id, position, &neighbors);
        let mut angles: Vec<f64> = translations.iter().map(angle_of).collect();

        if neighbors.len() > 2 {
            // Order by angle so the pieces do not cross when spread out
            let mut order: Vec<(f64, ElementId)> =
                angles.iter().copied().zip(neighbors.iter().copied()).collect();
            order.sort_by(|a, b| a.0.total_cmp(&b.0));
            neighbors = order.into_iter().map(|(_, n)| n).collect();
            translations = self.cut_translations(id, position, &neighbors);
            angles = translations.iter().map(angle_of).collect();
        }

        let count = neighbors.len();
        let separation = TAU / count as f64;
        let center_angle = angles.iter().sum::<f64>() / count as f64;

        let results: Vec<Point> = if count == 2 {
            let a = polar(CUT_DISTANCE, center_angle - separation / 2.0);
            let b = polar(CUT_DISTANCE, center_angle + separation / 2.0);
            if angles[0] - center_angle < 0.0 {
                vec![a, b]
            } else {
                vec![b, a]
            }
        } else {
            let distance = if count <= 5 {
                CUT_DISTANCE
            } else {
                count as f64 * CUT_DISTANCE / 5.0
            };
            (0..count)
                .map(|k| polar(distance, separation * k as f64 + angles[0]))
                .collect()
        };

        let mut created = Vec::with_capacity(count);
        for (element_id, delta) in neighbors.into_iter().zip(results) {
            let new_vertex = self.create_vertex(position);
            if let Some(element) = self.elements.get_mut(&element_id) {
                element.replace_vertex(id, new_vertex);
            }
            self.translate_vertex_group(new_vertex, delta);
            created.push(new_vertex);
        }

        self.remove_vertex_if_orphaned(id);
        self.dirty = true;
        Ok(created)
    }

    /// Offsets of length [`CUT_DISTANCE`] pointing from `vertex` towards each
    /// element's far end.
    fn cut_translations(&self, vertex: VertexId, position: Point, neighbors: &[ElementId]) -> Vec<Point> {
        neighbors
            .iter()
            .enumerate()
            .map(|(k, id)| {
                let opposite = self
                    .elements
                    .get(id)
                    .and_then(|e| e.opposite_vertex(vertex))
                    .and_then(|v| self.vertices.get(&v))
                    .map_or(position, |v| v.position);
                let mut delta = opposite - position;
                // Coincident ends get a spread of directions instead
                if delta.norm() == 0.0 {
                    delta = polar(1.0, TAU * k as f64 / neighbors.len() as f64);
                }
                delta.normalize() * CUT_DISTANCE
            })
            .collect()
    }

    /// Move every vertex joined to `vertex` by fixed-length elements.
    /// Vertices pinned to a boundary vertex stay put.
    fn translate_vertex_group(&mut self, vertex: VertexId, delta: Point) {
        let group = self.find_all_fixed_vertices(vertex);
        let movable: Vec<VertexId> = group
            .into_iter()
            .filter(|v| {
                self.vertices.get(v).is_some_and(|v| v.draggable)
                    && !self.has_fixed_connection_to_black_box(*v)
            })
            .collect();

        for v in &movable {
            if let Some(vertex) = self.vertices.get_mut(v) {
                vertex.position += delta;
            }
        }
        for v in movable {
            self.refresh_lengths(v);
        }
    }

    /// Merge `old` into `target`: every element on `old` moves to `target`
    /// and `old` is removed. A boundary vertex always survives the merge.
    pub fn connect(&mut self, target: VertexId, old: VertexId) -> Result<()> {
        if target == old {
            return Err(CircuitError::invalid_operation(format!(
                "cannot connect {target} to itself"
            )));
        }
        let target_vertex = self.vertex_or_err(target)?;
        let old_vertex = self.vertex_or_err(old)?;
        if !target_vertex.attachable || !old_vertex.attachable {
            return Err(CircuitError::invalid_operation(format!(
                "{target} and {old} must both be attachable"
            )));
        }

        if old_vertex.black_box_interface {
            if target_vertex.black_box_interface {
                return Err(CircuitError::invalid_operation(
                    "cannot connect two boundary vertices",
                ));
            }
            return self.connect(old, target);
        }

        if self
            .elements
            .values()
            .any(|e| e.contains_vertex(target) && e.contains_vertex(old))
        {
            return Err(CircuitError::DegenerateElement { vertex: target });
        }

        for element in self.elements.values_mut() {
            if element.contains_vertex(old) {
                element.replace_vertex(old, target);
            }
        }
        self.vertices.remove(&old);
        self.events.push(CircuitEvent::VertexRemoved(old));
        self.refresh_lengths(target);
        self.dirty = true;
        Ok(())
    }

    // ============ Stepping ============

    /// Advance the simulation by `dt` seconds: re-solve when needed, update
    /// current senses and move the particles.
    pub fn step(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            debug!("ignoring step of {dt} s");
            return;
        }

        self.time += dt;
        let time = self.time;

        let mut time_dependent = false;
        for element in self.elements.values_mut() {
            match &mut element.kind {
                ElementKind::AcVoltage(ac) => {
                    ac.tick(time);
                    time_dependent = true;
                }
                ElementKind::Capacitor(_) | ElementKind::Inductor(_) => time_dependent = true,
                _ => {}
            }
        }

        if self.dirty || time_dependent {
            solve_circuit(self, dt);
            self.dirty = false;
            self.check_fuses();
            self.events.push(CircuitEvent::CircuitChanged);
        }

        self.determine_senses();
        self.layout_dirty_charges();
        self.animator.step(&mut self.charges, &self.elements, dt);
    }

    fn check_fuses(&mut self) {
        let mut tripped = Vec::new();
        for element in self.elements.values_mut() {
            let current = element.current;
            if let ElementKind::Fuse(fuse) = &mut element.kind {
                if fuse.check(current) {
                    warn!(
                        "fuse {} tripped at {current:.3} A (rating {} A)",
                        element.id, fuse.current_rating
                    );
                    tripped.push(element.id);
                }
            }
        }
        if !tripped.is_empty() {
            self.dirty = true;
            self.events
                .extend(tripped.into_iter().map(CircuitEvent::FuseTripped));
        }
    }

    /// Re-layout particles on elements whose geometry or polarity changed.
    pub(crate) fn layout_dirty_charges(&mut self) {
        let sign = self.config.current_type.charge_sign();
        for element in self.elements.values_mut() {
            if element.charge_layout_dirty {
                layout_charges(&mut self.charges, element, sign);
                element.charge_layout_dirty = false;
            }
        }
    }
}
