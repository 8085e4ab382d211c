//! MNA matrix assembly and solving.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::circuit::NodeId;
use crate::error::{CircuitError, Result};

/// Singular values below this are treated as zero by the least-squares fallback.
const SVD_EPSILON: f64 = 1e-12;

/// A resistor between two abstract nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MnaResistor {
    pub node0: NodeId,
    pub node1: NodeId,
    pub resistance: f64,
}

impl MnaResistor {
    pub fn new(node0: NodeId, node1: NodeId, resistance: f64) -> Self {
        Self {
            node0,
            node1,
            resistance,
        }
    }

    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }
}

/// An ideal voltage source with series resistance:
///   V(node1) - V(node0) = voltage - resistance * j
/// where j flows from node0 to node1 through the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MnaVoltageSource {
    pub node0: NodeId,
    pub node1: NodeId,
    pub voltage: f64,
    pub resistance: f64,
}

impl MnaVoltageSource {
    pub fn new(node0: NodeId, node1: NodeId, voltage: f64, resistance: f64) -> Self {
        Self {
            node0,
            node1,
            voltage,
            resistance,
        }
    }
}

/// A current injection. Current flows from node0 to node1 through the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MnaCurrent {
    pub node0: NodeId,
    pub node1: NodeId,
    pub current: f64,
}

impl MnaCurrent {
    pub fn new(node0: NodeId, node1: NodeId, current: f64) -> Self {
        Self {
            node0,
            node1,
            current,
        }
    }
}

/// MNA matrix system Ax = z.
#[derive(Debug, Clone)]
pub struct MnaMatrix {
    /// System matrix A
    pub a: DMatrix<f64>,
    /// Source vector z
    pub z: DVector<f64>,
    /// Matrix dimension
    pub size: usize,
}

impl MnaMatrix {
    /// Create a zeroed system of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: DMatrix::zeros(size, size),
            z: DVector::zeros(size),
            size,
        }
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[(row, col)] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Stamp a conductance between two nodes.
    /// For a conductance G between nodes n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: usize, n2: usize, g: f64) {
        self.add(n1, n1, g);
        self.add(n2, n2, g);
        self.add(n1, n2, -g);
        self.add(n2, n1, -g);
    }

    /// Stamp a voltage source from n0 to n1 with branch current at index br.
    ///   V[n1] - V[n0] + r * j = E
    pub fn stamp_voltage_source(
        &mut self,
        n0: usize,
        n1: usize,
        br: usize,
        voltage: f64,
        resistance: f64,
    ) {
        // j leaves n0 and enters n1
        self.add(n0, br, 1.0);
        self.add(n1, br, -1.0);

        self.add(br, n1, 1.0);
        self.add(br, n0, -1.0);
        self.add(br, br, resistance);
        self.add_source(br, voltage);
    }

    /// Stamp a current source between two nodes.
    /// Current flows from n0 to n1 through the source.
    pub fn stamp_current_source(&mut self, n0: usize, n1: usize, current: f64) {
        self.add_source(n0, -current);
        self.add_source(n1, current);
    }

    /// Replace the node's KCL row with V[node] = 0.
    pub fn fix_reference(&mut self, node: usize) {
        self.a.row_mut(node).fill(0.0);
        self.a[(node, node)] = 1.0;
        self.z[node] = 0.0;
    }

    /// Solve the system by LU decomposition, falling back to an SVD
    /// least-squares solution when the matrix is singular.
    ///
    /// The flag is true when the fallback was used.
    pub fn solve(&self) -> Result<(DVector<f64>, bool)> {
        if self.size == 0 {
            return Ok((DVector::zeros(0), false));
        }

        if let Some(x) = self.a.clone().lu().solve(&self.z) {
            if x.iter().all(|v| v.is_finite()) {
                return Ok((x, false));
            }
        }

        warn!(
            "singular system of size {}, using least-squares solution",
            self.size
        );
        let x = self
            .a
            .clone()
            .svd(true, true)
            .solve(&self.z, SVD_EPSILON)
            .map_err(|_| CircuitError::SingularSystem { size: self.size })?;
        if x.iter().all(|v| v.is_finite()) {
            Ok((x, true))
        } else {
            Err(CircuitError::SingularSystem { size: self.size })
        }
    }
}

/// A resistive network over abstract node ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MnaCircuit {
    pub resistors: Vec<MnaResistor>,
    pub sources: Vec<MnaVoltageSource>,
    pub currents: Vec<MnaCurrent>,
}

impl MnaCircuit {
    pub fn new(
        resistors: Vec<MnaResistor>,
        sources: Vec<MnaVoltageSource>,
        currents: Vec<MnaCurrent>,
    ) -> Self {
        Self {
            resistors,
            sources,
            currents,
        }
    }

    fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.resistors
            .iter()
            .map(|r| (r.node0, r.node1))
            .chain(self.sources.iter().map(|s| (s.node0, s.node1)))
            .chain(self.currents.iter().map(|c| (c.node0, c.node1)))
    }

    /// The smallest node of every connected component.
    fn reference_nodes(&self, index: &BTreeMap<NodeId, usize>) -> Vec<NodeId> {
        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        let mut parent: Vec<usize> = (0..index.len()).collect();
        for (a, b) in self.edges() {
            let ra = find(&mut parent, index[&a]);
            let rb = find(&mut parent, index[&b]);
            // Smaller root wins, so every root is its component's minimum
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }

        index
            .iter()
            .filter(|(_, &i)| find(&mut parent, i) == i)
            .map(|(node, _)| *node)
            .collect()
    }

    /// Assemble and solve the network.
    pub fn solve(&self) -> Result<MnaSolution> {
        let nodes: BTreeSet<NodeId> = self.edges().flat_map(|(a, b)| [a, b]).collect();
        let index: BTreeMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        let num_nodes = nodes.len();

        let mut matrix = MnaMatrix::new(num_nodes + self.sources.len());
        for r in &self.resistors {
            if r.node0 != r.node1 {
                matrix.stamp_conductance(index[&r.node0], index[&r.node1], r.conductance());
            }
        }
        for (k, s) in self.sources.iter().enumerate() {
            matrix.stamp_voltage_source(
                index[&s.node0],
                index[&s.node1],
                num_nodes + k,
                s.voltage,
                s.resistance,
            );
        }
        for c in &self.currents {
            matrix.stamp_current_source(index[&c.node0], index[&c.node1], c.current);
        }

        let references = self.reference_nodes(&index);
        for reference in &references {
            matrix.fix_reference(index[reference]);
        }
        debug!(
            "solving {} nodes, {} sources, {} reference nodes",
            num_nodes,
            self.sources.len(),
            references.len()
        );

        let (x, degraded) = matrix.solve()?;

        let node_voltages: BTreeMap<NodeId, f64> =
            index.iter().map(|(node, &i)| (*node, x[i])).collect();
        let source_currents = (0..self.sources.len()).map(|k| x[num_nodes + k]).collect();
        let resistor_currents = self
            .resistors
            .iter()
            .map(|r| (node_voltages[&r.node0] - node_voltages[&r.node1]) / r.resistance)
            .collect();

        Ok(MnaSolution {
            node_voltages,
            resistor_currents,
            source_currents,
            degraded,
        })
    }
}

/// Node voltages and branch currents of one solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MnaSolution {
    pub node_voltages: BTreeMap<NodeId, f64>,
    /// Current from node0 to node1, per resistor
    pub resistor_currents: Vec<f64>,
    /// Current from node0 to node1 through the source, per voltage source
    pub source_currents: Vec<f64>,
    /// The system was singular and this is a least-squares answer
    pub degraded: bool,
}

impl MnaSolution {
    /// Voltage of a node, if it took part in the solve.
    pub fn node_voltage(&self, node: NodeId) -> Option<f64> {
        self.node_voltages.get(&node).copied()
    }

    /// V(node0) - V(node1). Nodes outside the solve read as 0 V.
    pub fn voltage_drop(&self, node0: NodeId, node1: NodeId) -> f64 {
        self.node_voltage(node0).unwrap_or(0.0) - self.node_voltage(node1).unwrap_or(0.0)
    }

    pub fn resistor_current(&self, index: usize) -> f64 {
        self.resistor_currents.get(index).copied().unwrap_or(0.0)
    }

    pub fn source_current(&self, index: usize) -> f64 {
        self.source_currents.get(index).copied().unwrap_or(0.0)
    }
}
