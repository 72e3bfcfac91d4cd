// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network graph traced from a skeleton.
//!
//! - **Nodes** = junction and endpoint voxels (skeleton degree != 2)
//! - **Edges** = voxel paths between nodes, carrying optional physical
//!   weights (length, width, area, conductance)
//!
//! The graph is an undirected multigraph: self-loops and parallel edges are
//! legal and stay distinct. Node ids are dense indices. `Clone` is a deep
//! copy, and every analysis that adds ghost nodes works on a clone so that
//! one base graph can serve several analyses at once.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::voxel::{Dim, Voxel, VoxelBox};

/// A junction or endpoint of the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Voxel the node represents.
    pub origin: Voxel,
}

/// Physical weights attached to an edge by edge weighting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    /// Path-averaged width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Width sampled at every path point.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub width_profile: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conductance: Option<f64>,
}

/// Scalar edge attribute usable as a weight by graph algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeAttribute {
    Length,
    Width,
    Area,
    Conductance,
}

impl fmt::Display for EdgeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeAttribute::Length => "length",
            EdgeAttribute::Width => "width",
            EdgeAttribute::Area => "area",
            EdgeAttribute::Conductance => "conductance",
        };
        f.write_str(name)
    }
}

/// Contact resistance between filaments at a junction.
///
/// `Infinite` selects the unit-conductance regime in which every edge
/// conducts equally and geometry is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunctionResistance {
    Finite(f64),
    Infinite,
}

impl Default for JunctionResistance {
    fn default() -> Self {
        JunctionResistance::Finite(0.0)
    }
}

impl JunctionResistance {
    pub fn finite(self) -> Option<f64> {
        match self {
            JunctionResistance::Finite(r) => Some(r),
            JunctionResistance::Infinite => None,
        }
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, JunctionResistance::Infinite)
    }

    /// Rejects negative and non-finite resistances.
    pub fn validate(self) -> Result<Self> {
        match self {
            JunctionResistance::Finite(r) if !r.is_finite() || r < 0.0 => Err(Error::InvalidArgument(
                format!("junction resistance must be finite and non-negative, got {r}"),
            )),
            other => Ok(other),
        }
    }
}

impl EdgeWeights {
    pub fn get(&self, attribute: EdgeAttribute) -> Option<f64> {
        match attribute {
            EdgeAttribute::Length => self.length,
            EdgeAttribute::Width => self.width,
            EdgeAttribute::Area => self.area,
            EdgeAttribute::Conductance => self.conductance,
        }
    }
}

/// A path between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    /// Voxels from `source`'s origin to `target`'s origin, inclusive.
    pub points: Vec<Voxel>,
    #[serde(default)]
    pub weights: EdgeWeights,
}

impl Edge {
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }

    /// The node at the other end of this edge.
    pub fn opposite(&self, node: usize) -> usize {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

/// Undirected multigraph of a filamentary network.
#[derive(Debug, Clone)]
pub struct Graph {
    dim: Dim,
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    /// Adjacency list: node index → list of (neighbor index, edge index).
    /// A self-loop appears twice in its node's list.
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new(dim: Dim) -> Self {
        Self {
            dim,
            nodes: Vec::new(),
            edges: Vec::new(),
            adjacency: Vec::new(),
        }
    }

    pub fn dim(&self) -> Dim {
        self.dim
    }

    // =========================================================================
    // Graph mutation
    // =========================================================================

    /// Adds a node. Returns its id.
    pub fn add_node(&mut self, origin: Voxel) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node { origin });
        self.adjacency.push(Vec::new());
        idx
    }

    /// Adds an undirected edge with the given path.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is not a node of this graph.
    pub fn add_edge(&mut self, source: usize, target: usize, points: Vec<Voxel>) -> usize {
        let idx = self.edges.len();
        self.edges.push(Edge {
            source,
            target,
            points,
            weights: EdgeWeights::default(),
        });
        self.adjacency[source].push((target, idx));
        self.adjacency[target].push((source, idx));
        idx
    }

    /// Adds an edge after checking both endpoints exist.
    pub fn try_add_edge(&mut self, source: usize, target: usize, points: Vec<Voxel>) -> Result<usize> {
        self.check_node(source)?;
        self.check_node(target)?;
        Ok(self.add_edge(source, target, points))
    }

    /// Mutable access to an edge's weights.
    pub fn weights_mut(&mut self, edge: usize) -> &mut EdgeWeights {
        &mut self.edges[edge].weights
    }

    // =========================================================================
    // Graph accessors
    // =========================================================================

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edge(&self, id: usize) -> &Edge {
        &self.edges[id]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// (neighbor, edge) pairs incident to a node.
    pub fn incident(&self, node: usize) -> &[(usize, usize)] {
        &self.adjacency[node]
    }

    /// Distinct neighbours of a node, excluding itself.
    pub fn adjacent_nodes(&self, node: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.adjacency[node]
            .iter()
            .map(|&(neighbor, _)| neighbor)
            .filter(|&neighbor| neighbor != node)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Degree of a node. Self-loops count twice.
    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    pub fn check_node(&self, node: usize) -> Result<()> {
        if node < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::NodeOutOfRange {
                node,
                count: self.nodes.len(),
            })
        }
    }

    /// Per-edge weights for an attribute, or unit weights for `None`.
    pub fn edge_weights(&self, attribute: Option<EdgeAttribute>) -> Result<Vec<f64>> {
        match attribute {
            None => Ok(vec![1.0; self.edges.len()]),
            Some(attr) => self
                .edges
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    e.weights.get(attr).ok_or(Error::MissingAttribute {
                        edge: i,
                        attribute: attr,
                    })
                })
                .collect(),
        }
    }

    /// Half-open box spanning every node origin and edge point.
    pub fn bounds(&self) -> Option<VoxelBox> {
        let mut iter = self
            .nodes
            .iter()
            .map(|n| n.origin)
            .chain(self.edges.iter().flat_map(|e| e.points.iter().copied()));
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min = Voxel::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Voxel::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        Some(VoxelBox::new(min, Voxel::new(max.x + 1, max.y + 1, max.z + 1)))
    }

    // =========================================================================
    // Connected components
    // =========================================================================

    /// Returns connected components as ascending lists of node ids, ordered
    /// by their smallest member.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.node_count();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }

            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            visited[start] = true;
            queue.push_back(start);

            while let Some(node) = queue.pop_front() {
                component.push(node);
                for &(neighbor, _) in &self.adjacency[node] {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        components
    }

    /// Checks if the graph is connected (at most one component).
    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }

    /// Node ids of the component with the most nodes. Ties go to the
    /// component holding the lowest id.
    pub fn largest_component(&self) -> Vec<usize> {
        let mut best: Vec<usize> = Vec::new();
        for component in self.connected_components() {
            if component.len() > best.len() {
                best = component;
            }
        }
        best
    }

    /// Keeps only the largest component and renumbers nodes to `0..k-1`.
    ///
    /// Returns the number of nodes removed.
    pub fn reduce_to_largest_component(&mut self) -> usize {
        let keep = self.largest_component();
        let removed = self.node_count() - keep.len();
        if removed > 0 {
            *self = self.induced_subgraph(&keep);
        }
        removed
    }

    /// Subgraph on the given node ids.
    ///
    /// Surviving nodes are renumbered densely in ascending order of their old
    /// id; edges with both ends kept survive in their original order.
    pub fn induced_subgraph(&self, keep: &[usize]) -> Graph {
        let mut remap = vec![usize::MAX; self.node_count()];
        let mut sorted: Vec<usize> = keep
            .iter()
            .copied()
            .filter(|&id| id < self.node_count())
            .collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut out = Graph::new(self.dim);
        for &old in &sorted {
            remap[old] = out.add_node(self.nodes[old].origin);
        }
        for e in &self.edges {
            let (a, b) = (remap[e.source], remap[e.target]);
            if a != usize::MAX && b != usize::MAX {
                let idx = out.add_edge(a, b, e.points.clone());
                out.edges[idx].weights = e.weights.clone();
            }
        }
        out
    }

    /// Removes every node for which `keep` returns false, with its edges.
    pub fn retain_nodes(&mut self, mut keep: impl FnMut(usize, &Node) -> bool) -> usize {
        let kept: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, n)| keep(*i, n))
            .map(|(i, _)| i)
            .collect();
        let removed = self.node_count() - kept.len();
        if removed > 0 {
            *self = self.induced_subgraph(&kept);
        }
        removed
    }

    /// Applies a coordinate map to every node origin and edge point.
    pub fn map_coordinates(&mut self, mut f: impl FnMut(Voxel) -> Voxel) {
        for n in &mut self.nodes {
            n.origin = f(n.origin);
        }
        for e in &mut self.edges {
            for p in &mut e.points {
                *p = f(*p);
            }
        }
    }
}
