// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON persistence for skeletons and graphs.
//!
//! Two records are provided:
//!
//! - [`SkeletonFrame`]: a particle-style point cloud (positions, per-particle
//!   type ids, optional sparse adjacency log). This is the artifact passed
//!   from skeleton extraction to graph tracing and read by viewers.
//! - [`GraphSnapshot`]: a complete graph including edge paths and weights.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{Edge, EdgeAttribute, Graph, Node};
use crate::skeleton::SkeletonPointSet;
use crate::voxel::{connector, Dim, Shape, Voxel};

/// Type id of skeleton path voxels.
pub const TYPE_EDGE: u32 = 0;
/// Type id of node voxels.
pub const TYPE_NODE: u32 = 1;

/// Point-cloud record of a skeleton, optionally carrying a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonFrame {
    pub dimension: u8,
    /// Mask extent along x, y and z.
    #[serde(rename = "box")]
    pub extent: [u32; 3],
    pub positions: Vec<[f32; 3]>,
    /// Names indexed by type id.
    pub types: Vec<String>,
    pub typeid: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<AdjacencyLog>,
}

/// Sparse adjacency log: one `(row, col, value)` triplet per edge, so
/// parallel edges and self-loops survive a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyLog {
    pub adj_rows: Vec<u32>,
    pub adj_cols: Vec<u32>,
    pub adj_values: Vec<f64>,
    /// Attribute the values were taken from; `None` means unit values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_attribute: Option<EdgeAttribute>,
}

impl SkeletonFrame {
    /// Record of raw skeleton voxels, all typed as path voxels.
    pub fn from_points(points: &SkeletonPointSet) -> Self {
        Self {
            dimension: points.dim().axes() as u8,
            extent: extent_of(points.shape()),
            positions: points.points().iter().map(position).collect(),
            types: type_names(),
            typeid: vec![TYPE_EDGE; points.len()],
            log: None,
        }
    }

    /// Record of a traced graph.
    ///
    /// Node origins come first, in node id order, typed as nodes. Edge path
    /// voxels that are not node origins follow, deduplicated. When `weight`
    /// is given, every edge must carry that attribute.
    pub fn from_graph(graph: &Graph, shape: Shape, weight: Option<EdgeAttribute>) -> Result<Self> {
        let values = graph.edge_weights(weight)?;
        let mut positions: Vec<[f32; 3]> = graph.nodes().iter().map(|n| position(&n.origin)).collect();
        let mut typeid = vec![TYPE_NODE; graph.node_count()];

        let mut seen: FxHashSet<Voxel> = graph.nodes().iter().map(|n| n.origin).collect();
        for e in graph.edges() {
            for p in &e.points {
                if seen.insert(*p) {
                    positions.push(position(p));
                    typeid.push(TYPE_EDGE);
                }
            }
        }

        let log = AdjacencyLog {
            adj_rows: graph.edges().iter().map(|e| e.source as u32).collect(),
            adj_cols: graph.edges().iter().map(|e| e.target as u32).collect(),
            adj_values: values,
            weight_attribute: weight,
        };

        Ok(Self {
            dimension: graph.dim().axes() as u8,
            extent: extent_of(shape),
            positions,
            types: type_names(),
            typeid,
            log: Some(log),
        })
    }

    pub fn dim(&self) -> Result<Dim> {
        Dim::from_axes(self.dimension as usize).ok_or_else(|| {
            Error::Serialization(format!("unsupported dimension {}", self.dimension))
        })
    }

    pub fn shape(&self) -> Shape {
        Shape::new(
            self.extent[0] as usize,
            self.extent[1] as usize,
            self.extent[2] as usize,
        )
    }

    /// All particle positions as a skeleton point set.
    pub fn to_point_set(&self) -> Result<SkeletonPointSet> {
        self.check_lengths()?;
        Ok(SkeletonPointSet::new(
            self.dim()?,
            self.shape(),
            self.positions.iter().map(voxel_of),
        ))
    }

    /// Rebuilds the graph stored in the adjacency log.
    ///
    /// Node-typed particles become nodes in record order. Edge paths are
    /// not stored, so each edge gets a straight lattice connector between its
    /// node origins.
    pub fn to_graph(&self) -> Result<Graph> {
        self.check_lengths()?;
        let log = self
            .log
            .as_ref()
            .ok_or_else(|| Error::Serialization("record has no adjacency log".into()))?;
        if log.adj_rows.len() != log.adj_cols.len() || log.adj_rows.len() != log.adj_values.len() {
            return Err(Error::Serialization(
                "adjacency log arrays differ in length".into(),
            ));
        }

        let mut graph = Graph::new(self.dim()?);
        for (p, &t) in self.positions.iter().zip(&self.typeid) {
            if t == TYPE_NODE {
                graph.add_node(voxel_of(p));
            }
        }

        for ((&row, &col), &value) in log.adj_rows.iter().zip(&log.adj_cols).zip(&log.adj_values) {
            let (a, b) = (row as usize, col as usize);
            graph.check_node(a)?;
            graph.check_node(b)?;
            let path = connector(graph.node(a).origin, graph.node(b).origin);
            let e = graph.add_edge(a, b, path);
            match log.weight_attribute {
                Some(EdgeAttribute::Length) => graph.weights_mut(e).length = Some(value),
                Some(EdgeAttribute::Width) => graph.weights_mut(e).width = Some(value),
                Some(EdgeAttribute::Area) => graph.weights_mut(e).area = Some(value),
                Some(EdgeAttribute::Conductance) => graph.weights_mut(e).conductance = Some(value),
                None => {}
            }
        }
        Ok(graph)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Writes the record in one bulk write.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    fn check_lengths(&self) -> Result<()> {
        if self.positions.len() != self.typeid.len() {
            return Err(Error::Serialization(format!(
                "{} positions but {} type ids",
                self.positions.len(),
                self.typeid.len()
            )));
        }
        Ok(())
    }
}

/// Serializable representation of a full graph.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub dim: Dim,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Serializes the graph to JSON.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = GraphSnapshot {
            dim: self.dim(),
            nodes: self.nodes().to_vec(),
            edges: self.edges().to_vec(),
        };
        serde_json::to_string_pretty(&snapshot).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes a graph from JSON, validating edge endpoints.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: GraphSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut graph = Graph::new(snapshot.dim);
        for n in &snapshot.nodes {
            graph.add_node(n.origin);
        }
        for e in snapshot.edges {
            let idx = graph.try_add_edge(e.source, e.target, e.points)?;
            *graph.weights_mut(idx) = e.weights;
        }
        Ok(graph)
    }
}

fn type_names() -> Vec<String> {
    vec!["Edge".to_string(), "Node".to_string()]
}

fn extent_of(shape: Shape) -> [u32; 3] {
    [shape.x as u32, shape.y as u32, shape.z as u32]
}

fn position(v: &Voxel) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

fn voxel_of(p: &[f32; 3]) -> Voxel {
    Voxel::round([p[0] as f64, p[1] as f64, p[2] as f64])
}
