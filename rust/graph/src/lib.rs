// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # fibergt graph
//!
//! Graph representation of filamentary networks (nanowire mats, fibre
//! networks) traced from one-voxel-wide skeletons.
//!
//! The crate covers everything between a skeleton point set and a
//! weighted-ready graph: the lattice types, a spatial index over voxels,
//! skeleton tracing into an undirected multigraph, rotation correction,
//! structural descriptors and JSON persistence.
//!
//! ```rust,ignore
//! use fibergt_graph::{GraphBuilder, SkeletonPointSet};
//!
//! let graph = GraphBuilder::new(true).build(&points);
//! println!("{} nodes, diameter {:?}", graph.node_count(), graph.diameter());
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod paths;
pub mod serialization;
pub mod skeleton;
pub mod spatial;
pub mod structural;
pub mod transform;
pub mod voxel;

pub use builder::{build, GraphBuilder};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeAttribute, EdgeWeights, Graph, JunctionResistance, Node};
pub use paths::{validate_weights, ShortestPathDag};
pub use serialization::{AdjacencyLog, GraphSnapshot, SkeletonFrame, TYPE_EDGE, TYPE_NODE};
pub use skeleton::SkeletonPointSet;
pub use spatial::VoxelIndex;
pub use transform::RotationPlan;
pub use voxel::{connector, Dim, Shape, Voxel, VoxelBox};
