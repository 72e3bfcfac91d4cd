// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # fibergt analysis
//!
//! Physical and flow-based descriptors of weighted network graphs:
//!
//! - **Resistive transport**: effective resistance between two boundary
//!   slabs from the pseudo-inverse of the weighted Laplacian
//! - **Boundary betweenness**: shortest-path and random-walk (current-flow)
//!   betweenness restricted to source and target sets
//! - **Nematic order** of edge orientations
//! - **Average nodal connectivity** through vertex-disjoint paths
//!
//! ```rust,ignore
//! use fibergt_analysis::{BoundaryCondition, ResistiveSolver};
//!
//! let bc = BoundaryCondition::new(0, [0.0, 10.0], [90.0, 100.0]);
//! let solution = ResistiveSolver::new(resistance).solve(&graph, &bc)?;
//! println!("R_eff = {}", solution.effective_resistance);
//! ```

pub mod betweenness;
pub mod connectivity;
pub mod error;
pub mod laplacian;
pub mod nematic;
pub mod resistive;

pub use betweenness::{
    boundary_edge_betweenness, nonlinear_random_walk_betweenness, random_walk_betweenness,
    vertex_boundary_betweenness, RandomWalkBetweenness,
};
pub use connectivity::{average_nodal_connectivity, local_node_connectivity};
pub use error::{Error, Result, Terminal};
pub use laplacian::{pseudo_inverse, weighted_adjacency, weighted_laplacian};
pub use nematic::{nematic_order, NematicOrder};
pub use resistive::{BoundaryCondition, ResistiveSolution, ResistiveSolver};
