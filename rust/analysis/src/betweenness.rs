// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Betweenness restricted to paths between a source set and a target set.
//!
//! - **Boundary edge / vertex betweenness** count shortest paths (hop count,
//!   or Dijkstra over an edge attribute) from every `s ∈ S` to every
//!   `t ∈ T`. Each ordered pair contributes `σ_st(x) / σ_st`; parallel edges
//!   are distinct paths.
//! - **Random-walk betweenness** replaces shortest paths with current flow.
//!   A ghost vertex is wired to every target so that current has a common
//!   exit, and flows come from the pseudo-inverse of the augmented
//!   Laplacian.

use fibergt_graph::{validate_weights, EdgeAttribute, Graph, Voxel};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::laplacian::{pseudo_inverse, weighted_adjacency, weighted_laplacian};

fn check_ids(graph: &Graph, ids: &[usize], role: &str) -> Result<()> {
    if let Some(&bad) = ids.iter().find(|&&i| i >= graph.node_count()) {
        return Err(Error::InvalidArgument(format!(
            "{role} node {bad} is out of range for {} nodes",
            graph.node_count()
        )));
    }
    Ok(())
}

/// Edge weights for `weight`, checked to be positive and finite.
fn path_weights(graph: &Graph, weight: Option<EdgeAttribute>) -> Result<Option<Vec<f64>>> {
    let Some(attr) = weight else {
        return Ok(None);
    };
    let w = graph
        .edge_weights(Some(attr))
        .map_err(|e| Error::InvalidArgument(e.to_string()))?;
    validate_weights(graph, &w).map_err(|e| Error::InvalidArgument(e.to_string()))?;
    Ok(Some(w))
}

/// Dependency accumulation shared by the edge and vertex variants.
/// Returns `(edge scores, vertex scores)`.
fn accumulate(
    graph: &Graph,
    sources: &[usize],
    targets: &[usize],
    weight: Option<EdgeAttribute>,
) -> Result<(Vec<f64>, Vec<f64>)> {
    check_ids(graph, sources, "source")?;
    check_ids(graph, targets, "target")?;
    let weights = path_weights(graph, weight)?;

    let n = graph.node_count();
    let mut is_target = vec![false; n];
    for &t in targets {
        is_target[t] = true;
    }

    let mut edge_scores = vec![0.0; graph.edge_count()];
    let mut vertex_scores = vec![0.0; n];
    let mut delta = vec![0.0; n];

    for &s in sources {
        let dag = graph.shortest_path_dag(s, weights.as_deref());
        delta.iter_mut().for_each(|d| *d = 0.0);
        for &w in dag.order.iter().rev() {
            let own = if is_target[w] && w != s { 1.0 } else { 0.0 };
            let coeff = own + delta[w];
            for &(v, e) in &dag.preds[w] {
                let c = dag.sigma[v] / dag.sigma[w] * coeff;
                edge_scores[e] += c;
                delta[v] += c;
            }
            if w != s {
                vertex_scores[w] += delta[w];
            }
        }
    }
    Ok((edge_scores, vertex_scores))
}

/// Shortest-path betweenness of every edge over `S × T` ordered pairs.
///
/// `weight` selects an edge attribute as path length; `None` counts hops.
pub fn boundary_edge_betweenness(
    graph: &Graph,
    sources: &[usize],
    targets: &[usize],
    weight: Option<EdgeAttribute>,
) -> Result<Vec<f64>> {
    Ok(accumulate(graph, sources, targets, weight)?.0)
}

/// Shortest-path betweenness of every vertex over `S × T`, excluding path
/// endpoints.
pub fn vertex_boundary_betweenness(
    graph: &Graph,
    sources: &[usize],
    targets: &[usize],
    weight: Option<EdgeAttribute>,
) -> Result<Vec<f64>> {
    Ok(accumulate(graph, sources, targets, weight)?.1)
}

/// Current-flow betweenness of the real edges plus the flow on each ghost
/// edge (one per target, in target order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomWalkBetweenness {
    pub edges: Vec<f64>,
    pub ghost_flows: Vec<f64>,
}

/// Augmented graph, edge weights, `Q` and `A` for the random-walk variants.
struct GhostSystem {
    graph: Graph,
    ghost: usize,
    pinv: DMatrix<f64>,
    adjacency: DMatrix<f64>,
}

impl GhostSystem {
    fn new(graph: &Graph, targets: &[usize], weight: Option<EdgeAttribute>) -> Result<Self> {
        let real = match path_weights(graph, weight)? {
            Some(w) => w,
            None => vec![1.0; graph.edge_count()],
        };
        let ghost_weight = if real.is_empty() {
            1.0
        } else {
            real.iter().sum::<f64>() / real.len() as f64
        };

        let mut augmented = graph.clone();
        let ghost_origin = centroid(graph, targets);
        let ghost = augmented.add_node(ghost_origin);
        for &t in targets {
            let to = augmented.node(t).origin;
            augmented.add_edge(t, ghost, fibergt_graph::connector(to, ghost_origin));
        }
        let mut weights = real;
        weights.resize(augmented.edge_count(), ghost_weight);

        let pinv = pseudo_inverse(&weighted_laplacian(&augmented, &weights))?;
        let adjacency = weighted_adjacency(&augmented, &weights);
        Ok(Self {
            graph: augmented,
            ghost,
            pinv,
            adjacency,
        })
    }

    /// `|ΔV| · A[u, v]` for every edge, given a potential per node.
    fn edge_flows(&self, potential: impl Fn(usize) -> f64) -> Vec<f64> {
        self.graph
            .edges()
            .iter()
            .map(|e| {
                if e.is_loop() {
                    0.0
                } else {
                    (potential(e.source) - potential(e.target)).abs()
                        * self.adjacency[(e.source, e.target)]
                }
            })
            .collect()
    }

    fn split(&self, flows: Vec<f64>, real_edges: usize) -> Result<RandomWalkBetweenness> {
        if flows.iter().any(|f| !f.is_finite()) {
            return Err(Error::NumericalInstability(
                "non-finite random-walk flow".into(),
            ));
        }
        let mut edges = flows;
        let ghost_flows = edges.split_off(real_edges);
        Ok(RandomWalkBetweenness { edges, ghost_flows })
    }
}

fn centroid(graph: &Graph, nodes: &[usize]) -> Voxel {
    if nodes.is_empty() {
        return Voxel::default();
    }
    let mut sum = [0.0; 3];
    for &i in nodes {
        let p = graph.node(i).origin.to_f64();
        for k in 0..3 {
            sum[k] += p[k];
        }
    }
    let k = nodes.len() as f64;
    Voxel::round([sum[0] / k, sum[1] / k, sum[2] / k])
}

/// Linear random-walk boundary betweenness:
/// `Σ_{s,t} |(Q[u,s] − Q[u,t]) − (Q[v,s] − Q[v,t])| · A[u,v]`.
pub fn random_walk_betweenness(
    graph: &Graph,
    sources: &[usize],
    targets: &[usize],
    weight: Option<EdgeAttribute>,
) -> Result<RandomWalkBetweenness> {
    check_ids(graph, sources, "source")?;
    check_ids(graph, targets, "target")?;
    let system = GhostSystem::new(graph, targets, weight)?;
    let q = &system.pinv;

    let mut flows = vec![0.0; system.graph.edge_count()];
    for &s in sources {
        for &t in targets {
            let pair = system.edge_flows(|i| q[(i, s)] - q[(i, t)]);
            for (acc, f) in flows.iter_mut().zip(pair) {
                *acc += f;
            }
        }
    }
    debug!(
        sources = sources.len(),
        targets = targets.len(),
        "linear random-walk betweenness"
    );
    system.split(flows, graph.edge_count())
}

/// Nonlinear random-walk boundary betweenness.
///
/// Each source injects `incoming[i]` (default 1) and the ghost absorbs the
/// total: `V = Q · b` and the edge value is `|V[u] − V[v]| · A[u,v]`.
pub fn nonlinear_random_walk_betweenness(
    graph: &Graph,
    sources: &[usize],
    targets: &[usize],
    incoming: Option<&[f64]>,
    weight: Option<EdgeAttribute>,
) -> Result<RandomWalkBetweenness> {
    check_ids(graph, sources, "source")?;
    check_ids(graph, targets, "target")?;
    let incoming = match incoming {
        Some(values) if values.len() != sources.len() => {
            return Err(Error::InvalidArgument(format!(
                "{} incoming currents given for {} sources",
                values.len(),
                sources.len()
            )));
        }
        Some(values) => values.to_vec(),
        None => vec![1.0; sources.len()],
    };
    if incoming.iter().any(|c| !c.is_finite()) {
        return Err(Error::InvalidArgument("incoming currents must be finite".into()));
    }

    let system = GhostSystem::new(graph, targets, weight)?;
    let n = system.graph.node_count();
    let mut b = DVector::zeros(n);
    for (&s, &c) in sources.iter().zip(&incoming) {
        b[s] += c;
    }
    b[system.ghost] -= incoming.iter().sum::<f64>();
    let v = &system.pinv * b;

    let flows = system.edge_flows(|i| v[i]);
    debug!(sources = sources.len(), "nonlinear random-walk betweenness");
    system.split(flows, graph.edge_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fibergt_graph::{connector, Dim};

    fn path(n: i32) -> Graph {
        let mut g = Graph::new(Dim::Two);
        for x in 0..n {
            g.add_node(Voxel::planar(x * 3, 0));
        }
        for i in 0..(n as usize - 1) {
            let (a, b) = (g.node(i).origin, g.node(i + 1).origin);
            g.add_edge(i, i + 1, connector(a, b));
        }
        g
    }

    #[test]
    fn path_scores_one_on_every_edge() {
        let g = path(5);
        let scores = boundary_edge_betweenness(&g, &[0], &[4], None).unwrap();
        assert_eq!(scores, vec![1.0; 4]);
        let vertices = vertex_boundary_betweenness(&g, &[0], &[4], None).unwrap();
        assert_eq!(vertices, vec![0.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn parallel_edges_split_paths() {
        let mut g = path(3);
        g.add_edge(0, 1, connector(Voxel::planar(0, 0), Voxel::planar(3, 0)));
        let scores = boundary_edge_betweenness(&g, &[0], &[2], None).unwrap();
        assert_relative_eq!(scores[0], 0.5);
        assert_relative_eq!(scores[1], 1.0);
        assert_relative_eq!(scores[2], 0.5);
    }

    #[test]
    fn ordered_pairs_are_not_halved() {
        let g = path(3);
        let scores = boundary_edge_betweenness(&g, &[0, 2], &[0, 2], None).unwrap();
        // (0 → 2) and (2 → 0) both cross every edge
        assert_eq!(scores, vec![2.0, 2.0]);
    }

    #[test]
    fn weighted_paths_prefer_the_light_route() {
        // square 0-1-2-3-0, route via 1 is cheaper
        let mut g = Graph::new(Dim::Two);
        for (x, y) in [(0, 0), (4, 0), (4, 4), (0, 4)] {
            g.add_node(Voxel::planar(x, y));
        }
        for (a, b, len) in [(0, 1, 1.0), (1, 2, 1.0), (2, 3, 5.0), (3, 0, 5.0)] {
            let (pa, pb) = (g.node(a).origin, g.node(b).origin);
            let e = g.add_edge(a, b, connector(pa, pb));
            g.weights_mut(e).length = Some(len);
        }
        let scores = boundary_edge_betweenness(&g, &[0], &[2], Some(EdgeAttribute::Length)).unwrap();
        assert_eq!(scores, vec![1.0, 1.0, 0.0, 0.0]);
        let hops = boundary_edge_betweenness(&g, &[0], &[2], None).unwrap();
        assert_eq!(hops, vec![0.5; 4]);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let g = path(3);
        assert!(matches!(
            boundary_edge_betweenness(&g, &[0], &[7], None),
            Err(Error::InvalidArgument(_))
        ));
        // no length attribute yet
        assert!(matches!(
            boundary_edge_betweenness(&g, &[0], &[2], Some(EdgeAttribute::Length)),
            Err(Error::InvalidArgument(_))
        ));
        let mut zero = path(3);
        zero.weights_mut(0).length = Some(0.0);
        zero.weights_mut(1).length = Some(1.0);
        assert!(random_walk_betweenness(&zero, &[0], &[2], Some(EdgeAttribute::Length)).is_err());
    }

    #[test]
    fn linear_random_walk_on_a_path() {
        let g = path(4);
        let rw = random_walk_betweenness(&g, &[0], &[3], None).unwrap();
        assert_eq!(rw.edges.len(), 3);
        for f in &rw.edges {
            assert_relative_eq!(*f, 1.0, epsilon = 1e-9);
        }
        // the ghost hangs off the target, so no current reaches it
        assert_eq!(rw.ghost_flows.len(), 1);
        assert_relative_eq!(rw.ghost_flows[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn nonlinear_random_walk_drains_into_ghost() {
        let g = path(4);
        let rw = nonlinear_random_walk_betweenness(&g, &[0], &[3], None, None).unwrap();
        for f in &rw.edges {
            assert_relative_eq!(*f, 1.0, epsilon = 1e-9);
        }
        assert_relative_eq!(rw.ghost_flows[0], 1.0, epsilon = 1e-9);

        // two sources of different strength on a star 0,1 → 2 → 3
        let mut star = Graph::new(Dim::Two);
        for (x, y) in [(0, 0), (0, 6), (3, 3), (9, 3)] {
            star.add_node(Voxel::planar(x, y));
        }
        for (a, b) in [(0, 2), (1, 2), (2, 3)] {
            let (pa, pb) = (star.node(a).origin, star.node(b).origin);
            star.add_edge(a, b, connector(pa, pb));
        }
        let rw = nonlinear_random_walk_betweenness(&star, &[0, 1], &[3], Some(&[2.0, 1.0]), None)
            .unwrap();
        assert_relative_eq!(rw.edges[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(rw.edges[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(rw.edges[2], 3.0, epsilon = 1e-9);
        assert_relative_eq!(rw.ghost_flows[0], 3.0, epsilon = 1e-9);

        assert!(nonlinear_random_walk_betweenness(&star, &[0, 1], &[3], Some(&[1.0]), None).is_err());
    }
}
