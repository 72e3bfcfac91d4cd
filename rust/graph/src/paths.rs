// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-source shortest paths with path counting.
//!
//! [`ShortestPathDag`] is the forward phase of Brandes' algorithm: distances,
//! the number of shortest paths `σ` to every node, and the predecessor edges
//! on those paths. Parallel edges count as distinct paths; self-loops are
//! never on a shortest path. Betweenness variants run their own dependency
//! accumulation over the DAG.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::graph::Graph;

/// Predecessor list: (predecessor node, edge used).
pub type Predecessors = SmallVec<[(usize, usize); 2]>;

/// Shortest-path DAG rooted at one source.
#[derive(Debug, Clone)]
pub struct ShortestPathDag {
    pub source: usize,
    /// Reachable nodes in non-decreasing distance from the source.
    pub order: Vec<usize>,
    /// Distance to each node (`f64::INFINITY` when unreachable).
    pub dist: Vec<f64>,
    /// Number of shortest paths from the source to each node.
    pub sigma: Vec<f64>,
    pub preds: Vec<Predecessors>,
}

impl ShortestPathDag {
    pub fn reachable(&self, node: usize) -> bool {
        self.dist[node].is_finite()
    }
}

/// Checks that weights are usable by Dijkstra: one per edge, finite, > 0.
pub fn validate_weights(graph: &Graph, weights: &[f64]) -> Result<()> {
    if weights.len() != graph.edge_count() {
        return Err(Error::InvalidArgument(format!(
            "expected {} edge weights, got {}",
            graph.edge_count(),
            weights.len()
        )));
    }
    if let Some((i, w)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !(w.is_finite() && **w > 0.0))
    {
        return Err(Error::InvalidArgument(format!(
            "edge {i} has weight {w}; path weights must be positive and finite"
        )));
    }
    Ok(())
}

impl Graph {
    /// Builds the shortest-path DAG from `source`.
    ///
    /// Uses BFS (hop count) when `weights` is `None`, Dijkstra otherwise.
    /// Weights must already have passed [`validate_weights`].
    pub fn shortest_path_dag(&self, source: usize, weights: Option<&[f64]>) -> ShortestPathDag {
        match weights {
            None => self.bfs_dag(source),
            Some(w) => self.dijkstra_dag(source, w),
        }
    }

    fn bfs_dag(&self, source: usize) -> ShortestPathDag {
        let n = self.node_count();
        let mut hops = vec![usize::MAX; n];
        let mut sigma = vec![0.0_f64; n];
        let mut preds: Vec<Predecessors> = vec![SmallVec::new(); n];
        let mut order = Vec::with_capacity(n);
        let mut queue = VecDeque::new();

        hops[source] = 0;
        sigma[source] = 1.0;
        queue.push_back(source);

        while let Some(v) = queue.pop_front() {
            order.push(v);
            for &(w, e) in self.incident(v) {
                if w == v {
                    continue;
                }
                // first visit?
                if hops[w] == usize::MAX {
                    hops[w] = hops[v] + 1;
                    queue.push_back(w);
                }
                // shortest path to w via v?
                if hops[w] == hops[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push((v, e));
                }
            }
        }

        let dist = hops
            .into_iter()
            .map(|h| if h == usize::MAX { f64::INFINITY } else { h as f64 })
            .collect();

        ShortestPathDag {
            source,
            order,
            dist,
            sigma,
            preds,
        }
    }

    fn dijkstra_dag(&self, source: usize, weights: &[f64]) -> ShortestPathDag {
        let n = self.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut sigma = vec![0.0_f64; n];
        let mut preds: Vec<Predecessors> = vec![SmallVec::new(); n];
        let mut settled = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut heap = BinaryHeap::new();

        dist[source] = 0.0;
        sigma[source] = 1.0;
        heap.push(DijkstraState {
            cost: 0.0,
            node: source,
        });

        while let Some(DijkstraState { cost, node }) = heap.pop() {
            if settled[node] || cost > dist[node] {
                continue;
            }
            settled[node] = true;
            order.push(node);

            for &(neighbor, edge) in self.incident(node) {
                if neighbor == node || settled[neighbor] {
                    continue;
                }
                let next_cost = cost + weights[edge];
                let current = dist[neighbor];
                if current.is_infinite() || next_cost < current - tolerance(current) {
                    dist[neighbor] = next_cost;
                    sigma[neighbor] = sigma[node];
                    preds[neighbor].clear();
                    preds[neighbor].push((node, edge));
                    heap.push(DijkstraState {
                        cost: next_cost,
                        node: neighbor,
                    });
                } else if (next_cost - current).abs() <= tolerance(current) {
                    sigma[neighbor] += sigma[node];
                    preds[neighbor].push((node, edge));
                }
            }
        }

        ShortestPathDag {
            source,
            order,
            dist,
            sigma,
            preds,
        }
    }

    /// Hop distances from a source (`usize::MAX` when unreachable).
    pub fn bfs_distances(&self, source: usize) -> Vec<usize> {
        let n = self.node_count();
        let mut dist = vec![usize::MAX; n];
        let mut queue = VecDeque::new();

        dist[source] = 0;
        queue.push_back(source);

        while let Some(node) = queue.pop_front() {
            for &(neighbor, _) in self.incident(node) {
                if dist[neighbor] == usize::MAX {
                    dist[neighbor] = dist[node] + 1;
                    queue.push_back(neighbor);
                }
            }
        }

        dist
    }
}

fn tolerance(reference: f64) -> f64 {
    1e-10 * reference.abs().max(1.0)
}

/// Internal state for Dijkstra's priority queue (min-heap by cost).
#[derive(Debug, Clone, PartialEq)]
struct DijkstraState {
    cost: f64,
    node: usize,
}

impl Eq for DijkstraState {}

impl PartialOrd for DijkstraState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DijkstraState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{make_linear_graph, make_triangle_graph};
    use crate::voxel::{Dim, Voxel};

    /// Square 0-1-3 / 0-2-3: two shortest paths from 0 to 3.
    fn make_square() -> Graph {
        let mut g = Graph::new(Dim::Two);
        for (x, y) in [(0, 0), (2, 0), (0, 2), (2, 2)] {
            g.add_node(Voxel::planar(x, y));
        }
        g.add_edge(0, 1, vec![]);
        g.add_edge(0, 2, vec![]);
        g.add_edge(1, 3, vec![]);
        g.add_edge(2, 3, vec![]);
        g
    }

    #[test]
    fn bfs_counts_tied_paths() {
        let dag = make_square().shortest_path_dag(0, None);
        assert_eq!(dag.dist[3], 2.0);
        assert_eq!(dag.sigma[3], 2.0);
        assert_eq!(dag.preds[3].len(), 2);
        assert_eq!(dag.order[0], 0);
        assert_eq!(*dag.order.last().unwrap(), 3);
    }

    #[test]
    fn parallel_edges_double_sigma() {
        let mut g = make_linear_graph();
        g.add_edge(0, 1, vec![]);
        let dag = g.shortest_path_dag(0, None);
        assert_eq!(dag.sigma[1], 2.0);
        assert_eq!(dag.sigma[3], 2.0);
    }

    #[test]
    fn dijkstra_prefers_lighter_route() {
        let g = make_triangle_graph();
        // edges: 0-1 (w=1), 1-2 (w=1), 0-2 (w=5)
        let w = [1.0, 1.0, 5.0];
        let dag = g.shortest_path_dag(0, Some(&w));
        assert!((dag.dist[2] - 2.0).abs() < 1e-12);
        assert_eq!(dag.sigma[2], 1.0);
        assert_eq!(dag.preds[2].as_slice(), &[(1, 1)]);
    }

    #[test]
    fn dijkstra_ties_are_counted() {
        let g = make_triangle_graph();
        let w = [1.0, 1.0, 2.0];
        let dag = g.shortest_path_dag(0, Some(&w));
        assert_eq!(dag.sigma[2], 2.0);
    }

    #[test]
    fn unreachable_nodes_stay_infinite() {
        let mut g = make_linear_graph();
        g.add_node(Voxel::planar(50, 50));
        let dag = g.shortest_path_dag(0, Some(&[1.0, 1.0, 1.0]));
        assert!(!dag.reachable(4));
        assert_eq!(dag.sigma[4], 0.0);
        assert_eq!(g.bfs_distances(0)[4], usize::MAX);
    }

    #[test]
    fn weights_are_validated() {
        let g = make_linear_graph();
        assert!(validate_weights(&g, &[1.0, 2.0]).is_err());
        assert!(validate_weights(&g, &[1.0, 0.0, 2.0]).is_err());
        assert!(validate_weights(&g, &[1.0, f64::NAN, 2.0]).is_err());
        assert!(validate_weights(&g, &[1.0, 0.5, 2.0]).is_ok());
    }
}
