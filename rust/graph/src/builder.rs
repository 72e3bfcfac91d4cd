// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Skeleton tracing: turns a skeleton point set into a [`Graph`].
//!
//! 1. Voxels are linked by m-adjacency (see [`VoxelIndex::adjacent`]).
//! 2. Voxels whose degree is not 2 are node voxels; touching node voxels
//!    merge into one node whose origin is the member nearest the cluster
//!    centroid.
//! 3. Closed rings without any node voxel get their smallest voxel promoted
//!    to a node, so they come out as self-loops.
//! 4. Every maximal run of degree-2 voxels between node clusters becomes an
//!    edge whose path starts and ends at the node origins.
//!
//! Node ids follow the ascending order of node origins and edges follow a
//! fixed scan order, so the same point set always yields the same graph.

use std::collections::VecDeque;

use tracing::debug;

use crate::graph::Graph;
use crate::skeleton::SkeletonPointSet;
use crate::spatial::{Neighbours, VoxelIndex};
use crate::voxel::Voxel;

const UNASSIGNED: usize = usize::MAX;

/// Traces skeleton point sets into graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder {
    /// Keep only the component with the most nodes and renumber densely.
    pub reduce_to_largest_component: bool,
}

impl GraphBuilder {
    pub fn new(reduce_to_largest_component: bool) -> Self {
        Self {
            reduce_to_largest_component,
        }
    }

    /// Traces `points` into a graph.
    ///
    /// A pending rotation is applied after tracing and before the
    /// component reduction. An empty point set yields an empty graph.
    pub fn build(&self, points: &SkeletonPointSet) -> Graph {
        let mut graph = trace(points);
        debug!(
            voxels = points.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "traced skeleton"
        );

        if let Some(plan) = points.rotation() {
            let dropped = plan.apply(&mut graph);
            debug!(angle = plan.angle_degrees, dropped, "applied rotation correction");
        }

        if self.reduce_to_largest_component {
            let removed = graph.reduce_to_largest_component();
            debug!(removed, kept = graph.node_count(), "reduced to largest component");
        }
        graph
    }
}

/// Convenience wrapper around [`GraphBuilder::build`].
pub fn build(points: &SkeletonPointSet, reduce_to_largest_component: bool) -> Graph {
    GraphBuilder::new(reduce_to_largest_component).build(points)
}

fn trace(points: &SkeletonPointSet) -> Graph {
    let mut graph = Graph::new(points.dim());
    let index = VoxelIndex::new(points.dim(), points.points().iter().copied());
    let n = index.len();
    if n == 0 {
        return graph;
    }

    let adjacency: Vec<Neighbours> = (0..n).map(|i| index.adjacent(i)).collect();
    let mut is_node: Vec<bool> = adjacency.iter().map(|a| a.len() != 2).collect();
    promote_rings(&adjacency, &mut is_node);

    // Node clusters: connected groups of node voxels.
    let mut cluster_of = vec![UNASSIGNED; n];
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for start in 0..n {
        if !is_node[start] || cluster_of[start] != UNASSIGNED {
            continue;
        }
        let id = clusters.len();
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        cluster_of[start] = id;
        while let Some(v) = queue.pop_front() {
            members.push(v);
            for &w in &adjacency[v] {
                if is_node[w] && cluster_of[w] == UNASSIGNED {
                    cluster_of[w] = id;
                    queue.push_back(w);
                }
            }
        }
        members.sort_unstable();
        clusters.push(members);
    }

    // Number nodes by origin.
    let origins: Vec<Voxel> = clusters.iter().map(|m| cluster_origin(&index, m)).collect();
    let mut by_origin: Vec<usize> = (0..clusters.len()).collect();
    by_origin.sort_by_key(|&c| origins[c]);
    let mut node_of_cluster = vec![0usize; clusters.len()];
    for &c in &by_origin {
        node_of_cluster[c] = graph.add_node(origins[c]);
    }

    // Walk every degree-2 run once.
    let mut consumed = vec![false; n];
    for &c in &by_origin {
        let node = node_of_cluster[c];
        for &member in &clusters[c] {
            for &first in &adjacency[member] {
                if is_node[first] || consumed[first] {
                    continue;
                }
                consumed[first] = true;
                let mut path = vec![origins[c], index.point(first)];
                let (mut prev, mut cur) = (member, first);
                loop {
                    let Some(&next) = adjacency[cur].iter().find(|&&x| x != prev) else {
                        break;
                    };
                    if is_node[next] {
                        let end = cluster_of[next];
                        path.push(origins[end]);
                        graph.add_edge(node, node_of_cluster[end], path);
                        break;
                    }
                    if consumed[next] {
                        break;
                    }
                    consumed[next] = true;
                    path.push(index.point(next));
                    prev = cur;
                    cur = next;
                }
            }
        }
    }

    graph
}

/// Marks the smallest voxel of every node-free ring as a node voxel.
fn promote_rings(adjacency: &[Neighbours], is_node: &mut [bool]) {
    let n = adjacency.len();
    let mut seen = vec![false; n];
    for start in 0..n {
        if is_node[start] || seen[start] {
            continue;
        }
        let mut touches_node = false;
        let mut smallest = start;
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        while let Some(v) = queue.pop_front() {
            smallest = smallest.min(v);
            for &w in &adjacency[v] {
                if is_node[w] {
                    touches_node = true;
                } else if !seen[w] {
                    seen[w] = true;
                    queue.push_back(w);
                }
            }
        }
        if !touches_node {
            is_node[smallest] = true;
        }
    }
}

/// Member voxel closest to the cluster centroid; ties go to the smallest.
fn cluster_origin(index: &VoxelIndex, members: &[usize]) -> Voxel {
    let count = members.len() as f64;
    let mut centroid = [0.0_f64; 3];
    for &m in members {
        let p = index.point(m).to_f64();
        for (c, v) in centroid.iter_mut().zip(p) {
            *c += v / count;
        }
    }
    let dist = |m: usize| {
        let p = index.point(m).to_f64();
        (0..3).map(|i| (p[i] - centroid[i]).powi(2)).sum::<f64>()
    };
    let mut best = members[0];
    let mut best_dist = dist(best);
    for &m in &members[1..] {
        let d = dist(m);
        if d < best_dist - 1e-12 {
            best = m;
            best_dist = d;
        }
    }
    index.point(best)
}
