// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Average nodal connectivity.
//!
//! The local vertex connectivity `κ(s, t)` of two non-adjacent nodes is the
//! number of internally vertex-disjoint paths between them, found as a max
//! flow in which every other node is split into an in/out pair of capacity
//! one. Adjacent pairs count as 1.

use std::collections::VecDeque;

use fibergt_graph::Graph;
use rustc_hash::FxHashSet;
use tracing::debug;

/// Residual network with unit node capacities.
struct FlowNetwork {
    /// `(head, capacity, index of reverse arc)` per arc.
    arcs: Vec<(usize, u32, usize)>,
    out: Vec<Vec<usize>>,
}

impl FlowNetwork {
    fn new(vertices: usize) -> Self {
        Self {
            arcs: Vec::new(),
            out: vec![Vec::new(); vertices],
        }
    }

    fn add_arc(&mut self, from: usize, to: usize, capacity: u32) {
        let forward = self.arcs.len();
        self.arcs.push((to, capacity, forward + 1));
        self.arcs.push((from, 0, forward));
        self.out[from].push(forward);
        self.out[to].push(forward + 1);
    }

    /// Edmonds-Karp maximum flow.
    fn max_flow(&mut self, source: usize, sink: usize) -> u32 {
        let mut total = 0;
        loop {
            let mut via = vec![usize::MAX; self.out.len()];
            let mut queue = VecDeque::from([source]);
            let mut reached = false;
            while let Some(v) = queue.pop_front() {
                for &a in &self.out[v] {
                    let (head, cap, _) = self.arcs[a];
                    if cap > 0 && head != source && via[head] == usize::MAX {
                        via[head] = a;
                        if head == sink {
                            reached = true;
                            break;
                        }
                        queue.push_back(head);
                    }
                }
                if reached {
                    break;
                }
            }
            if !reached {
                return total;
            }

            let mut bottleneck = u32::MAX;
            let mut v = sink;
            while v != source {
                let a = via[v];
                bottleneck = bottleneck.min(self.arcs[a].1);
                v = self.arcs[self.arcs[a].2].0;
            }
            let mut v = sink;
            while v != source {
                let a = via[v];
                let rev = self.arcs[a].2;
                self.arcs[a].1 -= bottleneck;
                self.arcs[rev].1 += bottleneck;
                v = self.arcs[rev].0;
            }
            total += bottleneck;
        }
    }
}

/// Distinct undirected neighbour pairs, loops dropped.
fn simple_edges(graph: &Graph) -> FxHashSet<(usize, usize)> {
    graph
        .edges()
        .iter()
        .filter(|e| !e.is_loop())
        .map(|e| (e.source.min(e.target), e.source.max(e.target)))
        .collect()
}

/// Number of internally vertex-disjoint paths between `s` and `t`; 1 when
/// they are adjacent and 0 when `s == t`.
pub fn local_node_connectivity(graph: &Graph, s: usize, t: usize) -> usize {
    if s == t {
        return 0;
    }
    let edges = simple_edges(graph);
    if edges.contains(&(s.min(t), s.max(t))) {
        return 1;
    }
    split_flow(graph.node_count(), &edges, s, t) as usize
}

fn split_flow(n: usize, edges: &FxHashSet<(usize, usize)>, s: usize, t: usize) -> u32 {
    let inner = |v: usize| 2 * v;
    let outer = |v: usize| 2 * v + 1;
    let unbounded = n as u32 + 1;

    let mut net = FlowNetwork::new(2 * n);
    for v in 0..n {
        let cap = if v == s || v == t { unbounded } else { 1 };
        net.add_arc(inner(v), outer(v), cap);
    }
    for &(a, b) in edges {
        net.add_arc(outer(a), inner(b), unbounded);
        net.add_arc(outer(b), inner(a), unbounded);
    }
    net.max_flow(outer(s), inner(t))
}

/// Mean of `κ(s, t)` over all unordered node pairs, `None` below two nodes.
pub fn average_nodal_connectivity(graph: &Graph) -> Option<f64> {
    let n = graph.node_count();
    if n < 2 {
        return None;
    }
    let edges = simple_edges(graph);
    let mut total = 0u64;
    for s in 0..n {
        for t in (s + 1)..n {
            total += if edges.contains(&(s, t)) {
                1
            } else {
                split_flow(n, &edges, s, t) as u64
            };
        }
    }
    let pairs = (n * (n - 1) / 2) as f64;
    let mean = total as f64 / pairs;
    debug!(nodes = n, mean, "average nodal connectivity");
    Some(mean)
}
