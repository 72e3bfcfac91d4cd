// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural descriptors: degree, density, distances, clustering,
//! assortativity and centrality.
//!
//! Measures that count neighbours (clustering) look at the simple graph
//! underneath the multigraph: parallel edges collapse and self-loops are
//! ignored. Degree-based measures use the multigraph degree.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use crate::graph::Graph;

impl Graph {
    /// Degree of every node.
    pub fn degrees(&self) -> Vec<usize> {
        (0..self.node_count()).map(|n| self.degree(n)).collect()
    }

    /// Mean node degree (0 for an empty graph).
    pub fn mean_degree(&self) -> f64 {
        let n = self.node_count();
        if n == 0 {
            return 0.0;
        }
        self.degrees().iter().sum::<usize>() as f64 / n as f64
    }

    /// Returns the graph density (ratio of actual edges to possible edges).
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n < 2 {
            return 0.0;
        }
        let max_edges = n * (n - 1) / 2;
        self.edge_count() as f64 / max_edges as f64
    }

    /// Returns the diameter of the graph (longest shortest path in hops).
    ///
    /// Uses BFS from every node. Returns `None` if the graph is empty or not
    /// connected.
    pub fn diameter(&self) -> Option<usize> {
        if self.is_empty() || !self.is_connected() {
            return None;
        }

        let mut max_dist = 0;
        for start in 0..self.node_count() {
            for &d in &self.bfs_distances(start) {
                if d != usize::MAX && d > max_dist {
                    max_dist = d;
                }
            }
        }
        Some(max_dist)
    }

    /// Mean hop distance over all ordered pairs of mutually reachable nodes.
    pub fn average_shortest_path_length(&self) -> Option<f64> {
        let mut total = 0usize;
        let mut pairs = 0usize;
        for start in 0..self.node_count() {
            for (other, &d) in self.bfs_distances(start).iter().enumerate() {
                if other != start && d != usize::MAX {
                    total += d;
                    pairs += 1;
                }
            }
        }
        (pairs > 0).then(|| total as f64 / pairs as f64)
    }

    /// Closeness centrality for each node.
    ///
    /// `C(v) = (reachable) / sum(shortest_path_distance(v, u))` over the
    /// nodes reachable from v. Returns 0 for isolated nodes.
    pub fn closeness_centrality(&self) -> Vec<f64> {
        let n = self.node_count();
        let mut centrality = vec![0.0; n];

        for (i, c) in centrality.iter_mut().enumerate() {
            let distances = self.bfs_distances(i);
            let total_dist: usize = distances
                .iter()
                .filter(|&&d| d > 0 && d != usize::MAX)
                .sum();

            if total_dist > 0 {
                let reachable = distances.iter().filter(|&&d| d != usize::MAX).count() - 1;
                *c = reachable as f64 / total_dist as f64;
            }
        }

        centrality
    }

    /// Betweenness centrality for each node (hop-count shortest paths).
    ///
    /// Normalized by `(n-1)(n-2)` over ordered source/target pairs, so values
    /// lie in [0, 1].
    pub fn betweenness_centrality(&self) -> Vec<f64> {
        let n = self.node_count();
        let mut centrality = vec![0.0; n];

        for s in 0..n {
            let dag = self.shortest_path_dag(s, None);
            let mut delta = vec![0.0_f64; n];
            for &w in dag.order.iter().rev() {
                for &(v, _) in &dag.preds[w] {
                    delta[v] += (dag.sigma[v] / dag.sigma[w]) * (1.0 + delta[w]);
                }
                if w != s {
                    centrality[w] += delta[w];
                }
            }
        }

        let norm = if n > 2 {
            ((n - 1) * (n - 2)) as f64
        } else {
            1.0
        };
        for c in &mut centrality {
            *c /= norm;
        }
        centrality
    }

    /// Local clustering coefficient of each node. Nodes with fewer than two
    /// distinct neighbours score 0.
    pub fn local_clustering(&self) -> Vec<f64> {
        let sets = self.neighbour_sets();
        (0..self.node_count())
            .map(|v| {
                let k = sets[v].len();
                if k < 2 {
                    return 0.0;
                }
                let triangles = self.triangles_at(v, &sets);
                2.0 * triangles as f64 / (k * (k - 1)) as f64
            })
            .collect()
    }

    /// Mean of [`Graph::local_clustering`].
    pub fn average_clustering(&self) -> f64 {
        let n = self.node_count();
        if n == 0 {
            return 0.0;
        }
        self.local_clustering().iter().sum::<f64>() / n as f64
    }

    /// Global transitivity: `3 × triangles / connected triples`.
    pub fn transitivity(&self) -> f64 {
        let sets = self.neighbour_sets();
        let mut closed = 0usize;
        let mut triples = 0usize;
        for (v, set) in sets.iter().enumerate() {
            let k = set.len();
            if k >= 2 {
                triples += k * (k - 1) / 2;
                closed += self.triangles_at(v, &sets);
            }
        }
        if triples == 0 {
            0.0
        } else {
            closed as f64 / triples as f64
        }
    }

    /// Degree assortativity (Newman's r) over non-loop edges.
    ///
    /// Returns `None` when undefined, e.g. when every edge joins nodes of
    /// equal degree.
    pub fn degree_assortativity(&self) -> Option<f64> {
        let (mut sum_jk, mut sum_half, mut sum_sq_half, mut m) = (0.0, 0.0, 0.0, 0.0);
        for e in self.edges().iter().filter(|e| !e.is_loop()) {
            let j = self.degree(e.source) as f64;
            let k = self.degree(e.target) as f64;
            sum_jk += j * k;
            sum_half += 0.5 * (j + k);
            sum_sq_half += 0.5 * (j * j + k * k);
            m += 1.0;
        }
        if m == 0.0 {
            return None;
        }
        let mean_sq = (sum_half / m).powi(2);
        let denominator = sum_sq_half / m - mean_sq;
        if denominator.abs() < 1e-12 {
            return None;
        }
        Some((sum_jk / m - mean_sq) / denominator)
    }

    /// Key→scalar summary for report consumers. Undefined measures are
    /// omitted rather than reported as NaN.
    pub fn structural_report(&self) -> BTreeMap<String, f64> {
        let n = self.node_count();
        let mut report = BTreeMap::new();
        report.insert("node_count".to_string(), n as f64);
        report.insert("edge_count".to_string(), self.edge_count() as f64);
        report.insert("density".to_string(), self.density());
        report.insert("mean_degree".to_string(), self.mean_degree());
        report.insert("transitivity".to_string(), self.transitivity());
        report.insert("average_clustering".to_string(), self.average_clustering());
        if let Some(d) = self.diameter() {
            report.insert("diameter".to_string(), d as f64);
        }
        if let Some(r) = self.degree_assortativity() {
            report.insert("assortativity".to_string(), r);
        }
        if let Some(l) = self.average_shortest_path_length() {
            report.insert("average_shortest_path_length".to_string(), l);
        }
        if n > 0 {
            let mean = |v: Vec<f64>| v.iter().sum::<f64>() / n as f64;
            report.insert("mean_closeness".to_string(), mean(self.closeness_centrality()));
            report.insert(
                "mean_betweenness".to_string(),
                mean(self.betweenness_centrality()),
            );
        }
        report
    }

    fn neighbour_sets(&self) -> Vec<FxHashSet<usize>> {
        (0..self.node_count())
            .map(|v| self.adjacent_nodes(v).into_iter().collect())
            .collect()
    }

    /// Number of triangles through `v` in the simple graph.
    fn triangles_at(&self, v: usize, sets: &[FxHashSet<usize>]) -> usize {
        let neighbours: Vec<usize> = sets[v].iter().copied().collect();
        let mut count = 0;
        for (i, &a) in neighbours.iter().enumerate() {
            for &b in &neighbours[i + 1..] {
                if sets[a].contains(&b) {
                    count += 1;
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::tests::{make_linear_graph, make_triangle_graph};
    use crate::graph::Graph;
    use crate::voxel::{Dim, Voxel};

    fn make_star() -> Graph {
        let mut g = Graph::new(Dim::Two);
        g.add_node(Voxel::planar(5, 5));
        for i in 0..4 {
            let leaf = g.add_node(Voxel::planar(i * 3, 0));
            g.add_edge(0, leaf, vec![]);
        }
        g
    }

    #[test]
    fn graph_density() {
        let g = make_triangle_graph();
        // 3 edges out of max 3 → density = 1.0
        assert!((g.density() - 1.0).abs() < 1e-10);

        let g2 = make_linear_graph();
        // 3 edges out of max 6 → density = 0.5
        assert!((g2.density() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn diameter() {
        assert_eq!(make_linear_graph().diameter(), Some(3));
        assert_eq!(make_triangle_graph().diameter(), Some(1));

        let mut g = make_linear_graph();
        g.add_node(Voxel::planar(40, 40));
        assert_eq!(g.diameter(), None);
    }

    #[test]
    fn closeness_centrality() {
        let cc = make_linear_graph().closeness_centrality();
        // Node 0: distances [0,1,2,3], sum=6, closeness=3/6=0.5
        assert!((cc[0] - 0.5).abs() < 1e-10);
        // Node 1: distances [1,0,1,2], sum=4, closeness=3/4=0.75
        assert!((cc[1] - 0.75).abs() < 1e-10);
    }

    #[test]
    fn betweenness_centrality() {
        let bc = make_linear_graph().betweenness_centrality();
        assert!(bc[0].abs() < 1e-10);
        assert!(bc[3].abs() < 1e-10);
        // node 1 lies on 0-2 and 0-3 (both directions): 4 / (3·2)
        assert!((bc[1] - 4.0 / 6.0).abs() < 1e-10);

        let star = make_star().betweenness_centrality();
        assert!((star[0] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn clustering_and_transitivity() {
        let tri = make_triangle_graph();
        assert!((tri.transitivity() - 1.0).abs() < 1e-10);
        assert!((tri.average_clustering() - 1.0).abs() < 1e-10);

        let line = make_linear_graph();
        assert_eq!(line.transitivity(), 0.0);
        assert_eq!(line.local_clustering(), vec![0.0; 4]);
    }

    #[test]
    fn star_is_disassortative() {
        let r = make_star().degree_assortativity().unwrap();
        assert!((r + 1.0).abs() < 1e-10);
        // every edge joins degree-2 nodes
        assert_eq!(make_triangle_graph().degree_assortativity(), None);
    }

    #[test]
    fn average_path_length() {
        // pairs: 1,2,3,1,2,1 each direction → 10 / 6
        let l = make_linear_graph().average_shortest_path_length().unwrap();
        assert!((l - 10.0 / 6.0).abs() < 1e-10);
    }

    #[test]
    fn report_omits_undefined_measures() {
        let mut g = make_triangle_graph();
        g.add_node(Voxel::planar(30, 30));
        let report = g.structural_report();
        assert_eq!(report["node_count"], 4.0);
        assert!(!report.contains_key("diameter"));
        assert!(report.values().all(|v| v.is_finite()));
    }
}
