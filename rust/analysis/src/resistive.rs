// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Effective resistance of a network between two boundary slabs.
//!
//! Two ghost terminals are appended to a copy of the graph: a source wired
//! to every node inside the first boundary interval and a sink wired to
//! every node inside the second. A unit current is injected at the source
//! and withdrawn at the sink, and potentials follow from the pseudo-inverse
//! `Q` of the weighted Laplacian:
//!
//! ```text
//! P     = Q · F,          F = +1 @ source, −1 @ sink
//! R_eff = Q[s,s] + Q[t,t] − 2 Q[s,t]
//! ```

use fibergt_graph::{connector, EdgeAttribute, Graph, JunctionResistance, Voxel};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result, Terminal};
use crate::laplacian::{pseudo_inverse, weighted_laplacian};

/// Offset of the ghost terminals beyond the network along the axis.
const GHOST_OFFSET: i32 = 10;

/// Two half-open intervals `[lo, hi)` along one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryCondition {
    /// 0 = x, 1 = y, 2 = z.
    pub axis: usize,
    /// Nodes in this interval connect to the source.
    pub boundary_1: [f64; 2],
    /// Nodes in this interval connect to the sink.
    pub boundary_2: [f64; 2],
}

impl BoundaryCondition {
    pub fn new(axis: usize, boundary_1: [f64; 2], boundary_2: [f64; 2]) -> Self {
        Self {
            axis,
            boundary_1,
            boundary_2,
        }
    }

    pub fn validate(&self, graph: &Graph) -> Result<()> {
        if self.axis >= graph.dim().axes() {
            return Err(Error::InvalidArgument(format!(
                "axis {} does not exist in a {}-axis network",
                self.axis,
                graph.dim().axes()
            )));
        }
        for [lo, hi] in [self.boundary_1, self.boundary_2] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(Error::InvalidArgument(format!(
                    "boundary interval [{lo}, {hi}) is empty or not finite"
                )));
            }
        }
        Ok(())
    }

    fn selects(interval: [f64; 2], value: i32) -> bool {
        let v = value as f64;
        interval[0] <= v && v < interval[1]
    }

    /// Real nodes inside the source and sink intervals.
    pub fn terminals(&self, graph: &Graph) -> (Vec<usize>, Vec<usize>) {
        let pick = |interval| {
            graph
                .nodes()
                .iter()
                .enumerate()
                .filter(|(_, n)| Self::selects(interval, n.origin.axis(self.axis)))
                .map(|(i, _)| i)
                .collect::<Vec<_>>()
        };
        (pick(self.boundary_1), pick(self.boundary_2))
    }
}

/// Unit-current solve of a network with ghost terminals.
#[derive(Debug, Clone)]
pub struct ResistiveSolution {
    /// Input graph plus the two ghost nodes and their edges.
    pub graph: Graph,
    pub source: usize,
    pub sink: usize,
    /// Conductance of every edge of `graph`.
    pub conductances: Vec<f64>,
    /// Node potentials `P = Q · F`.
    pub potential: Vec<f64>,
    /// Injected current per node.
    pub injection: Vec<f64>,
    /// Current along each edge, positive from `source` end to `target` end.
    pub edge_currents: Vec<f64>,
    pub effective_resistance: f64,
    pinv: DMatrix<f64>,
}

impl ResistiveSolution {
    /// Pseudo-inverse of the augmented Laplacian.
    pub fn pseudo_inverse(&self) -> &DMatrix<f64> {
        &self.pinv
    }

    /// Two-point effective resistance between nodes of the augmented graph.
    pub fn effective_resistance_between(&self, i: usize, j: usize) -> Result<f64> {
        self.graph.check_node(i)?;
        self.graph.check_node(j)?;
        let q = &self.pinv;
        let r = q[(i, i)] + q[(j, j)] - 2.0 * q[(i, j)];
        if r.is_finite() {
            Ok(r)
        } else {
            Err(Error::NumericalInstability(format!(
                "effective resistance between {i} and {j} is {r}"
            )))
        }
    }
}

/// Kirchhoff solver for boundary-to-boundary transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResistiveSolver {
    pub junction_resistance: JunctionResistance,
}

impl ResistiveSolver {
    pub fn new(junction_resistance: JunctionResistance) -> Self {
        Self {
            junction_resistance,
        }
    }

    /// Solves the unit-current problem on a copy of `graph`.
    ///
    /// With a finite junction resistance every edge must carry a
    /// conductance; with `Infinite` all edges conduct equally.
    pub fn solve(&self, graph: &Graph, bc: &BoundaryCondition) -> Result<ResistiveSolution> {
        bc.validate(graph)?;
        let components = graph.connected_components().len();
        if components > 1 {
            return Err(Error::DisconnectedNetwork { components });
        }

        let real = self.real_conductances(graph)?;
        let ghost_conductance = match self.junction_resistance {
            JunctionResistance::Infinite => 1.0,
            JunctionResistance::Finite(_) if real.is_empty() => 1.0,
            JunctionResistance::Finite(_) => real.iter().sum::<f64>() / real.len() as f64,
        };

        let (sources, sinks) = bc.terminals(graph);
        let (augmented, source, sink) = attach_terminals(graph, bc.axis, &sources, &sinks);
        if augmented.degree(source) == 0 {
            return Err(Error::DisconnectedBoundary {
                terminal: Terminal::Source,
            });
        }
        if augmented.degree(sink) == 0 {
            return Err(Error::DisconnectedBoundary {
                terminal: Terminal::Sink,
            });
        }

        let mut conductances = real;
        conductances.resize(augmented.edge_count(), ghost_conductance);

        let laplacian = weighted_laplacian(&augmented, &conductances);
        let pinv = pseudo_inverse(&laplacian)?;

        let n = augmented.node_count();
        let mut injection = vec![0.0; n];
        injection[source] = 1.0;
        injection[sink] = -1.0;
        let potential: Vec<f64> = (0..n)
            .map(|i| pinv[(i, source)] - pinv[(i, sink)])
            .collect();
        if potential.iter().any(|p| !p.is_finite()) {
            return Err(Error::NumericalInstability("non-finite node potential".into()));
        }

        let edge_currents = augmented
            .edges()
            .iter()
            .zip(&conductances)
            .map(|(e, g)| g * (potential[e.source] - potential[e.target]))
            .collect();

        let effective_resistance =
            pinv[(source, source)] + pinv[(sink, sink)] - 2.0 * pinv[(source, sink)];
        if !effective_resistance.is_finite() {
            return Err(Error::NumericalInstability(format!(
                "effective resistance is {effective_resistance}"
            )));
        }

        debug!(
            nodes = graph.node_count(),
            sources = sources.len(),
            sinks = sinks.len(),
            ghost_conductance,
            effective_resistance,
            "solved resistive network"
        );

        Ok(ResistiveSolution {
            graph: augmented,
            source,
            sink,
            conductances,
            potential,
            injection,
            edge_currents,
            effective_resistance,
            pinv,
        })
    }

    fn real_conductances(&self, graph: &Graph) -> Result<Vec<f64>> {
        if self.junction_resistance.validate()?.is_infinite() {
            return Ok(vec![1.0; graph.edge_count()]);
        }
        let g = graph
            .edge_weights(Some(EdgeAttribute::Conductance))
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;
        if let Some((i, c)) = g.iter().enumerate().find(|(_, c)| !(c.is_finite() && **c > 0.0)) {
            return Err(Error::InvalidArgument(format!(
                "edge {i} has conductance {c}; conductances must be positive"
            )));
        }
        Ok(g)
    }
}

/// Copy of `graph` with a source ghost (id n) wired to `sources` and a sink
/// ghost (id n+1) wired to `sinks`. Ghost edges come after the real ones.
pub(crate) fn attach_terminals(
    graph: &Graph,
    axis: usize,
    sources: &[usize],
    sinks: &[usize],
) -> (Graph, usize, usize) {
    let mut out = graph.clone();
    let (mid, far) = match graph.bounds() {
        Some(b) => {
            let e = b.max;
            let mid = Voxel::new(e.x / 2, e.y / 2, e.z / 2);
            (mid, e.axis(axis) + GHOST_OFFSET)
        }
        None => (Voxel::default(), GHOST_OFFSET),
    };
    let mut mid = mid;
    if graph.dim().axes() == 2 {
        mid.z = 0;
    }
    let source = out.add_node(mid.with_axis(axis, -GHOST_OFFSET));
    let sink = out.add_node(mid.with_axis(axis, far));
    for (ghost, members) in [(source, sources), (sink, sinks)] {
        for &node in members {
            let from = out.node(ghost).origin;
            let to = out.node(node).origin;
            out.add_edge(ghost, node, connector(from, to));
        }
    }
    (out, source, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fibergt_graph::Dim;

    fn chain(conductance: Option<f64>) -> Graph {
        let mut g = Graph::new(Dim::Two);
        for x in 0..3 {
            g.add_node(Voxel::planar(x * 2, 0));
        }
        for i in 0..2 {
            let a = g.node(i).origin;
            let b = g.node(i + 1).origin;
            let e = g.add_edge(i, i + 1, connector(a, b));
            g.weights_mut(e).conductance = conductance;
        }
        g
    }

    fn ends() -> BoundaryCondition {
        BoundaryCondition::new(0, [0.0, 1.0], [4.0, 5.0])
    }

    #[test]
    fn series_chain_adds_resistances() {
        let solver = ResistiveSolver::new(JunctionResistance::Finite(0.0));
        let sol = solver.solve(&chain(Some(1.0)), &ends()).unwrap();
        // ghost - 0 - 1 - 2 - ghost, every link of conductance 1
        assert_relative_eq!(sol.effective_resistance, 4.0, epsilon = 1e-9);
        assert_eq!(sol.source, 3);
        assert_eq!(sol.sink, 4);
    }

    #[test]
    fn kirchhoff_potential_drop_matches_resistance() {
        let sol = ResistiveSolver::new(JunctionResistance::Finite(0.0))
            .solve(&chain(Some(0.5)), &ends())
            .unwrap();
        let drop = sol.potential[sol.source] - sol.potential[sol.sink];
        assert_relative_eq!(drop / sol.effective_resistance, 1.0, epsilon = 1e-9);
        // unit current through every series link
        for current in &sol.edge_currents {
            assert_relative_eq!(current.abs(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn parallel_edges_halve_resistance() {
        let mut g = chain(Some(1.0));
        let e = g.add_edge(0, 1, connector(Voxel::planar(0, 0), Voxel::planar(2, 0)));
        g.weights_mut(e).conductance = Some(1.0);
        let sol = ResistiveSolver::new(JunctionResistance::Finite(0.0))
            .solve(&g, &ends())
            .unwrap();
        assert_relative_eq!(sol.effective_resistance, 3.5, epsilon = 1e-9);
    }

    #[test]
    fn infinite_junction_resistance_uses_unit_weights() {
        let sol = ResistiveSolver::new(JunctionResistance::Infinite)
            .solve(&chain(None), &ends())
            .unwrap();
        assert_relative_eq!(sol.effective_resistance, 4.0, epsilon = 1e-9);
        assert_relative_eq!(
            sol.effective_resistance_between(0, 2).unwrap(),
            2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn ghosts_sit_outside_the_network() {
        let sol = ResistiveSolver::new(JunctionResistance::Infinite)
            .solve(&chain(None), &ends())
            .unwrap();
        assert_eq!(sol.graph.node(sol.source).origin, Voxel::planar(-10, 0));
        assert_eq!(sol.graph.node(sol.sink).origin, Voxel::planar(15, 0));
        let ghost_edge = sol.graph.edge(2);
        assert_eq!(ghost_edge.points.first(), Some(&Voxel::planar(-10, 0)));
        assert_eq!(ghost_edge.points.last(), Some(&Voxel::planar(0, 0)));
    }

    #[test]
    fn empty_boundary_is_reported() {
        let bc = BoundaryCondition::new(0, [0.0, 1.0], [40.0, 50.0]);
        let err = ResistiveSolver::new(JunctionResistance::Infinite)
            .solve(&chain(None), &bc)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DisconnectedBoundary {
                terminal: Terminal::Sink
            }
        ));
    }

    #[test]
    fn disconnected_network_is_rejected() {
        let mut g = chain(None);
        g.add_node(Voxel::planar(9, 9));
        let err = ResistiveSolver::new(JunctionResistance::Infinite)
            .solve(&g, &ends())
            .unwrap_err();
        assert!(matches!(err, Error::DisconnectedNetwork { components: 2 }));
    }

    #[test]
    fn missing_conductance_and_bad_intervals_are_invalid() {
        let solver = ResistiveSolver::new(JunctionResistance::Finite(1.0));
        assert!(matches!(
            solver.solve(&chain(None), &ends()),
            Err(Error::InvalidArgument(_))
        ));
        let inverted = BoundaryCondition::new(0, [3.0, 1.0], [4.0, 5.0]);
        assert!(matches!(
            solver.solve(&chain(Some(1.0)), &inverted),
            Err(Error::InvalidArgument(_))
        ));
        let bad_axis = BoundaryCondition::new(2, [0.0, 1.0], [4.0, 5.0]);
        assert!(solver.solve(&chain(Some(1.0)), &bad_axis).is_err());
    }
}
