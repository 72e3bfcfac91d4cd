// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resistive solve and random-walk betweenness on square lattices.
//!
//! Run with: cargo bench -p fibergt-analysis --bench solver

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fibergt_analysis::{random_walk_betweenness, BoundaryCondition, ResistiveSolver};
use fibergt_graph::{connector, Dim, Graph, JunctionResistance, Voxel};

const SPACING: i32 = 4;

/// `side × side` lattice of unit-conductance edges.
fn lattice(side: i32) -> Graph {
    let mut g = Graph::new(Dim::Two);
    for y in 0..side {
        for x in 0..side {
            g.add_node(Voxel::planar(x * SPACING, y * SPACING));
        }
    }
    let id = |x: i32, y: i32| (y * side + x) as usize;
    for y in 0..side {
        for x in 0..side {
            let mut link = |a: usize, b: usize| {
                let (p, q) = (g.node(a).origin, g.node(b).origin);
                let e = g.add_edge(a, b, connector(p, q));
                g.weights_mut(e).conductance = Some(1.0);
            };
            if x + 1 < side {
                link(id(x, y), id(x + 1, y));
            }
            if y + 1 < side {
                link(id(x, y), id(x, y + 1));
            }
        }
    }
    g
}

fn benchmark_resistive(c: &mut Criterion) {
    let mut group = c.benchmark_group("resistive_solve");
    let solver = ResistiveSolver::new(JunctionResistance::Finite(0.0));
    for side in [8, 16, 24] {
        let graph = lattice(side);
        let far = ((side - 1) * SPACING) as f64;
        let bc = BoundaryCondition::new(0, [0.0, 1.0], [far, far + 1.0]);
        group.throughput(Throughput::Elements(graph.node_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(side), &graph, |b, graph| {
            b.iter(|| solver.solve(black_box(graph), &bc))
        });
    }
    group.finish();
}

fn benchmark_random_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_walk_betweenness");
    for side in [8, 16] {
        let graph = lattice(side);
        let sources: Vec<usize> = (0..side).map(|y| (y * side) as usize).collect();
        let targets: Vec<usize> = (0..side).map(|y| (y * side + side - 1) as usize).collect();
        group.bench_with_input(BenchmarkId::from_parameter(side), &graph, |b, graph| {
            b.iter(|| random_walk_betweenness(black_box(graph), &sources, &targets, None))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_resistive, benchmark_random_walk);
criterion_main!(benches);
