// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tracing scenarios on hand-drawn skeletons.

use fibergt_graph::{
    build, connector, Dim, Graph, GraphBuilder, Shape, SkeletonFrame, SkeletonPointSet, Voxel,
};

fn planar(points: Vec<Voxel>, size: usize) -> SkeletonPointSet {
    SkeletonPointSet::new(Dim::Two, Shape::planar(size, size), points)
}

fn path_length(points: &[Voxel]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// 5×5 grid, endpoints at (0,0) and (4,4) joined by an L-shaped path.
#[test]
fn l_path_on_five_by_five_grid() {
    let mut pts = connector(Voxel::planar(0, 0), Voxel::planar(0, 4));
    pts.extend(connector(Voxel::planar(0, 4), Voxel::planar(4, 4)));
    let graph = build(&planar(pts, 5), true);

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    let edge = graph.edge(0);
    assert_eq!(edge.points.len() - 1, 8);
    approx::assert_relative_eq!(path_length(&edge.points), 8.0, epsilon = 1e-12);
}

/// Two unequal blobs: only the larger survives and ids stay dense.
#[test]
fn unequal_blobs_reduce_to_larger() {
    // small blob: a plain segment (2 nodes)
    let mut pts = connector(Voxel::planar(1, 1), Voxel::planar(1, 6));
    // large blob: a "comb" with three teeth (8 nodes)
    pts.extend(connector(Voxel::planar(10, 10), Voxel::planar(30, 10)));
    for x in [14, 20, 26] {
        pts.extend(connector(Voxel::planar(x, 10), Voxel::planar(x, 18)));
    }

    let full = GraphBuilder::new(false).build(&planar(pts.clone(), 40));
    assert_eq!(full.connected_components().len(), 2);

    let reduced = GraphBuilder::new(true).build(&planar(pts, 40));
    assert_eq!(reduced.node_count(), 8);
    assert_eq!(reduced.connected_components().len(), 1);
    for e in reduced.edges() {
        assert!(e.source < reduced.node_count());
        assert!(e.target < reduced.node_count());
    }
    assert!(reduced.nodes().iter().all(|n| n.origin.x >= 10));
}

/// Every edge path starts and ends on its node origins.
#[test]
fn edge_paths_are_anchored_on_nodes() {
    let mut pts = connector(Voxel::planar(0, 10), Voxel::planar(20, 10));
    pts.extend(connector(Voxel::planar(10, 0), Voxel::planar(10, 20)));
    pts.extend(connector(Voxel::planar(20, 10), Voxel::planar(25, 15)));
    let graph = build(&planar(pts, 32), false);

    for e in graph.edges() {
        assert_eq!(e.points.first(), Some(&graph.node(e.source).origin));
        assert_eq!(e.points.last(), Some(&graph.node(e.target).origin));
    }
}

/// Build, persist, reload: counts and origins survive.
#[test]
fn persisted_graph_reloads_isomorphically() {
    let mut pts = connector(Voxel::planar(0, 10), Voxel::planar(20, 10));
    pts.extend(connector(Voxel::planar(10, 0), Voxel::planar(10, 20)));
    let graph = build(&planar(pts, 32), false);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    SkeletonFrame::from_graph(&graph, Shape::planar(32, 32), None)
        .unwrap()
        .write(&path)
        .unwrap();
    let back: Graph = SkeletonFrame::read(&path).unwrap().to_graph().unwrap();

    assert_eq!(back.node_count(), graph.node_count());
    assert_eq!(back.edge_count(), graph.edge_count());
    let mut a: Vec<Voxel> = graph.nodes().iter().map(|n| n.origin).collect();
    let mut b: Vec<Voxel> = back.nodes().iter().map(|n| n.origin).collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
    assert_eq!(back.degrees(), graph.degrees());
}
