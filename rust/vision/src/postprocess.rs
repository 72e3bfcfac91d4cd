// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Skeleton clean-up steps run after thinning.

use fibergt_graph::Dim;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mask::VoxelMask;
use crate::morphology::{close, components, dilate, StructuringElement};
use crate::thinning::skeletonize;

/// Optional clean-up applied in field order. A missing step, a size of 0
/// and an empty element list all leave the skeleton untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostProcessing {
    /// Close small loops: thin and close once per element, then thin again.
    pub debubble: Option<Vec<StructuringElement>>,
    /// Radius used to fuse nearby branch points.
    pub merge_nodes: Option<u32>,
    /// Number of endpoint-stripping rounds.
    pub prune: Option<u32>,
    /// Components with fewer voxels than this are dropped.
    pub remove_objects: Option<usize>,
}

impl PostProcessing {
    pub fn is_noop(&self) -> bool {
        self.debubble.as_ref().map_or(true, |e| e.is_empty())
            && self.merge_nodes.unwrap_or(0) == 0
            && self.prune.unwrap_or(0) == 0
            && self.remove_objects.unwrap_or(0) == 0
    }

    /// Runs every configured step on a thinned skeleton.
    pub fn apply(&self, skeleton: VoxelMask) -> VoxelMask {
        let mut skel = skeleton;
        if let Some(elements) = self.debubble.as_deref() {
            skel = debubble(&skel, elements);
        }
        if let Some(radius) = self.merge_nodes {
            skel = merge_nodes(&skel, radius);
        }
        if let Some(rounds) = self.prune {
            skel = prune(&skel, rounds);
        }
        if let Some(min_size) = self.remove_objects {
            skel = remove_small_objects(&skel, min_size);
        }
        skel
    }
}

/// Voxels with three or more foreground neighbours.
pub fn branch_points(skel: &VoxelMask) -> VoxelMask {
    let mut out = skel.empty_like();
    for v in skel.foreground().filter(|v| skel.neighbour_count(v) >= 3) {
        out.set(&v, true);
    }
    out
}

/// Voxels with at most one foreground neighbour.
pub fn end_points(skel: &VoxelMask) -> VoxelMask {
    let mut out = skel.empty_like();
    for v in skel.foreground().filter(|v| skel.neighbour_count(v) <= 1) {
        out.set(&v, true);
    }
    out
}

pub fn debubble(skel: &VoxelMask, elements: &[StructuringElement]) -> VoxelMask {
    if elements.is_empty() {
        return skel.clone();
    }
    let mut out = skel.clone();
    for element in elements {
        out = close(&skeletonize(&out), element);
    }
    skeletonize(&out)
}

pub fn merge_nodes(skel: &VoxelMask, radius: u32) -> VoxelMask {
    if radius == 0 {
        return skel.clone();
    }
    let element = match skel.dim() {
        Dim::Two => StructuringElement::Disk { radius },
        Dim::Three => StructuringElement::Ball { radius },
    };
    let mut merged = skel.clone();
    for v in dilate(&branch_points(skel), &element).foreground() {
        merged.set(&v, true);
    }
    skeletonize(&merged)
}

/// Strips endpoints `rounds` times. Branch points found before the first
/// round are never removed.
pub fn prune(skel: &VoxelMask, rounds: u32) -> VoxelMask {
    let keep = branch_points(skel);
    let mut out = skel.clone();
    for round in 0..rounds {
        let tips: Vec<_> = end_points(&out)
            .foreground()
            .filter(|v| !keep.get(v))
            .collect();
        if tips.is_empty() {
            debug!(round, "pruning stopped early");
            break;
        }
        for v in &tips {
            out.set(v, false);
        }
    }
    out
}

pub fn remove_small_objects(skel: &VoxelMask, min_size: usize) -> VoxelMask {
    if min_size == 0 {
        return skel.clone();
    }
    let mut out = skel.empty_like();
    let mut dropped = 0usize;
    for component in components(skel) {
        if component.len() < min_size {
            dropped += 1;
            continue;
        }
        for v in &component {
            out.set(v, true);
        }
    }
    debug!(dropped, min_size, "removed small objects");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fibergt_graph::{connector, Shape, Voxel};

    fn sketch(size: usize, segments: &[((i32, i32), (i32, i32))]) -> VoxelMask {
        let pts = segments
            .iter()
            .flat_map(|&((ax, ay), (bx, by))| connector(Voxel::planar(ax, ay), Voxel::planar(bx, by)));
        VoxelMask::from_points(Dim::Two, Shape::planar(size, size), pts).unwrap()
    }

    #[test]
    fn zero_sizes_are_noops() {
        let skel = sketch(20, &[((2, 10), (17, 10)), ((10, 2), (10, 10))]);
        let post = PostProcessing {
            debubble: Some(vec![]),
            merge_nodes: Some(0),
            prune: Some(0),
            remove_objects: Some(0),
        };
        assert!(post.is_noop());
        assert_eq!(post.apply(skel.clone()), skel);
        assert_eq!(PostProcessing::default().apply(skel.clone()), skel);
    }

    #[test]
    fn branch_and_end_points_of_a_tee() {
        let skel = sketch(20, &[((2, 10), (17, 10)), ((10, 2), (10, 10))]);
        let ends = end_points(&skel);
        assert_eq!(ends.count(), 3);
        assert!(branch_points(&skel).get(&Voxel::planar(10, 10)));
    }

    #[test]
    fn prune_strips_spurs_but_keeps_junction() {
        let skel = sketch(20, &[((2, 10), (17, 10)), ((10, 7), (10, 10))]);
        let pruned = prune(&skel, 3);
        assert!(!pruned.get(&Voxel::planar(10, 7)));
        assert!(pruned.get(&Voxel::planar(10, 10)));
        // main line lost three voxels from each end
        assert!(!pruned.get(&Voxel::planar(4, 10)));
        assert!(pruned.get(&Voxel::planar(5, 10)));
    }

    #[test]
    fn nearby_junctions_are_fused() {
        let skel = sketch(
            20,
            &[((2, 10), (17, 10)), ((8, 3), (8, 10)), ((11, 10), (11, 17))],
        );
        let post = PostProcessing {
            merge_nodes: Some(2),
            ..Default::default()
        };
        let merged = post.apply(skel);
        assert!(merged.count() > 0);
        assert_eq!(components(&merged).len(), 1);
        for tip in [(2, 10), (17, 10), (8, 3), (11, 17)] {
            assert!(merged.get(&Voxel::planar(tip.0, tip.1)));
        }
    }

    #[test]
    fn small_objects_are_dropped() {
        let skel = sketch(30, &[((1, 1), (3, 1)), ((5, 20), (25, 20))]);
        let cleaned = remove_small_objects(&skel, 5);
        assert_eq!(cleaned.count(), 21);
        assert!(!cleaned.get(&Voxel::planar(1, 1)));
    }

    #[test]
    fn debubble_closes_small_loop() {
        // a 2x2 bubble on a straight line
        let mut skel = sketch(20, &[((2, 10), (17, 10))]);
        for v in [Voxel::planar(9, 9), Voxel::planar(10, 9), Voxel::planar(9, 11), Voxel::planar(10, 11)] {
            skel.set(&v, true);
        }
        skel.set(&Voxel::planar(8, 10), true);
        let post = PostProcessing {
            debubble: Some(vec![StructuringElement::Square { width: 3 }]),
            ..Default::default()
        };
        let out = post.apply(skel);
        assert_eq!(components(&out).len(), 1);
        assert!(out.count() > 0);
    }

    #[test]
    fn options_reject_unknown_keys() {
        let ok: PostProcessing =
            serde_json::from_str(r#"{"prune": 2, "debubble": [{"shape": "disk", "radius": 1}]}"#).unwrap();
        assert_eq!(ok.prune, Some(2));
        assert!(serde_json::from_str::<PostProcessing>(r#"{"prun": 2}"#).is_err());
    }
}
