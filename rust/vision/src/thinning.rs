// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Homotopic thinning of binary masks.
//!
//! Border voxels are peeled one direction at a time (±x, ±y and, in 3D,
//! ±z). A voxel is removed only if it is *simple* and not a curve endpoint.
//! Candidates of a sub-iteration are collected in one sweep and re-checked
//! one by one against the current mask before deletion, so parallel removal
//! can never split or merge components.
//!
//! Connectivity is 8/4 (foreground/background) in 2D and 26/6 in 3D.

use fibergt_graph::{Dim, Voxel};
use tracing::debug;

use crate::mask::VoxelMask;

/// 3×3×3 neighbourhood as a bitmask, bit `(dz+1)*9 + (dy+1)*3 + (dx+1)`.
type Cube = u32;

const CENTRE: usize = 13;

fn bit(d: [i32; 3]) -> usize {
    ((d[2] + 1) * 9 + (d[1] + 1) * 3 + (d[0] + 1)) as usize
}

fn offset_of(bit: usize) -> [i32; 3] {
    let b = bit as i32;
    [b % 3 - 1, (b / 3) % 3 - 1, b / 9 - 1]
}

fn cube_of(mask: &VoxelMask, v: &Voxel) -> Cube {
    mask.dim()
        .neighbourhood()
        .iter()
        .filter(|d| mask.get(&v.offset(**d)))
        .fold(0, |acc, d| acc | (1 << bit(*d)))
}

/// Components of `members` under `adjacency` that contain an `anchors` bit.
fn count_components(members: Cube, anchors: Cube, adjacency: &[[i32; 3]]) -> usize {
    let mut remaining = members;
    let mut count = 0;
    for seed in 0..27 {
        let seed_bit = 1 << seed;
        if anchors & remaining & seed_bit == 0 {
            continue;
        }
        count += 1;
        remaining &= !seed_bit;
        let mut stack = vec![seed];
        while let Some(cell) = stack.pop() {
            let o = offset_of(cell);
            for d in adjacency {
                let n = [o[0] + d[0], o[1] + d[1], o[2] + d[2]];
                if n.iter().any(|c| c.abs() > 1) {
                    continue;
                }
                let nb = bit(n);
                if remaining & (1 << nb) != 0 {
                    remaining &= !(1 << nb);
                    stack.push(nb);
                }
            }
        }
    }
    count
}

/// Bits of the neighbourhood examined for background components: N8 in 2D,
/// N18 in 3D. The centre is excluded.
fn background_support(dim: Dim) -> Cube {
    (0..27)
        .filter(|&b| b != CENTRE)
        .filter(|&b| {
            let o = offset_of(b);
            match dim {
                Dim::Two => o[2] == 0,
                Dim::Three => o.iter().map(|c| c.abs()).sum::<i32>() < 3,
            }
        })
        .fold(0, |acc, b| acc | (1 << b))
}

fn face_bits(dim: Dim) -> Cube {
    dim.faces().iter().fold(0, |acc, d| acc | (1 << bit(*d)))
}

/// Whether removing `v` leaves the topology of both foreground and
/// background unchanged.
pub fn is_simple(mask: &VoxelMask, v: &Voxel) -> bool {
    let dim = mask.dim();
    let cube = cube_of(mask, v);
    if count_components(cube, cube, dim.neighbourhood()) != 1 {
        return false;
    }
    let support = background_support(dim);
    let background = support & !cube;
    count_components(background, face_bits(dim), dim.faces()) == 1
}

/// A foreground voxel with exactly one foreground neighbour.
pub fn is_endpoint(mask: &VoxelMask, v: &Voxel) -> bool {
    mask.neighbour_count(v) == 1
}

fn deletable(mask: &VoxelMask, v: &Voxel) -> bool {
    mask.get(v) && !is_endpoint(mask, v) && is_simple(mask, v)
}

/// Thins `mask` to a one-voxel-wide skeleton with the same topology.
///
/// Applying it again to its own output changes nothing.
pub fn skeletonize(mask: &VoxelMask) -> VoxelMask {
    let mut out = mask.clone();
    let directions = out.dim().faces();
    let mut passes = 0usize;
    loop {
        let mut removed = 0usize;
        for d in directions {
            let candidates: Vec<Voxel> = out
                .foreground()
                .filter(|v| !out.get(&v.offset(*d)))
                .filter(|v| deletable(&out, v))
                .collect();
            for v in candidates {
                if deletable(&out, &v) {
                    out.set(&v, false);
                    removed += 1;
                }
            }
        }
        passes += 1;
        if removed == 0 {
            break;
        }
    }
    debug!(passes, before = mask.count(), after = out.count(), "thinning converged");
    out
}
