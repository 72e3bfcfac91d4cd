// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary morphology on voxel masks.

use std::collections::VecDeque;

use fibergt_graph::{Dim, Voxel};
use serde::{Deserialize, Serialize};

use crate::mask::VoxelMask;

/// Footprint used by closing and dilation. Planar masks only use the
/// `z == 0` layer of volumetric elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case", deny_unknown_fields)]
pub enum StructuringElement {
    /// Euclidean disk of the given radius (planar).
    Disk { radius: u32 },
    /// Axis-aligned square of the given side (planar).
    Square { width: u32 },
    /// Euclidean ball of the given radius.
    Ball { radius: u32 },
    /// Axis-aligned cube of the given side.
    Cube { width: u32 },
}

impl StructuringElement {
    /// Offsets covered by the element in a mask of dimension `dim`.
    pub fn offsets(&self, dim: Dim) -> Vec<[i32; 3]> {
        let planar = dim == Dim::Two;
        let mut out = Vec::new();
        match *self {
            StructuringElement::Disk { radius } | StructuringElement::Ball { radius } => {
                let r = radius as i32;
                let rz = if planar || matches!(self, StructuringElement::Disk { .. }) {
                    0
                } else {
                    r
                };
                for dz in -rz..=rz {
                    for dy in -r..=r {
                        for dx in -r..=r {
                            if dx * dx + dy * dy + dz * dz <= r * r {
                                out.push([dx, dy, dz]);
                            }
                        }
                    }
                }
            }
            StructuringElement::Square { width } | StructuringElement::Cube { width } => {
                // even widths extend one further on the negative side
                let w = width.max(1) as i32;
                let lo = -(w / 2);
                let hi = lo + w - 1;
                let (zlo, zhi) = if planar || matches!(self, StructuringElement::Square { .. }) {
                    (0, 0)
                } else {
                    (lo, hi)
                };
                for dz in zlo..=zhi {
                    for dy in lo..=hi {
                        for dx in lo..=hi {
                            out.push([dx, dy, dz]);
                        }
                    }
                }
            }
        }
        out
    }
}

/// Voxels set in `mask` or within the element of a set voxel.
pub fn dilate(mask: &VoxelMask, element: &StructuringElement) -> VoxelMask {
    let offsets = element.offsets(mask.dim());
    let mut out = mask.empty_like();
    for v in mask.foreground() {
        for d in &offsets {
            out.set(&v.offset(*d), true);
        }
    }
    out
}

/// Voxels whose whole element neighbourhood is set. Outside the mask counts
/// as set, so erosion does not eat in from the border.
pub fn erode(mask: &VoxelMask, element: &StructuringElement) -> VoxelMask {
    let offsets = element.offsets(mask.dim());
    let shape = mask.shape();
    let mut out = mask.empty_like();
    for v in mask.foreground() {
        let keep = offsets.iter().all(|d| {
            let p = v.offset([-d[0], -d[1], -d[2]]);
            !shape.contains(&p) || mask.get(&p)
        });
        if keep {
            out.set(&v, true);
        }
    }
    out
}

/// Morphological closing (dilate then erode) - fills small gaps and holes.
pub fn close(mask: &VoxelMask, element: &StructuringElement) -> VoxelMask {
    erode(&dilate(mask, element), element)
}

/// Connected components of the foreground under full connectivity
/// (8 in 2D, 26 in 3D), each sorted, in order of their smallest voxel.
pub fn components(mask: &VoxelMask) -> Vec<Vec<Voxel>> {
    let mut seen = mask.empty_like();
    let mut out = Vec::new();
    for start in mask.foreground() {
        if seen.get(&start) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        seen.set(&start, true);
        while let Some(v) = queue.pop_front() {
            component.push(v);
            for d in mask.dim().neighbourhood() {
                let w = v.offset(*d);
                if mask.get(&w) && !seen.get(&w) {
                    seen.set(&w, true);
                    queue.push_back(w);
                }
            }
        }
        component.sort_unstable();
        out.push(component);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fibergt_graph::Shape;

    fn planar(points: &[(i32, i32)], size: usize) -> VoxelMask {
        VoxelMask::from_points(
            Dim::Two,
            Shape::planar(size, size),
            points.iter().map(|&(x, y)| Voxel::planar(x, y)),
        )
        .unwrap()
    }

    #[test]
    fn element_sizes() {
        assert_eq!(StructuringElement::Disk { radius: 1 }.offsets(Dim::Two).len(), 5);
        assert_eq!(StructuringElement::Square { width: 3 }.offsets(Dim::Two).len(), 9);
        assert_eq!(StructuringElement::Square { width: 2 }.offsets(Dim::Two).len(), 4);
        assert_eq!(StructuringElement::Ball { radius: 1 }.offsets(Dim::Three).len(), 7);
        assert_eq!(StructuringElement::Cube { width: 3 }.offsets(Dim::Three).len(), 27);
        // planar masks flatten volumetric elements
        assert_eq!(StructuringElement::Cube { width: 3 }.offsets(Dim::Two).len(), 9);
    }

    #[test]
    fn closing_fills_pinhole() {
        let mut pts = Vec::new();
        for x in 2..7 {
            for y in 2..7 {
                if (x, y) != (4, 4) {
                    pts.push((x, y));
                }
            }
        }
        let mask = planar(&pts, 10);
        let closed = close(&mask, &StructuringElement::Square { width: 3 });
        assert!(closed.get(&Voxel::planar(4, 4)));
        assert_eq!(closed.count(), 25);
    }

    #[test]
    fn closing_keeps_border_pixels() {
        let pts: Vec<(i32, i32)> = (0..5).map(|x| (x, 0)).collect();
        let mask = planar(&pts, 5);
        let closed = close(&mask, &StructuringElement::Disk { radius: 1 });
        for x in 0..5 {
            assert!(closed.get(&Voxel::planar(x, 0)));
        }
    }

    #[test]
    fn components_use_diagonal_connectivity() {
        let mask = planar(&[(0, 0), (1, 1), (5, 5), (5, 6)], 8);
        let comps = components(&mask);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0], vec![Voxel::planar(0, 0), Voxel::planar(1, 1)]);
        assert_eq!(comps[1].len(), 2);
    }
}
