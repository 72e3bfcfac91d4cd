// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index over lattice coordinates.
//!
//! Points are kept in ascending lexicographic order so that an index doubles
//! as a stable numbering. Exact lookups go through a hash map; box queries go
//! through a coarse grid hash of cubic buckets of side `cell_size`, so only
//! the buckets overlapping a query box are scanned.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::voxel::{Dim, Voxel, VoxelBox};

/// Neighbour list sized for the 3D neighbourhood.
pub type Neighbours = SmallVec<[usize; 8]>;

const DEFAULT_CELL_SIZE: i32 = 16;

/// Index over a deduplicated set of voxels.
#[derive(Debug, Clone)]
pub struct VoxelIndex {
    dim: Dim,
    cell_size: i32,
    points: Vec<Voxel>,
    lookup: FxHashMap<Voxel, usize>,
    grid: FxHashMap<(i32, i32, i32), Vec<usize>>,
}

impl VoxelIndex {
    /// Builds an index, sorting and deduplicating the input.
    pub fn new(dim: Dim, points: impl IntoIterator<Item = Voxel>) -> Self {
        Self::with_cell_size(dim, points, DEFAULT_CELL_SIZE)
    }

    /// Builds an index with an explicit bucket size (clamped to at least 1).
    pub fn with_cell_size(dim: Dim, points: impl IntoIterator<Item = Voxel>, cell_size: i32) -> Self {
        let mut points: Vec<Voxel> = points.into_iter().collect();
        points.sort_unstable();
        points.dedup();

        let cell_size = cell_size.max(1);
        let mut lookup = FxHashMap::default();
        lookup.reserve(points.len());
        let mut grid: FxHashMap<(i32, i32, i32), Vec<usize>> = FxHashMap::default();
        for (i, p) in points.iter().enumerate() {
            lookup.insert(*p, i);
            grid.entry(cell_of(p, cell_size)).or_default().push(i);
        }

        Self {
            dim,
            cell_size,
            points,
            lookup,
            grid,
        }
    }

    pub fn dim(&self) -> Dim {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in ascending lexicographic order.
    pub fn points(&self) -> &[Voxel] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Voxel {
        self.points[index]
    }

    pub fn index_of(&self, v: &Voxel) -> Option<usize> {
        self.lookup.get(v).copied()
    }

    pub fn contains(&self, v: &Voxel) -> bool {
        self.lookup.contains_key(v)
    }

    /// Indices of points touching `index` in the full neighbourhood
    /// (8 in 2D, 26 in 3D), in ascending order.
    pub fn touching(&self, index: usize) -> Neighbours {
        let p = self.points[index];
        let mut out: Neighbours = self
            .dim
            .neighbourhood()
            .iter()
            .filter_map(|d| self.index_of(&p.offset(*d)))
            .collect();
        out.sort_unstable();
        out
    }

    /// Indices of points m-adjacent to `index`, in ascending order.
    ///
    /// A touching point `q` is adjacent to `p` unless some third point is
    /// strictly closer (in L1) to both of them. Staircase corners therefore
    /// connect through the corner voxel instead of forming a triangle.
    pub fn adjacent(&self, index: usize) -> Neighbours {
        let p = self.points[index];
        let touching = self.touching(index);
        touching
            .iter()
            .copied()
            .filter(|&qi| {
                let q = self.points[qi];
                let d = p.l1(&q);
                if d == 1 {
                    return true;
                }
                !touching.iter().any(|&ri| {
                    let r = self.points[ri];
                    ri != qi && r.linf(&q) == 1 && p.l1(&r) < d && q.l1(&r) < d
                })
            })
            .collect()
    }

    /// Indices of points inside a half-open box, in ascending order.
    pub fn within(&self, bbox: &VoxelBox) -> Vec<usize> {
        if bbox.is_empty() || self.points.is_empty() {
            return Vec::new();
        }
        let lo = cell_of(&bbox.min, self.cell_size);
        let hi = cell_of(
            &Voxel::new(bbox.max.x - 1, bbox.max.y - 1, bbox.max.z - 1),
            self.cell_size,
        );

        let mut out = Vec::new();
        for cx in lo.0..=hi.0 {
            for cy in lo.1..=hi.1 {
                for cz in lo.2..=hi.2 {
                    if let Some(bucket) = self.grid.get(&(cx, cy, cz)) {
                        out.extend(
                            bucket
                                .iter()
                                .copied()
                                .filter(|&i| bbox.contains(&self.points[i])),
                        );
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// Tight half-open bounding box, or `None` when empty.
    pub fn bounds(&self) -> Option<VoxelBox> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.points {
            min = Voxel::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Voxel::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        Some(VoxelBox::new(min, Voxel::new(max.x + 1, max.y + 1, max.z + 1)))
    }
}

fn cell_of(v: &Voxel, cell_size: i32) -> (i32, i32, i32) {
    (
        v.x.div_euclid(cell_size),
        v.y.div_euclid(cell_size),
        v.z.div_euclid(cell_size),
    )
}
