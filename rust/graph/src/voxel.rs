// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integer lattice coordinates shared by masks, skeletons and graphs.
//!
//! `x` is the image column, `y` the image row and `z` the slice index.
//! Two-dimensional data always carries `z == 0`. The derived ordering is
//! lexicographic over `(x, y, z)` and is what makes node numbering stable.

use serde::{Deserialize, Serialize};

/// Dimensionality of a network. Fixed for the lifetime of a mask or graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    Two,
    Three,
}

impl Dim {
    /// Number of spatial axes.
    pub fn axes(self) -> usize {
        match self {
            Dim::Two => 2,
            Dim::Three => 3,
        }
    }

    /// Full neighbourhood offsets (8 in 2D, 26 in 3D).
    pub fn neighbourhood(self) -> &'static [[i32; 3]] {
        match self {
            Dim::Two => &N8,
            Dim::Three => &N26,
        }
    }

    /// Face-sharing neighbourhood offsets (4 in 2D, 6 in 3D).
    pub fn faces(self) -> &'static [[i32; 3]] {
        match self {
            Dim::Two => &N4,
            Dim::Three => &N6,
        }
    }

    pub fn from_axes(axes: usize) -> Option<Self> {
        match axes {
            2 => Some(Dim::Two),
            3 => Some(Dim::Three),
            _ => None,
        }
    }
}

const N4: [[i32; 3]; 4] = [[-1, 0, 0], [1, 0, 0], [0, -1, 0], [0, 1, 0]];

const N6: [[i32; 3]; 6] = [
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

const N8: [[i32; 3]; 8] = [
    [-1, -1, 0],
    [-1, 0, 0],
    [-1, 1, 0],
    [0, -1, 0],
    [0, 1, 0],
    [1, -1, 0],
    [1, 0, 0],
    [1, 1, 0],
];

const N26: [[i32; 3]; 26] = [
    [-1, -1, -1],
    [-1, -1, 0],
    [-1, -1, 1],
    [-1, 0, -1],
    [-1, 0, 0],
    [-1, 0, 1],
    [-1, 1, -1],
    [-1, 1, 0],
    [-1, 1, 1],
    [0, -1, -1],
    [0, -1, 0],
    [0, -1, 1],
    [0, 0, -1],
    [0, 0, 1],
    [0, 1, -1],
    [0, 1, 0],
    [0, 1, 1],
    [1, -1, -1],
    [1, -1, 0],
    [1, -1, 1],
    [1, 0, -1],
    [1, 0, 0],
    [1, 0, 1],
    [1, 1, -1],
    [1, 1, 0],
    [1, 1, 1],
];

/// A lattice coordinate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Voxel {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Voxel {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// A planar coordinate (`z == 0`).
    pub const fn planar(x: i32, y: i32) -> Self {
        Self { x, y, z: 0 }
    }

    /// Coordinate along `axis` (0 = x, 1 = y, 2 = z).
    pub fn axis(&self, axis: usize) -> i32 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Returns a copy with the coordinate along `axis` replaced.
    pub fn with_axis(mut self, axis: usize, value: i32) -> Self {
        match axis {
            0 => self.x = value,
            1 => self.y = value,
            _ => self.z = value,
        }
        self
    }

    pub fn offset(&self, d: [i32; 3]) -> Self {
        Self::new(self.x + d[0], self.y + d[1], self.z + d[2])
    }

    /// Manhattan distance.
    pub fn l1(&self, other: &Voxel) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }

    /// Chebyshev distance; 1 means the voxels touch.
    pub fn linf(&self, other: &Voxel) -> i32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &Voxel) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        let dz = (self.z - other.z) as f64;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn to_f64(&self) -> [f64; 3] {
        [self.x as f64, self.y as f64, self.z as f64]
    }

    /// Nearest lattice point to a real coordinate.
    pub fn round(p: [f64; 3]) -> Self {
        Self::new(p[0].round() as i32, p[1].round() as i32, p[2].round() as i32)
    }
}

/// Extent of a mask along each axis. Planar masks have `z == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Shape {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    pub fn planar(x: usize, y: usize) -> Self {
        Self { x, y, z: 1 }
    }

    pub fn axis(&self, axis: usize) -> usize {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn len(&self) -> usize {
        self.x * self.y * self.z
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a coordinate lies inside `[0, extent)` on every axis.
    pub fn contains(&self, v: &Voxel) -> bool {
        v.x >= 0
            && v.y >= 0
            && v.z >= 0
            && (v.x as usize) < self.x
            && (v.y as usize) < self.y
            && (v.z as usize) < self.z
    }
}

/// Axis-aligned half-open box `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelBox {
    pub min: Voxel,
    pub max: Voxel,
}

impl VoxelBox {
    pub fn new(min: Voxel, max: Voxel) -> Self {
        Self { min, max }
    }

    /// Box covering a whole shape.
    pub fn of_shape(shape: Shape) -> Self {
        Self {
            min: Voxel::default(),
            max: Voxel::new(shape.x as i32, shape.y as i32, shape.z as i32),
        }
    }

    pub fn contains(&self, v: &Voxel) -> bool {
        v.x >= self.min.x
            && v.x < self.max.x
            && v.y >= self.min.y
            && v.y < self.max.y
            && v.z >= self.min.z
            && v.z < self.max.z
    }

    pub fn extent(&self) -> Shape {
        Shape::new(
            (self.max.x - self.min.x).max(0) as usize,
            (self.max.y - self.min.y).max(0) as usize,
            (self.max.z - self.min.z).max(0) as usize,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y || self.max.z <= self.min.z
    }

    /// Centre in real coordinates.
    pub fn centre(&self) -> [f64; 3] {
        [
            (self.min.x + self.max.x) as f64 / 2.0,
            (self.min.y + self.max.y) as f64 / 2.0,
            (self.min.z + self.max.z) as f64 / 2.0,
        ]
    }
}

/// Lattice points on the straight segment from `a` to `b`, both inclusive.
///
/// Used for ghost-node edges and for edges reloaded without a traced path.
pub fn connector(a: Voxel, b: Voxel) -> Vec<Voxel> {
    let steps = a.linf(&b);
    if steps == 0 {
        return vec![a];
    }
    let (pa, pb) = (a.to_f64(), b.to_f64());
    let mut out: Vec<Voxel> = Vec::with_capacity(steps as usize + 1);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let p = Voxel::round([
            pa[0] + (pb[0] - pa[0]) * t,
            pa[1] + (pb[1] - pa[1]) * t,
            pa[2] + (pb[2] - pa[2]) * t,
        ]);
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    out
}
