// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary voxel masks.

use fibergt_graph::{Dim, Shape, SkeletonPointSet, Voxel, VoxelBox};
use image::{GrayImage, Luma};

use crate::error::{Error, Result};

/// A 2D or 3D boolean array. Planar masks have `shape.z == 1`; the origin is
/// always the `(0, 0, 0)` corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelMask {
    dim: Dim,
    shape: Shape,
    data: Vec<bool>,
}

impl VoxelMask {
    /// An all-background mask.
    pub fn new(dim: Dim, shape: Shape) -> Result<Self> {
        if dim == Dim::Two && shape.z != 1 {
            return Err(Error::InvalidArgument(format!(
                "planar mask must have z extent 1, got {}",
                shape.z
            )));
        }
        Ok(Self {
            dim,
            shape,
            data: vec![false; shape.len()],
        })
    }

    /// Mask whose set voxels are `points` (points outside are ignored).
    pub fn from_points(dim: Dim, shape: Shape, points: impl IntoIterator<Item = Voxel>) -> Result<Self> {
        let mut mask = Self::new(dim, shape)?;
        for p in points {
            mask.set(&p, true);
        }
        Ok(mask)
    }

    /// Planar mask from a grayscale image: non-zero pixels are foreground.
    pub fn from_gray(image: &GrayImage) -> Self {
        let shape = Shape::planar(image.width() as usize, image.height() as usize);
        let data = (0..image.height())
            .flat_map(|y| (0..image.width()).map(move |x| (x, y)))
            .map(|(x, y)| image.get_pixel(x, y).0[0] > 0)
            .collect();
        Self {
            dim: Dim::Two,
            shape,
            data,
        }
    }

    /// Volumetric mask from equally sized slices, slice `i` at `z == i`.
    pub fn from_slices(slices: &[GrayImage]) -> Result<Self> {
        let first = slices
            .first()
            .ok_or_else(|| Error::InvalidArgument("no slices given".into()))?;
        let (w, h) = first.dimensions();
        let mut mask = Self::new(Dim::Three, Shape::new(w as usize, h as usize, slices.len()))?;
        for (z, slice) in slices.iter().enumerate() {
            if slice.dimensions() != (w, h) {
                return Err(Error::InvalidArgument(format!(
                    "slice {z} is {}x{}, expected {w}x{h}",
                    slice.width(),
                    slice.height()
                )));
            }
            for (x, y, px) in slice.enumerate_pixels() {
                if px.0[0] > 0 {
                    mask.set(&Voxel::new(x as i32, y as i32, z as i32), true);
                }
            }
        }
        Ok(mask)
    }

    /// All-background mask with the same dimension and shape.
    pub fn empty_like(&self) -> Self {
        Self {
            dim: self.dim,
            shape: self.shape,
            data: vec![false; self.data.len()],
        }
    }

    pub fn dim(&self) -> Dim {
        self.dim
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn bounds(&self) -> VoxelBox {
        VoxelBox::of_shape(self.shape)
    }

    fn index(&self, v: &Voxel) -> Option<usize> {
        self.shape.contains(v).then(|| {
            (v.z as usize * self.shape.y + v.y as usize) * self.shape.x + v.x as usize
        })
    }

    fn voxel_at(&self, index: usize) -> Voxel {
        let x = index % self.shape.x;
        let y = (index / self.shape.x) % self.shape.y;
        let z = index / (self.shape.x * self.shape.y);
        Voxel::new(x as i32, y as i32, z as i32)
    }

    /// Value at `v`; coordinates outside the mask read as background.
    pub fn get(&self, v: &Voxel) -> bool {
        self.index(v).is_some_and(|i| self.data[i])
    }

    /// Sets `v`; coordinates outside the mask are ignored.
    pub fn set(&mut self, v: &Voxel, value: bool) {
        if let Some(i) = self.index(v) {
            self.data[i] = value;
        }
    }

    /// Number of foreground voxels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// Foreground voxels in ascending storage order.
    pub fn foreground(&self) -> impl Iterator<Item = Voxel> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(|(i, _)| self.voxel_at(i))
    }

    /// Number of foreground voxels in the full neighbourhood of `v`.
    pub fn neighbour_count(&self, v: &Voxel) -> usize {
        self.dim
            .neighbourhood()
            .iter()
            .filter(|d| self.get(&v.offset(**d)))
            .count()
    }

    /// Sub-mask for a half-open box, re-origined to `(0, 0, 0)`.
    ///
    /// The box must lie inside the mask and be non-empty.
    pub fn crop(&self, bbox: &VoxelBox) -> Result<Self> {
        let inside = bbox.min.x >= 0
            && bbox.min.y >= 0
            && bbox.min.z >= 0
            && bbox.max.x as usize <= self.shape.x
            && bbox.max.y as usize <= self.shape.y
            && bbox.max.z as usize <= self.shape.z;
        if bbox.is_empty() || !inside {
            return Err(Error::InvalidArgument(format!(
                "crop {:?}..{:?} does not fit a {}x{}x{} mask",
                bbox.min, bbox.max, self.shape.x, self.shape.y, self.shape.z
            )));
        }
        let extent = bbox.extent();
        let mut out = Self::new(self.dim, extent)?;
        for z in 0..extent.z as i32 {
            for y in 0..extent.y as i32 {
                for x in 0..extent.x as i32 {
                    let src = Voxel::new(x + bbox.min.x, y + bbox.min.y, z + bbox.min.z);
                    if self.get(&src) {
                        out.set(&Voxel::new(x, y, z), true);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Voxel-wise OR with a mask of the same shape.
    pub fn union(&self, other: &VoxelMask) -> Result<Self> {
        if self.shape != other.shape {
            return Err(Error::InvalidArgument("mask shapes differ".into()));
        }
        let data = self.data.iter().zip(&other.data).map(|(a, b)| *a || *b).collect();
        Ok(Self {
            dim: self.dim,
            shape: self.shape,
            data,
        })
    }

    pub fn to_point_set(&self) -> SkeletonPointSet {
        SkeletonPointSet::new(self.dim, self.shape, self.foreground())
    }

    /// Planar mask as a black/white image.
    pub fn to_gray(&self) -> Result<GrayImage> {
        if self.dim != Dim::Two {
            return Err(Error::InvalidArgument("only planar masks convert to images".into()));
        }
        let mut img = GrayImage::new(self.shape.x as u32, self.shape.y as u32);
        for v in self.foreground() {
            img.put_pixel(v.x as u32, v.y as u32, Luma([255]));
        }
        Ok(img)
    }
}
