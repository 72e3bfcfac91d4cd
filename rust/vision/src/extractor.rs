// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mask → skeleton point set.

use std::borrow::Cow;
use std::path::Path;

use fibergt_graph::{Dim, RotationPlan, SkeletonFrame, SkeletonPointSet, Voxel, VoxelBox};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::mask::VoxelMask;
use crate::postprocess::PostProcessing;
use crate::thinning::skeletonize;

/// What part of a mask to skeletonize and how to clean it up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionOptions {
    /// Half-open box in mask coordinates. For volumetric masks with a
    /// declared `depth`, the z range is in absolute slice numbers. Planar
    /// crops ignore z.
    pub crop: Option<VoxelBox>,
    /// Counter-clockwise rotation in degrees. Planar masks only, and a
    /// `crop` is required.
    pub rotate: Option<f64>,
    /// Slice range `[first, last)` the mask was loaded from; mask slice 0 is
    /// slice `first`.
    pub depth: Option<(usize, usize)>,
    /// Clean-up run on the thinned skeleton.
    pub post: PostProcessing,
}

impl ExtractionOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Crop in the mask's own frame, checked against the declared depth.
    fn local_crop(&self, dim: Dim) -> Result<Option<VoxelBox>> {
        let Some(mut crop) = self.crop else {
            return Ok(None);
        };
        match dim {
            Dim::Two => {
                crop.min.z = 0;
                crop.max.z = 1;
            }
            Dim::Three => {
                if let Some((first, last)) = self.depth {
                    if crop.min.z < first as i32 || crop.max.z > last as i32 {
                        return Err(Error::InvalidArgument(format!(
                            "crop z range {}..{} lies outside the loaded depth {first}..{last}",
                            crop.min.z, crop.max.z
                        )));
                    }
                    crop.min.z -= first as i32;
                    crop.max.z -= first as i32;
                }
            }
        }
        Ok(Some(crop))
    }
}

/// Thins binary masks into skeleton point sets.
#[derive(Debug, Clone, Default)]
pub struct SkeletonExtractor {
    options: ExtractionOptions,
}

impl SkeletonExtractor {
    pub fn new(options: ExtractionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Part of `mask` that gets thinned, re-origined to `(0, 0, 0)`: the
    /// crop, or the outer crop when rotating, or the whole mask. Skeleton
    /// coordinates index into this region until a rotation is applied, so
    /// edge weights that sample the mask must sample this.
    pub fn region<'a>(&self, mask: &'a VoxelMask) -> Result<Cow<'a, VoxelMask>> {
        Ok(self.prepare(mask)?.0)
    }

    /// Crops, thins and post-processes `mask`.
    ///
    /// With `rotate`, the skeleton is taken from the enlarged outer crop and
    /// carries a [`RotationPlan`] that the graph builder applies.
    pub fn extract(&self, mask: &VoxelMask) -> Result<SkeletonPointSet> {
        let (region, plan) = self.prepare(mask)?;

        let thinned = skeletonize(&region);
        let skeleton = self.options.post.apply(thinned);
        debug!(
            foreground = region.count(),
            skeleton = skeleton.count(),
            "extracted skeleton"
        );

        let points = skeleton.to_point_set();
        Ok(match plan {
            Some(plan) => points.with_rotation(plan),
            None => points,
        })
    }

    fn prepare<'a>(&self, mask: &'a VoxelMask) -> Result<(Cow<'a, VoxelMask>, Option<RotationPlan>)> {
        let dim = mask.dim();
        if self.options.rotate.is_some() && dim == Dim::Three {
            return Err(Error::InvalidArgument(
                "rotation is only supported for planar masks".into(),
            ));
        }
        if let (Dim::Three, Some((first, last))) = (dim, self.options.depth) {
            if last <= first || last - first != mask.shape().z {
                return Err(Error::InvalidArgument(format!(
                    "declared depth {first}..{last} does not match {} loaded slices",
                    mask.shape().z
                )));
            }
        }
        let crop = self.options.local_crop(dim)?;

        Ok(match (crop, self.options.rotate) {
            (None, Some(_)) => {
                return Err(Error::InvalidArgument("rotation requires a crop".into()));
            }
            (None, None) => (Cow::Borrowed(mask), None),
            (Some(crop), None) => (Cow::Owned(mask.crop(&crop)?), None),
            (Some(crop), Some(angle)) => {
                // the requested crop must fit even though the outer one is clipped
                mask.crop(&crop)?;
                let plan = RotationPlan::new(dim, angle, crop, mask.bounds())?;
                (Cow::Owned(mask.crop(&plan.outer)?), Some(plan))
            }
        })
    }

    /// Extracts and persists the skeleton as a [`SkeletonFrame`] at `path`.
    pub fn extract_to_file(&self, mask: &VoxelMask, path: impl AsRef<Path>) -> Result<SkeletonPointSet> {
        let points = self.extract(mask)?;
        SkeletonFrame::from_points(&points).write(path.as_ref())?;
        info!(path = %path.as_ref().display(), voxels = points.len(), "wrote skeleton");
        Ok(points)
    }
}

/// Bounding box of a point set's voxels, if any.
pub fn point_bounds(points: &SkeletonPointSet) -> Option<VoxelBox> {
    let first = *points.points().first()?;
    let (mut lo, mut hi) = (first, first);
    for p in points.points() {
        lo = Voxel::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z));
        hi = Voxel::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z));
    }
    Some(VoxelBox::new(lo, hi.offset([1, 1, 1])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fibergt_graph::{build, Shape};

    fn bar_mask() -> VoxelMask {
        let mut pts = Vec::new();
        for y in 18..23 {
            for x in 4..36 {
                pts.push(Voxel::planar(x, y));
            }
        }
        VoxelMask::from_points(Dim::Two, Shape::planar(40, 40), pts).unwrap()
    }

    fn planar_box(x0: i32, y0: i32, x1: i32, y1: i32) -> VoxelBox {
        VoxelBox::new(Voxel::planar(x0, y0), Voxel::new(x1, y1, 1))
    }

    #[test]
    fn plain_extraction_is_thin() {
        let points = SkeletonExtractor::default().extract(&bar_mask()).unwrap();
        assert!(!points.is_empty());
        let b = point_bounds(&points).unwrap();
        assert_eq!(b.extent().y, 1);
        let graph = build(&points, true);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn crop_reorigins_points() {
        let opts = ExtractionOptions {
            crop: Some(planar_box(10, 10, 30, 30)),
            ..Default::default()
        };
        let points = SkeletonExtractor::new(opts).extract(&bar_mask()).unwrap();
        assert_eq!(points.shape(), Shape::planar(20, 20));
        assert!(points.points().iter().all(|p| p.x < 20 && p.y < 20));
    }

    #[test]
    fn region_matches_skeleton_frame() {
        let opts = ExtractionOptions {
            crop: Some(planar_box(0, 10, 40, 30)),
            ..Default::default()
        };
        let extractor = SkeletonExtractor::new(opts);
        let mask = bar_mask();
        let region = extractor.region(&mask).unwrap();
        let points = extractor.extract(&mask).unwrap();
        assert_eq!(region.shape(), points.shape());
        assert!(points.points().iter().all(|p| region.get(p)));

        let whole = SkeletonExtractor::default();
        assert!(matches!(whole.region(&mask).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn rotation_without_crop_is_rejected() {
        let opts = ExtractionOptions {
            rotate: Some(30.0),
            ..Default::default()
        };
        let err = SkeletonExtractor::new(opts).extract(&bar_mask()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn rotation_of_volume_is_rejected() {
        let mask = VoxelMask::new(Dim::Three, Shape::new(8, 8, 4)).unwrap();
        let opts = ExtractionOptions {
            rotate: Some(30.0),
            crop: Some(VoxelBox::new(Voxel::new(0, 0, 0), Voxel::new(4, 4, 4))),
            ..Default::default()
        };
        assert!(SkeletonExtractor::new(opts).extract(&mask).is_err());
    }

    #[test]
    fn crop_outside_mask_is_rejected() {
        let opts = ExtractionOptions {
            crop: Some(planar_box(30, 30, 50, 50)),
            ..Default::default()
        };
        assert!(matches!(
            SkeletonExtractor::new(opts).extract(&bar_mask()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn crop_outside_depth_is_rejected() {
        let mask = VoxelMask::new(Dim::Three, Shape::new(8, 8, 4)).unwrap();
        let opts = ExtractionOptions {
            crop: Some(VoxelBox::new(Voxel::new(0, 0, 8), Voxel::new(4, 4, 14))),
            depth: Some((10, 14)),
            ..Default::default()
        };
        assert!(SkeletonExtractor::new(opts).extract(&mask).is_err());

        let inside = ExtractionOptions {
            crop: Some(VoxelBox::new(Voxel::new(0, 0, 11), Voxel::new(4, 4, 13))),
            depth: Some((10, 14)),
            ..Default::default()
        };
        let points = SkeletonExtractor::new(inside).extract(&mask).unwrap();
        assert_eq!(points.shape(), Shape::new(4, 4, 2));
    }

    #[test]
    fn rotated_extraction_carries_plan() {
        let mut pts = Vec::new();
        for y in 18..23 {
            for x in 14..26 {
                pts.push(Voxel::planar(x, y));
            }
        }
        let mask = VoxelMask::from_points(Dim::Two, Shape::planar(40, 40), pts).unwrap();
        let opts = ExtractionOptions {
            crop: Some(planar_box(10, 10, 30, 30)),
            rotate: Some(90.0),
            ..Default::default()
        };
        let points = SkeletonExtractor::new(opts).extract(&mask).unwrap();
        let plan = points.rotation().unwrap();
        assert_eq!(plan.angle_degrees, 90.0);
        // outer crop is the clipped square around the requested one
        assert_eq!(points.shape(), plan.outer.extent());

        let graph = build(&points, true);
        assert_eq!(graph.node_count(), 2);
        // a horizontal bar turns vertical
        let b = graph.bounds().unwrap();
        assert!(b.extent().y > b.extent().x);
    }

    #[test]
    fn extraction_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skeleton.json");
        let points = SkeletonExtractor::default()
            .extract_to_file(&bar_mask(), &path)
            .unwrap();
        let back = SkeletonFrame::read(&path).unwrap().to_point_set().unwrap();
        assert_eq!(back.points(), points.points());
    }

    #[test]
    fn options_parse_nested_post_processing() {
        let opts =
            ExtractionOptions::from_json(r#"{"crop": null, "post": {"prune": 3, "remove_objects": 10}}"#)
                .unwrap();
        assert_eq!(opts.post.prune, Some(3));
        assert!(ExtractionOptions::from_json(r#"{"rotation": 3}"#).is_err());
    }
}
