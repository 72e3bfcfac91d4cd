// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Skeleton point sets: the hand-off between thinning and graph tracing.

use serde::{Deserialize, Serialize};

use crate::transform::RotationPlan;
use crate::voxel::{Dim, Shape, Voxel};

/// Ordered, deduplicated skeleton voxels of one extraction.
///
/// Immutable once built. A pending [`RotationPlan`] travels with the points
/// because rotation is applied to the traced graph, never to the mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonPointSet {
    dim: Dim,
    shape: Shape,
    points: Vec<Voxel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rotation: Option<RotationPlan>,
}

impl SkeletonPointSet {
    /// Sorts (lexicographically) and deduplicates the points.
    pub fn new(dim: Dim, shape: Shape, points: impl IntoIterator<Item = Voxel>) -> Self {
        let mut points: Vec<Voxel> = points.into_iter().collect();
        points.sort_unstable();
        points.dedup();
        Self {
            dim,
            shape,
            points,
            rotation: None,
        }
    }

    /// Attaches a rotation to apply after tracing.
    pub fn with_rotation(mut self, plan: RotationPlan) -> Self {
        self.rotation = Some(plan);
        self
    }

    pub fn dim(&self) -> Dim {
        self.dim
    }

    /// Extent of the mask the skeleton was extracted from.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn points(&self) -> &[Voxel] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn rotation(&self) -> Option<&RotationPlan> {
        self.rotation.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_are_canonical() {
        let set = SkeletonPointSet::new(
            Dim::Two,
            Shape::planar(4, 4),
            vec![Voxel::planar(3, 1), Voxel::planar(0, 2), Voxel::planar(3, 1)],
        );
        assert_eq!(set.points(), &[Voxel::planar(0, 2), Voxel::planar(3, 1)]);
        assert!(set.rotation().is_none());
    }
}
