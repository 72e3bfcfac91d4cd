// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rotation correction for planar networks.
//!
//! Rotating the mask itself would resample pixels and break thin filaments,
//! so rotation is applied to the traced graph instead. The skeleton is traced
//! inside an enlarged "outer" crop whose content covers the requested crop
//! under any rotation; afterwards node and edge coordinates are rotated about
//! the requested ("inner") crop's centre, nodes outside the inner crop are
//! discarded and the result is shifted back to the origin. The outer crop is
//! clipped to the mask, so its own centre can sit off the inner one.

use nalgebra::{Point2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::spatial::VoxelIndex;
use crate::voxel::{Dim, Voxel, VoxelBox};

/// A pending planar rotation, expressed in the outer crop's local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationPlan {
    /// Rotation angle in degrees, counter-clockwise in (x, y).
    pub angle_degrees: f64,
    /// Outer crop, in mask coordinates.
    pub outer: VoxelBox,
    /// Requested crop, in mask coordinates.
    pub inner: VoxelBox,
}

impl RotationPlan {
    /// Plans a rotation of the planar crop `inner` within a mask.
    ///
    /// The outer crop is the square of side `⌈diagonal⌉` centred on `inner`,
    /// clipped to `bounds`.
    pub fn new(dim: Dim, angle_degrees: f64, inner: VoxelBox, bounds: VoxelBox) -> Result<Self> {
        if dim != Dim::Two {
            return Err(Error::InvalidArgument(
                "rotation is only supported for planar networks".into(),
            ));
        }
        if !angle_degrees.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "rotation angle must be finite, got {angle_degrees}"
            )));
        }
        if inner.is_empty() {
            return Err(Error::InvalidArgument("rotation crop is empty".into()));
        }

        let extent = inner.extent();
        let diagonal = ((extent.x * extent.x + extent.y * extent.y) as f64).sqrt();
        let half = (diagonal / 2.0).ceil() as i32;
        let centre = inner.centre();
        let (cx, cy) = (centre[0].floor() as i32, centre[1].floor() as i32);

        let outer = VoxelBox::new(
            Voxel::new(
                (cx - half).max(bounds.min.x),
                (cy - half).max(bounds.min.y),
                inner.min.z,
            ),
            Voxel::new(
                (cx + half).min(bounds.max.x),
                (cy + half).min(bounds.max.y),
                inner.max.z,
            ),
        );

        Ok(Self {
            angle_degrees,
            outer,
            inner,
        })
    }

    /// Requested crop in the outer crop's local frame.
    pub fn local_inner(&self) -> VoxelBox {
        let shift = |v: Voxel| Voxel::new(v.x - self.outer.min.x, v.y - self.outer.min.y, 0);
        let mut b = VoxelBox::new(shift(self.inner.min), shift(self.inner.max));
        b.max.z = 1;
        b
    }

    /// Rotates a graph traced in the outer crop about the inner crop's
    /// centre, then crops and re-origins it.
    ///
    /// Returns the number of nodes dropped for falling outside the requested
    /// crop.
    pub fn apply(&self, graph: &mut Graph) -> usize {
        let c = self.inner.centre();
        let centre = Point2::new(
            c[0] - self.outer.min.x as f64,
            c[1] - self.outer.min.y as f64,
        );
        let rotation = Rotation2::new(self.angle_degrees.to_radians());

        graph.map_coordinates(|v| {
            let p = Point2::new(v.x as f64, v.y as f64) - centre.coords;
            let r: Vector2<f64> = rotation * p.coords + centre.coords;
            Voxel::round([r.x, r.y, 0.0])
        });

        let index = VoxelIndex::new(Dim::Two, graph.nodes().iter().map(|n| n.origin));
        let inside: rustc_hash::FxHashSet<Voxel> = index
            .within(&self.local_inner())
            .into_iter()
            .map(|i| index.point(i))
            .collect();
        let dropped = graph.retain_nodes(|_, node| inside.contains(&node.origin));

        if let Some(bounds) = graph.bounds() {
            let min = bounds.min;
            graph.map_coordinates(|v| Voxel::new(v.x - min.x, v.y - min.y, v.z - min.z));
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> VoxelBox {
        VoxelBox::new(Voxel::default(), Voxel::new(100, 100, 1))
    }

    fn inner() -> VoxelBox {
        VoxelBox::new(Voxel::planar(40, 40), Voxel::new(60, 60, 1))
    }

    #[test]
    fn three_dimensional_rotation_is_rejected() {
        let err = RotationPlan::new(Dim::Three, 30.0, inner(), bounds()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn outer_crop_covers_diagonal() {
        let plan = RotationPlan::new(Dim::Two, 45.0, inner(), bounds()).unwrap();
        // diagonal of a 20×20 square ≈ 28.3 → half side 15
        assert_eq!(plan.outer.min, Voxel::planar(35, 35));
        assert_eq!(plan.outer.max, Voxel::new(65, 65, 1));
        assert_eq!(plan.local_inner().min, Voxel::planar(5, 5));
    }

    #[test]
    fn outer_crop_is_clipped_to_bounds() {
        let corner = VoxelBox::new(Voxel::planar(0, 0), Voxel::new(20, 20, 1));
        let plan = RotationPlan::new(Dim::Two, 10.0, corner, bounds()).unwrap();
        assert_eq!(plan.outer.min, Voxel::planar(0, 0));
    }

    #[test]
    fn clipped_outer_crop_rotates_about_requested_centre() {
        let corner = VoxelBox::new(Voxel::planar(0, 0), Voxel::new(20, 20, 1));
        let plan = RotationPlan::new(Dim::Two, 90.0, corner, bounds()).unwrap();
        assert_eq!(plan.outer.min, Voxel::planar(0, 0));
        assert_eq!(plan.outer.max, Voxel::new(25, 25, 1));

        let mut g = Graph::new(Dim::Two);
        let a = g.add_node(Voxel::planar(10, 10));
        let b = g.add_node(Voxel::planar(10, 2));
        g.add_edge(a, b, crate::voxel::connector(Voxel::planar(10, 10), Voxel::planar(10, 2)));

        // (10, 2) is 8 below the crop centre and turns to (18, 10)
        let dropped = plan.apply(&mut g);
        assert_eq!(dropped, 0);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node(0).origin, Voxel::planar(0, 0));
        assert_eq!(g.node(1).origin, Voxel::planar(8, 0));
    }

    #[test]
    fn quarter_turn_keeps_centre_and_drops_outliers() {
        let plan = RotationPlan::new(Dim::Two, 90.0, inner(), bounds()).unwrap();
        // outer extent 30×30, centre (15, 15); inner local [5, 25)
        let mut g = Graph::new(Dim::Two);
        let a = g.add_node(Voxel::planar(15, 15));
        let b = g.add_node(Voxel::planar(20, 15));
        let far = g.add_node(Voxel::planar(29, 15));
        g.add_edge(a, b, crate::voxel::connector(Voxel::planar(15, 15), Voxel::planar(20, 15)));
        g.add_edge(b, far, crate::voxel::connector(Voxel::planar(20, 15), Voxel::planar(29, 15)));

        let dropped = plan.apply(&mut g);
        assert_eq!(dropped, 1);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);

        // (20, 15) rotates to (15, 20); after the shift the graph starts at 0
        let b = g.bounds().unwrap();
        assert_eq!(b.min, Voxel::planar(0, 0));
        assert_eq!(g.node(1).origin.x - g.node(0).origin.x, 0);
        assert_eq!(g.node(1).origin.y - g.node(0).origin.y, 5);
    }
}
