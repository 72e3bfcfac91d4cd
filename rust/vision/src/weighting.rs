// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Physical edge weights sampled from the mask a graph was traced from.
//!
//! Widths come from ray casting perpendicular to the local path tangent
//! until the ray leaves the mask. Lengths are Euclidean arc lengths, areas
//! integrate width over arc length, and conductances follow
//! `G = 1 / (R_j + ρ · ∫ dl / A)`.

use std::f64::consts::PI;

use fibergt_graph::{Dim, Edge, EdgeWeights, Graph, JunctionResistance, Voxel};
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::mask::VoxelMask;

/// Which edge attribute to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingScheme {
    Length,
    Width,
    Area,
    /// Uniform cross-section `A0` along the whole edge.
    FixedWidthConductance,
    /// Cross-section `π (w/2)²` from the sampled width at each path step.
    VariableWidthConductance,
}

/// Physical constants for the conductance schemes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightingParams {
    pub junction_resistance: JunctionResistance,
    /// Resistivity in voxel units.
    pub rho_dim: f64,
    /// Cross-section assumed by [`WeightingScheme::FixedWidthConductance`].
    pub cross_section: f64,
}

impl Default for WeightingParams {
    fn default() -> Self {
        Self {
            junction_resistance: JunctionResistance::default(),
            rho_dim: 1.0,
            cross_section: 1.0,
        }
    }
}

impl WeightingParams {
    pub fn validate(&self) -> Result<()> {
        self.junction_resistance.validate()?;
        if !(self.rho_dim.is_finite() && self.rho_dim > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "rho_dim must be positive, got {}",
                self.rho_dim
            )));
        }
        if !(self.cross_section.is_finite() && self.cross_section > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "cross_section must be positive, got {}",
                self.cross_section
            )));
        }
        Ok(())
    }
}

/// Returns a copy of `graph` with `scheme` applied to every edge.
pub fn weight(
    graph: &Graph,
    mask: &VoxelMask,
    scheme: WeightingScheme,
    params: &WeightingParams,
) -> Result<Graph> {
    weight_all(graph, mask, &[scheme], params)
}

/// Applies several schemes in order on one copy of `graph`.
pub fn weight_all(
    graph: &Graph,
    mask: &VoxelMask,
    schemes: &[WeightingScheme],
    params: &WeightingParams,
) -> Result<Graph> {
    params.validate()?;
    if graph.dim() != mask.dim() {
        return Err(Error::InvalidArgument(
            "graph and mask dimensions differ".into(),
        ));
    }

    let mut out = graph.clone();
    for &scheme in schemes {
        let updated: Vec<EdgeWeights> = out
            .edges()
            .par_iter()
            .map(|edge| weigh_edge(edge, mask, scheme, params))
            .collect();
        for (i, weights) in updated.into_iter().enumerate() {
            *out.weights_mut(i) = weights;
        }
        debug!(?scheme, edges = out.edge_count(), "weighted edges");
    }
    Ok(out)
}

fn weigh_edge(edge: &Edge, mask: &VoxelMask, scheme: WeightingScheme, params: &WeightingParams) -> EdgeWeights {
    let mut w = edge.weights.clone();
    match scheme {
        WeightingScheme::Length => {
            w.length = Some(path_length(&edge.points));
        }
        WeightingScheme::Width => fill_width(&mut w, &edge.points, mask),
        WeightingScheme::Area => {
            if w.width_profile.len() != edge.points.len() {
                fill_width(&mut w, &edge.points, mask);
            }
            w.area = Some(trapezoid(&edge.points, &w.width_profile));
        }
        WeightingScheme::FixedWidthConductance => {
            let length = path_length(&edge.points);
            w.length = Some(length);
            w.conductance = Some(fixed_conductance(length, params));
        }
        WeightingScheme::VariableWidthConductance => {
            if w.width_profile.len() != edge.points.len() {
                fill_width(&mut w, &edge.points, mask);
            }
            w.length = Some(path_length(&edge.points));
            w.conductance = Some(variable_conductance(&edge.points, &w.width_profile, params));
        }
    }
    w
}

fn fill_width(w: &mut EdgeWeights, points: &[Voxel], mask: &VoxelMask) {
    let profile = width_profile(points, mask);
    w.width = Some(if profile.is_empty() {
        0.0
    } else {
        profile.iter().sum::<f64>() / profile.len() as f64
    });
    w.width_profile = profile;
}

/// Euclidean arc length of a voxel path.
pub fn path_length(points: &[Voxel]) -> f64 {
    points.windows(2).map(|p| p[0].distance(&p[1])).sum()
}

fn trapezoid(points: &[Voxel], widths: &[f64]) -> f64 {
    points
        .windows(2)
        .zip(widths.windows(2))
        .map(|(p, w)| 0.5 * (w[0] + w[1]) * p[0].distance(&p[1]))
        .sum()
}

fn fixed_conductance(length: f64, params: &WeightingParams) -> f64 {
    let Some(rj) = params.junction_resistance.finite() else {
        return 1.0;
    };
    if length == 0.0 && rj > 0.0 {
        return 1.0 / rj;
    }
    let length = if length == 0.0 { 1.0 } else { length };
    1.0 / (rj + params.rho_dim * length / params.cross_section)
}

fn cross_section(width: f64) -> f64 {
    PI * (width / 2.0).powi(2)
}

fn variable_conductance(points: &[Voxel], widths: &[f64], params: &WeightingParams) -> f64 {
    let Some(rj) = params.junction_resistance.finite() else {
        return 1.0;
    };
    let mut integral: f64 = points
        .windows(2)
        .zip(widths.windows(2))
        .map(|(p, w)| p[0].distance(&p[1]) / cross_section(0.5 * (w[0] + w[1])))
        .sum();
    if integral == 0.0 {
        if rj > 0.0 {
            return 1.0 / rj;
        }
        // one voxel of the first sampled width
        integral = 1.0 / cross_section(widths.first().copied().unwrap_or(1.0));
    }
    1.0 / (rj + params.rho_dim * integral)
}

/// Chord width at every path point.
///
/// Points whose neighbours all coincide with them fall back to the
/// narrowest axis-aligned chord. A point outside the mask counts as one
/// voxel wide.
pub fn width_profile(points: &[Voxel], mask: &VoxelMask) -> Vec<f64> {
    let distinct = points.windows(2).any(|p| p[0] != p[1]);
    (0..points.len())
        .map(|i| {
            let p = points[i];
            if !mask.get(&p) {
                return 1.0;
            }
            let tangent = if distinct { tangent_at(points, i) } else { None };
            match tangent {
                Some(t) => normal_chord(mask, p, t),
                None => axis_chord(mask, p),
            }
        })
        .collect()
}

/// Central difference, falling back to one-sided differences at the ends
/// and skipping repeated points.
fn tangent_at(points: &[Voxel], i: usize) -> Option<Vector3<f64>> {
    let at = |v: Voxel| Vector3::from(v.to_f64());
    let here = at(points[i]);
    let ahead = points[i + 1..].iter().map(|v| at(*v)).find(|v| *v != here);
    let behind = points[..i].iter().rev().map(|v| at(*v)).find(|v| *v != here);
    let t = match (behind, ahead) {
        (Some(b), Some(a)) => a - b,
        (None, Some(a)) => a - here,
        (Some(b), None) => here - b,
        (None, None) => return None,
    };
    let norm = t.norm();
    (norm > 0.0).then(|| t / norm)
}

/// Voxel steps from `p` along `dir` before leaving the mask.
fn reach(mask: &VoxelMask, p: Voxel, dir: Vector3<f64>) -> f64 {
    let origin = Vector3::from(p.to_f64());
    let limit = (mask.shape().x + mask.shape().y + mask.shape().z) as i32;
    let mut steps = 0;
    for s in 1..=limit {
        let q = origin + dir * s as f64;
        if !mask.get(&Voxel::round([q.x, q.y, q.z])) {
            break;
        }
        steps = s;
    }
    steps as f64
}

fn chord(mask: &VoxelMask, p: Voxel, dir: Vector3<f64>) -> f64 {
    reach(mask, p, dir) + reach(mask, p, -dir) + 1.0
}

fn normal_chord(mask: &VoxelMask, p: Voxel, t: Vector3<f64>) -> f64 {
    match mask.dim() {
        Dim::Two => chord(mask, p, Vector3::new(-t.y, t.x, 0.0)),
        Dim::Three => {
            let helper = if t.x.abs() < 0.9 {
                Vector3::x()
            } else {
                Vector3::y()
            };
            let u = t.cross(&helper).normalize();
            let w = t.cross(&u).normalize();
            let diag = std::f64::consts::FRAC_1_SQRT_2;
            [u, w, (u + w) * diag, (u - w) * diag]
                .into_iter()
                .map(|d| chord(mask, p, d))
                .fold(f64::INFINITY, f64::min)
        }
    }
}

fn axis_chord(mask: &VoxelMask, p: Voxel) -> f64 {
    let axes = [Vector3::x(), Vector3::y(), Vector3::z()];
    axes[..mask.dim().axes()]
        .iter()
        .map(|d| chord(mask, p, *d))
        .fold(f64::INFINITY, f64::min)
}
