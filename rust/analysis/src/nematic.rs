// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nematic order parameter of edge orientations.
//!
//! Each edge contributes the unit vector between its path ends. The order
//! tensor is `Q = (3/2)⟨u⊗u⟩ − ½I` in 3D and `Q = 2⟨u⊗u⟩ − I` in 2D; the
//! order parameter `S` is its largest eigenvalue (1 for perfect alignment,
//! 0 for an isotropic network) and the director is the matching
//! eigenvector.

use fibergt_graph::{Dim, Graph};
use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NematicOrder {
    /// Largest eigenvalue of the order tensor.
    pub order_parameter: f64,
    /// Unit eigenvector of `order_parameter`; sign is arbitrary.
    pub director: [f64; 3],
    /// Unit orientation per edge; zero for edges whose ends coincide.
    pub orientations: Vec<[f64; 3]>,
}

/// Unit vector from the last path point to the first, or zero.
fn orientation(points: &[fibergt_graph::Voxel]) -> [f64; 3] {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return [0.0; 3];
    };
    let (a, b) = (first.to_f64(), last.to_f64());
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    let norm = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
    if norm == 0.0 {
        [0.0; 3]
    } else {
        [d[0] / norm, d[1] / norm, d[2] / norm]
    }
}

pub fn nematic_order(graph: &Graph) -> NematicOrder {
    let dim = graph.dim().axes();
    let orientations: Vec<[f64; 3]> = graph.edges().iter().map(|e| orientation(&e.points)).collect();

    let mut mean = DMatrix::<f64>::zeros(dim, dim);
    let mut counted = 0usize;
    for u in orientations.iter().filter(|u| u.iter().any(|c| *c != 0.0)) {
        for i in 0..dim {
            for j in 0..dim {
                mean[(i, j)] += u[i] * u[j];
            }
        }
        counted += 1;
    }
    if counted == 0 {
        return NematicOrder {
            order_parameter: 0.0,
            director: [0.0; 3],
            orientations,
        };
    }
    mean /= counted as f64;

    let identity = DMatrix::<f64>::identity(dim, dim);
    let q = match graph.dim() {
        Dim::Two => mean * 2.0 - identity,
        Dim::Three => mean * 1.5 - identity * 0.5,
    };

    let eigen = SymmetricEigen::new(q);
    let (best, order_parameter) = eigen
        .eigenvalues
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });
    let column = eigen.eigenvectors.column(best);
    let mut director = [0.0; 3];
    for (k, v) in column.iter().enumerate() {
        director[k] = *v;
    }

    NematicOrder {
        order_parameter,
        director,
        orientations,
    }
}
