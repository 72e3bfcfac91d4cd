// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dense weighted Laplacian and its Moore-Penrose pseudo-inverse.

use fibergt_graph::Graph;
use nalgebra::{DMatrix, SVD};

use crate::error::{Error, Result};

/// `L = D − A` with parallel edges summed and self-loops ignored.
pub fn weighted_laplacian(graph: &Graph, weights: &[f64]) -> DMatrix<f64> {
    let n = graph.node_count();
    let mut l = DMatrix::zeros(n, n);
    for (edge, &w) in graph.edges().iter().zip(weights) {
        let (a, b) = (edge.source, edge.target);
        if a == b {
            continue;
        }
        l[(a, a)] += w;
        l[(b, b)] += w;
        l[(a, b)] -= w;
        l[(b, a)] -= w;
    }
    l
}

/// Symmetric weighted adjacency with parallel edges summed and self-loops
/// ignored.
pub fn weighted_adjacency(graph: &Graph, weights: &[f64]) -> DMatrix<f64> {
    let n = graph.node_count();
    let mut a = DMatrix::zeros(n, n);
    for (edge, &w) in graph.edges().iter().zip(weights) {
        if edge.is_loop() {
            continue;
        }
        a[(edge.source, edge.target)] += w;
        a[(edge.target, edge.source)] += w;
    }
    a
}

/// Pseudo-inverse through SVD, discarding singular values below
/// `n · ε · σ_max`.
pub fn pseudo_inverse(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = matrix.nrows();
    if n == 0 {
        return Ok(DMatrix::zeros(0, 0));
    }
    let svd = SVD::try_new(matrix.clone(), true, true, f64::EPSILON, 0)
        .ok_or_else(|| Error::NumericalInstability("SVD did not converge".into()))?;
    let sigma_max = svd.singular_values.max();
    let cutoff = n as f64 * f64::EPSILON * sigma_max;
    let pinv = svd
        .pseudo_inverse(cutoff)
        .map_err(|e| Error::NumericalInstability(e.to_string()))?;
    if pinv.iter().any(|v| !v.is_finite()) {
        return Err(Error::NumericalInstability(
            "pseudo-inverse has non-finite entries".into(),
        ));
    }
    Ok(pinv)
}
