// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration (JSON file) and runtime settings (environment).

use std::path::{Path, PathBuf};

use fibergt_analysis::BoundaryCondition;
use fibergt_graph::EdgeAttribute;
use fibergt_vision::{BinarizerOptions, ExtractionOptions, WeightingParams, WeightingScheme};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Everything the pipeline needs to turn an image stack into a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub binarizer: BinarizerOptions,
    /// Crop, rotation, slice range and skeleton clean-up.
    pub extraction: ExtractionOptions,
    /// Keep only the component with the most nodes after tracing.
    pub reduce_to_largest_component: bool,
    /// Weighting schemes, applied in order.
    pub weighting: Vec<WeightingScheme>,
    pub params: WeightingParams,
    pub analyses: AnalysisConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            binarizer: BinarizerOptions::default(),
            extraction: ExtractionOptions::default(),
            reduce_to_largest_component: true,
            weighting: vec![WeightingScheme::Length],
            params: WeightingParams::default(),
            analyses: AnalysisConfig::default(),
        }
    }
}

/// Which analyses run on the weighted graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Degree, clustering, distances and centrality aggregates.
    pub structural: bool,
    /// Effective resistance between the two boundaries.
    pub electronic: Option<BoundaryCondition>,
    pub betweenness: Option<BetweennessConfig>,
    pub nematic: bool,
    /// Quadratic in the node count times a max-flow per pair.
    pub nodal_connectivity: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            structural: true,
            electronic: None,
            betweenness: None,
            nematic: true,
            nodal_connectivity: false,
        }
    }
}

/// Boundary betweenness between the nodes of two slabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BetweennessConfig {
    /// `boundary_1` selects the sources and `boundary_2` the targets.
    pub boundary: BoundaryCondition,
    #[serde(default)]
    pub weight: Option<EdgeAttribute>,
    #[serde(default)]
    pub random_walk: Option<RandomWalkMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomWalkMode {
    /// Sum over every source/target pair.
    Linear,
    /// One unit of current per source, absorbed at the targets.
    Nonlinear,
}

fn produces(scheme: WeightingScheme, attribute: EdgeAttribute) -> bool {
    use WeightingScheme as S;
    match attribute {
        EdgeAttribute::Length => matches!(
            scheme,
            S::Length | S::FixedWidthConductance | S::VariableWidthConductance
        ),
        EdgeAttribute::Width => matches!(scheme, S::Width | S::Area | S::VariableWidthConductance),
        EdgeAttribute::Area => scheme == S::Area,
        EdgeAttribute::Conductance => {
            matches!(scheme, S::FixedWidthConductance | S::VariableWidthConductance)
        }
    }
}

/// Schemes that read widths back from the mask.
fn samples_mask(scheme: WeightingScheme) -> bool {
    matches!(
        scheme,
        WeightingScheme::Width | WeightingScheme::Area | WeightingScheme::VariableWidthConductance
    )
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Whether one of the configured schemes fills `attribute`.
    pub fn provides(&self, attribute: EdgeAttribute) -> bool {
        self.weighting.iter().any(|&s| produces(s, attribute))
    }

    /// Checks option ranges and that every analysis has the edge weights it
    /// reads.
    pub fn validate(&self) -> Result<()> {
        self.binarizer.validate()?;
        self.params.validate()?;

        if self.analyses.electronic.is_some()
            && !self.params.junction_resistance.is_infinite()
            && !self.provides(EdgeAttribute::Conductance)
        {
            return Err(Error::Config(
                "electronic analysis with a finite junction resistance needs a conductance weighting scheme"
                    .into(),
            ));
        }
        if self.extraction.rotate.is_some() {
            if let Some(scheme) = self.weighting.iter().find(|&&s| samples_mask(s)) {
                return Err(Error::Config(format!(
                    "{scheme:?} samples the mask, which is not aligned with a rotated graph"
                )));
            }
        }
        if let Some(attribute) = self.analyses.betweenness.as_ref().and_then(|b| b.weight) {
            if !self.provides(attribute) {
                return Err(Error::Config(format!(
                    "betweenness is weighted by {attribute} but no weighting scheme computes it"
                )));
            }
        }
        Ok(())
    }
}

/// Process-level settings read from the environment.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Worker threads for the rayon pool.
    pub threads: usize,
    /// Where the CLI writes outputs given as bare file names.
    pub output_dir: PathBuf,
}

impl RuntimeConfig {
    /// Reads `FIBERGT_THREADS` and `FIBERGT_OUTPUT_DIR`.
    pub fn from_env() -> Self {
        Self {
            threads: std::env::var("FIBERGT_THREADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or_else(num_cpus::get),
            output_dir: std::env::var("FIBERGT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Sizes the global rayon pool. Fails if the pool already exists.
    pub fn install_thread_pool(&self) -> Result<()> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build_global()?;
        Ok(())
    }

    /// `name` relative to `output_dir` unless it already has a directory.
    pub fn output_path(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if name.is_absolute() || name.parent().is_some_and(|p| !p.as_os_str().is_empty()) {
            name.to_path_buf()
        } else {
            self.output_dir.join(name)
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
