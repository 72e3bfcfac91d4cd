// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key→scalar property report.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub type Section = BTreeMap<String, f64>;

/// Scalar properties of one network, grouped by analysis. Sections for
/// analyses that did not run are empty and left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkReport {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub structural: Section,
    /// Nematic order, path lengths and widths, nodal connectivity.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub geometric: Section,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub electronic: Section,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub betweenness: Section,
    /// Wall time per stage in milliseconds.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub timings_ms: Section,
}

impl NetworkReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Every entry as `section.key`, for flat tabular output.
    pub fn flatten(&self) -> BTreeMap<String, f64> {
        let sections = [
            ("structural", &self.structural),
            ("geometric", &self.geometric),
            ("electronic", &self.electronic),
            ("betweenness", &self.betweenness),
            ("timings_ms", &self.timings_ms),
        ];
        sections
            .into_iter()
            .flat_map(|(name, section)| {
                section
                    .iter()
                    .map(move |(key, value)| (format!("{name}.{key}"), *value))
            })
            .collect()
    }
}

/// `mean`, `max` and `sum` of `values` under `prefix`; nothing for an
/// empty slice.
pub(crate) fn summarize(section: &mut Section, prefix: &str, values: &[f64]) {
    if values.is_empty() {
        return;
    }
    let sum: f64 = values.iter().sum();
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    section.insert(format!("{prefix}_mean"), sum / values.len() as f64);
    section.insert(format!("{prefix}_max"), max);
    section.insert(format!("{prefix}_sum"), sum);
}
