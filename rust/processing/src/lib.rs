// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared processing pipeline used by the `fibergt` CLI.
//!
//! [`Pipeline`] chains the binarizer, skeleton extractor, graph builder and
//! edge weighting, then runs the analyses enabled in [`PipelineConfig`] and
//! collects their scalars into a [`NetworkReport`].

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::{AnalysisConfig, BetweennessConfig, PipelineConfig, RandomWalkMode, RuntimeConfig};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineOutput};
pub use report::NetworkReport;
