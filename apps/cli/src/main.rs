// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! fibergt - graph extraction and analysis of imaged filamentary networks.
//!
//! # Commands
//!
//! - `binarize <image>` - apply `img_options.json` to one image, write the mask
//! - `extract <dir>` - thin a slice directory into a skeleton record
//! - `analyze <dir>` - full pipeline, writes the property report
//!
//! Logging follows `RUST_LOG` (default `info,fibergt=debug`). Worker threads
//! and the default output directory come from `FIBERGT_THREADS` and
//! `FIBERGT_OUTPUT_DIR`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fibergt_graph::{EdgeAttribute, SkeletonFrame};
use fibergt_processing::{Pipeline, PipelineConfig, RuntimeConfig};
use fibergt_vision::{binarize, BinarizerOptions, SkeletonExtractor};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fibergt", version, about = "Network graphs from images of filamentary materials")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Binarize a single grayscale image
    Binarize {
        /// Input image (png, jpg or tiff)
        image: PathBuf,
        /// Binarizer options (defaults when omitted)
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,
        #[arg(long, value_name = "FILE", default_value = "mask.png")]
        out: PathBuf,
    },
    /// Extract the skeleton of a slice directory
    Extract {
        /// Directory holding slice images
        dir: PathBuf,
        /// Pipeline configuration (defaults when omitted)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[arg(long, value_name = "FILE", default_value = "skeleton.json")]
        out: PathBuf,
    },
    /// Run the full pipeline and write the property report
    Analyze {
        /// Directory holding slice images
        dir: PathBuf,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[arg(long, value_name = "FILE", default_value = "report.json")]
        out: PathBuf,
        /// Also write the weighted graph as a full JSON snapshot
        #[arg(long, value_name = "FILE")]
        graph: Option<PathBuf>,
        /// Also write the graph as a particle record, weighted by this
        /// attribute when given
        #[arg(long, value_name = "FILE")]
        frame: Option<PathBuf>,
        #[arg(long, value_enum, requires = "frame")]
        frame_weight: Option<FrameWeight>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FrameWeight {
    Length,
    Width,
    Area,
    Conductance,
}

impl From<FrameWeight> for EdgeAttribute {
    fn from(w: FrameWeight) -> Self {
        match w {
            FrameWeight::Length => EdgeAttribute::Length,
            FrameWeight::Width => EdgeAttribute::Width,
            FrameWeight::Area => EdgeAttribute::Area,
            FrameWeight::Conductance => EdgeAttribute::Conductance,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fibergt=debug")),
        )
        .init();

    let cli = Cli::parse();
    let runtime = RuntimeConfig::from_env();
    runtime
        .install_thread_pool()
        .context("failed to initialize the worker pool")?;
    tracing::info!(
        threads = runtime.threads,
        output_dir = %runtime.output_dir.display(),
        "Starting fibergt"
    );

    run(cli.command, &runtime)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_path(p)
            .with_context(|| format!("invalid configuration {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn run(command: Command, runtime: &RuntimeConfig) -> Result<()> {
    let start = Instant::now();
    match command {
        Command::Binarize {
            image,
            options,
            out,
        } => {
            let options = match options {
                Some(p) => BinarizerOptions::from_path(&p)
                    .with_context(|| format!("invalid binarizer options {}", p.display()))?,
                None => BinarizerOptions::default(),
            };
            let gray = image::open(&image)
                .with_context(|| format!("cannot open {}", image.display()))?
                .to_luma8();
            let mask = binarize(&gray, &options)?;
            let out = runtime.output_path(out);
            mask.to_gray()?
                .save(&out)
                .with_context(|| format!("cannot write {}", out.display()))?;
            tracing::info!(foreground = mask.count(), out = %out.display(), "Mask written");
        }
        Command::Extract { dir, config, out } => {
            let pipeline = Pipeline::new(load_config(config.as_deref())?)?;
            let mask = pipeline.load_mask(&dir)?;
            let out = runtime.output_path(out);
            let points = SkeletonExtractor::new(pipeline.config().extraction.clone())
                .extract_to_file(&mask, &out)?;
            tracing::info!(points = points.len(), out = %out.display(), "Skeleton written");
        }
        Command::Analyze {
            dir,
            config,
            out,
            graph,
            frame,
            frame_weight,
        } => {
            let pipeline = Pipeline::new(load_config(config.as_deref())?)?;
            let output = pipeline.run_directory(&dir)?;

            let out = runtime.output_path(out);
            output.report.write(&out)?;
            if let Some(path) = graph {
                let path = runtime.output_path(path);
                std::fs::write(&path, output.graph.to_json()?)
                    .with_context(|| format!("cannot write {}", path.display()))?;
            }
            if let Some(path) = frame {
                let path = runtime.output_path(path);
                SkeletonFrame::from_graph(
                    &output.graph,
                    output.points.shape(),
                    frame_weight.map(EdgeAttribute::from),
                )?
                .write(&path)?;
            }
            tracing::info!(
                nodes = output.graph.node_count(),
                edges = output.graph.edge_count(),
                out = %out.display(),
                "Report written"
            );
        }
    }
    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_accepts_outputs() {
        let cli = Cli::try_parse_from([
            "fibergt", "analyze", "data/", "--out", "r.json", "--frame", "f.json",
            "--frame-weight", "conductance",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze {
                frame_weight, out, ..
            } => {
                assert!(matches!(frame_weight, Some(FrameWeight::Conductance)));
                assert_eq!(out, PathBuf::from("r.json"));
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn frame_weight_needs_frame() {
        assert!(Cli::try_parse_from(["fibergt", "analyze", "d", "--frame-weight", "length"]).is_err());
    }
}
