// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image stack → skeleton → weighted graph → report.
//!
//! Stages run one after another; the analyses of the finished graph are
//! independent and run concurrently on the rayon pool.

use std::path::Path;
use std::time::Instant;

use fibergt_analysis::{
    average_nodal_connectivity, boundary_edge_betweenness, nematic_order,
    nonlinear_random_walk_betweenness, random_walk_betweenness, vertex_boundary_betweenness,
    ResistiveSolver, Terminal,
};
use fibergt_graph::{EdgeAttribute, Graph, GraphBuilder, SkeletonPointSet};
use fibergt_vision::{weight_all, ImageStack, SkeletonExtractor, VoxelMask};

use crate::config::{PipelineConfig, RandomWalkMode};
use crate::error::Result;
use crate::report::{summarize, NetworkReport, Section};

fn millis(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Products of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub points: SkeletonPointSet,
    /// Weighted graph the report was computed on.
    pub graph: Graph,
    pub report: NetworkReport,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads and binarizes the slices of `dir` within the configured depth.
    pub fn load_mask(&self, dir: impl AsRef<Path>) -> Result<VoxelMask> {
        let stack = ImageStack::from_directory(dir, self.config.extraction.depth)?;
        Ok(stack.binarize(&self.config.binarizer)?)
    }

    pub fn extract(&self, mask: &VoxelMask) -> Result<SkeletonPointSet> {
        Ok(SkeletonExtractor::new(self.config.extraction.clone()).extract(mask)?)
    }

    /// Traces `points` and applies the configured weighting schemes.
    ///
    /// `mask` is the full mask `points` were extracted from; widths are
    /// sampled from the same cropped region the skeleton lives in.
    pub fn build_graph(&self, points: &SkeletonPointSet, mask: &VoxelMask) -> Result<Graph> {
        let graph = GraphBuilder::new(self.config.reduce_to_largest_component).build(points);
        let region = SkeletonExtractor::new(self.config.extraction.clone()).region(mask)?;
        Ok(weight_all(
            &graph,
            &region,
            &self.config.weighting,
            &self.config.params,
        )?)
    }

    pub fn run_directory(&self, dir: impl AsRef<Path>) -> Result<PipelineOutput> {
        let load_start = Instant::now();
        let mask = self.load_mask(dir)?;
        let load_time = millis(load_start);
        tracing::info!(
            voxels = mask.count(),
            load_time_ms = load_time,
            "Mask loaded"
        );
        let mut output = self.run_mask(&mask)?;
        output.report.timings_ms.insert("load".into(), load_time);
        Ok(output)
    }

    pub fn run_mask(&self, mask: &VoxelMask) -> Result<PipelineOutput> {
        let total_start = Instant::now();

        let extract_start = Instant::now();
        let points = self.extract(mask)?;
        let extract_time = millis(extract_start);
        tracing::info!(
            points = points.len(),
            extract_time_ms = extract_time,
            "Skeleton extracted"
        );

        let build_start = Instant::now();
        let graph = self.build_graph(&points, mask)?;
        let build_time = millis(build_start);
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            build_time_ms = build_time,
            "Graph built and weighted"
        );

        let mut report = self.analyze(&graph)?;
        report.timings_ms.insert("extract".into(), extract_time);
        report.timings_ms.insert("build".into(), build_time);
        report.timings_ms.insert("total".into(), millis(total_start));

        Ok(PipelineOutput {
            points,
            graph,
            report,
        })
    }

    /// Runs every enabled analysis on `graph`.
    pub fn analyze(&self, graph: &Graph) -> Result<NetworkReport> {
        let start = Instant::now();
        let ((structural, geometric), (electronic, betweenness)) = rayon::join(
            || {
                rayon::join(
                    || self.structural(graph),
                    || self.geometric(graph),
                )
            },
            || {
                rayon::join(
                    || self.electronic(graph),
                    || self.betweenness(graph),
                )
            },
        );

        let mut report = NetworkReport {
            structural,
            geometric,
            electronic: electronic?,
            betweenness: betweenness?,
            ..Default::default()
        };
        let analysis_time = millis(start);
        report.timings_ms.insert("analysis".into(), analysis_time);
        tracing::info!(analysis_time_ms = analysis_time, "Analyses complete");
        Ok(report)
    }

    fn structural(&self, graph: &Graph) -> Section {
        if self.config.analyses.structural {
            graph.structural_report()
        } else {
            Section::new()
        }
    }

    /// Orientation order, connectivity and per-attribute edge summaries.
    fn geometric(&self, graph: &Graph) -> Section {
        let analyses = &self.config.analyses;
        let mut section = Section::new();
        if analyses.nematic && graph.edge_count() > 0 {
            section.insert(
                "nematic_order".into(),
                nematic_order(graph).order_parameter,
            );
        }
        if analyses.nodal_connectivity {
            if let Some(k) = average_nodal_connectivity(graph) {
                section.insert("average_nodal_connectivity".into(), k);
            }
        }
        for attribute in [
            EdgeAttribute::Length,
            EdgeAttribute::Width,
            EdgeAttribute::Area,
            EdgeAttribute::Conductance,
        ] {
            let values: Vec<f64> = graph
                .edges()
                .iter()
                .filter_map(|e| e.weights.get(attribute))
                .collect();
            summarize(&mut section, &attribute.to_string(), &values);
        }
        section
    }

    fn electronic(&self, graph: &Graph) -> Result<Section> {
        let mut section = Section::new();
        let Some(bc) = &self.config.analyses.electronic else {
            return Ok(section);
        };
        let solution =
            ResistiveSolver::new(self.config.params.junction_resistance).solve(graph, bc)?;
        let r = solution.effective_resistance;
        section.insert("effective_resistance".into(), r);
        if r > 0.0 {
            section.insert("effective_conductance".into(), 1.0 / r);
        }
        section.insert(
            "source_terminals".into(),
            solution.graph.degree(solution.source) as f64,
        );
        section.insert(
            "sink_terminals".into(),
            solution.graph.degree(solution.sink) as f64,
        );
        let currents: Vec<f64> = solution.edge_currents[..graph.edge_count()]
            .iter()
            .map(|c| c.abs())
            .collect();
        summarize(&mut section, "edge_current", &currents);
        Ok(section)
    }

    fn betweenness(&self, graph: &Graph) -> Result<Section> {
        let mut section = Section::new();
        let Some(cfg) = &self.config.analyses.betweenness else {
            return Ok(section);
        };
        cfg.boundary.validate(graph)?;
        let (sources, targets) = cfg.boundary.terminals(graph);
        if sources.is_empty() {
            return Err(fibergt_analysis::Error::DisconnectedBoundary {
                terminal: Terminal::Source,
            }
            .into());
        }
        if targets.is_empty() {
            return Err(fibergt_analysis::Error::DisconnectedBoundary {
                terminal: Terminal::Sink,
            }
            .into());
        }
        section.insert("sources".into(), sources.len() as f64);
        section.insert("targets".into(), targets.len() as f64);

        let edges = boundary_edge_betweenness(graph, &sources, &targets, cfg.weight)?;
        summarize(&mut section, "edge", &edges);
        let vertices = vertex_boundary_betweenness(graph, &sources, &targets, cfg.weight)?;
        summarize(&mut section, "vertex", &vertices);

        if let Some(mode) = cfg.random_walk {
            let flows = match mode {
                RandomWalkMode::Linear => {
                    random_walk_betweenness(graph, &sources, &targets, cfg.weight)?
                }
                RandomWalkMode::Nonlinear => {
                    nonlinear_random_walk_betweenness(graph, &sources, &targets, None, cfg.weight)?
                }
            };
            summarize(&mut section, "random_walk_edge", &flows.edges);
            summarize(&mut section, "random_walk_ghost", &flows.ghost_flows);
        }
        Ok(section)
    }
}
