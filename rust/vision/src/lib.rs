// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # FiberGT Vision
//!
//! From micrographs to weighted network graphs:
//!
//! 1. **Binarize** grayscale slices into a [`VoxelMask`]
//! 2. **Thin** the mask into a one-voxel skeleton and clean it up
//! 3. **Trace** the skeleton (see `fibergt-graph`)
//! 4. **Weight** the edges with lengths, widths, areas or conductances
//!    sampled back from the mask
//!
//! ## Example
//!
//! ```rust,ignore
//! use fibergt_vision::{ImageStack, BinarizerOptions, SkeletonExtractor, ExtractionOptions};
//!
//! let stack = ImageStack::from_directory("sample/", None)?;
//! let mask = stack.binarize(&BinarizerOptions::default())?;
//! let points = SkeletonExtractor::new(ExtractionOptions::default()).extract(&mask)?;
//! let graph = fibergt_graph::build(&points, true);
//! ```

pub mod binarize;
pub mod error;
pub mod extractor;
pub mod mask;
pub mod morphology;
pub mod postprocess;
pub mod stack;
pub mod thinning;
pub mod weighting;

pub use binarize::{binarize, BinarizerOptions, ThreshMethod};
pub use error::{Error, Result};
pub use extractor::{ExtractionOptions, SkeletonExtractor};
pub use mask::VoxelMask;
pub use morphology::StructuringElement;
pub use postprocess::PostProcessing;
pub use stack::ImageStack;
pub use thinning::skeletonize;
pub use weighting::{weight, weight_all, WeightingParams, WeightingScheme};
