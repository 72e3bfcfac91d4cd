// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for mask processing and skeleton extraction.

use thiserror::Error;

/// Result type for vision operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while binarizing, thinning or weighting.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-domain parameters (bad crop, 3D rotation, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No usable input images were found.
    #[error("image directory error: {0}")]
    ImageDirectory(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("options error: {0}")]
    Options(#[from] serde_json::Error),

    #[error("graph error: {0}")]
    Graph(#[from] fibergt_graph::Error),
}
