// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline error type wrapping the library crates.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Inconsistent or unreadable pipeline configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Vision(#[from] fibergt_vision::Error),

    #[error(transparent)]
    Graph(#[from] fibergt_graph::Error),

    #[error(transparent)]
    Analysis(#[from] fibergt_analysis::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
