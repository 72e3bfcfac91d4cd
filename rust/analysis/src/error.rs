// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for network analysis.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Ghost terminal attached to a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Source,
    Sink,
}

impl std::fmt::Display for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminal::Source => f.write_str("source"),
            Terminal::Sink => f.write_str("sink"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No node falls inside the boundary interval of this terminal.
    #[error("no nodes lie inside the {terminal} boundary")]
    DisconnectedBoundary { terminal: Terminal },

    #[error("network has {components} connected components; the solver needs one")]
    DisconnectedNetwork { components: usize },

    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    #[error("graph error: {0}")]
    Graph(#[from] fibergt_graph::Error),
}
