// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for graph construction and persistence.

use crate::graph::EdgeAttribute;

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, transforming or persisting graphs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or out-of-domain parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A node id does not exist in the graph.
    #[error("node {node} out of range for graph with {count} nodes")]
    NodeOutOfRange { node: usize, count: usize },

    /// An edge is missing a weight attribute that the caller asked for.
    #[error("edge {edge} has no {attribute} attribute")]
    MissingAttribute { edge: usize, attribute: EdgeAttribute },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem error while reading or writing a record.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
