//! Error types for pollcast-page.

use thiserror::Error;

use crate::NodeId;

/// Result type for page operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when reading or mutating the page tree.
#[derive(Debug, Error)]
pub enum Error {
    /// Id does not name a node of this document.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Operation requires an element but the node is text.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// Attaching the node would create a cycle or a second parent.
    #[error("invalid tree operation: {0}")]
    InvalidTree(String),

    /// Snapshot JSON could not be decoded.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
