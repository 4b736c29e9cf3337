//! Error types for pollcast-protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum Error {
    /// Tally data has the wrong shape for the protocol variant.
    #[error("malformed tally {value:?}: {reason}")]
    MalformedTally { value: String, reason: String },

    /// A digest key is not a valid digest.
    #[error("invalid digest: {0}")]
    InvalidDigest(#[from] pollcast_identity::Error),

    /// Unknown protocol variant name.
    #[error("unknown protocol variant: {0}")]
    UnknownVariant(String),

    /// Frame is not valid JSON of the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedTally {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
