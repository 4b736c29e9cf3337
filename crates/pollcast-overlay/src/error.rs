//! Error types for the overlay.

use pollcast_channel::ChannelError;
use thiserror::Error;

/// Result type for overlay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while indexing, reconciling, or voting.
///
/// None of these is fatal to the page: each is caught at the smallest unit it
/// concerns (question block, answer, payload entry, submission) and logged.
#[derive(Debug, Error)]
pub enum Error {
    /// The page does not have the expected number of some element.
    #[error("structural mismatch: expected {expected} {what}, found {found}")]
    StructuralMismatch {
        what: &'static str,
        expected: &'static str,
        found: usize,
    },

    /// Nothing on the page matches.
    #[error("not found: {0}")]
    NotFound(String),

    /// An inbound payload entry has an invalid shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Connect or send failed.
    #[error("channel failure: {0}")]
    Channel(#[from] ChannelError),

    /// A selection control that is neither radio nor checkbox.
    #[error("unsupported input type: {0}")]
    UnsupportedInput(String),

    /// Page tree operation failed.
    #[error("page error: {0}")]
    Page(#[from] pollcast_page::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn mismatch(what: &'static str, expected: &'static str, found: usize) -> Self {
        Error::StructuralMismatch {
            what,
            expected,
            found,
        }
    }
}

impl From<pollcast_protocol::Error> for Error {
    fn from(e: pollcast_protocol::Error) -> Self {
        Error::MalformedPayload(e.to_string())
    }
}
