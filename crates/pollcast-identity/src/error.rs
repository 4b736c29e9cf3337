//! Error types for pollcast-identity.

use thiserror::Error;

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised when parsing a digest received from elsewhere.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Not a hex string.
    #[error("invalid digest hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Hex decoded to the wrong number of bytes.
    #[error("invalid digest length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}
