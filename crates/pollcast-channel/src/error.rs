//! Error types for pollcast-channel.

use thiserror::Error;

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Connection failures.
///
/// `Clone` because one connect result is shared by every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Opening the socket failed.
    #[error("connect to {uri} failed: {reason}")]
    Connect { uri: String, reason: String },

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(String),

    /// The connection is no longer open.
    #[error("connection closed")]
    Closed,

    /// Outgoing message could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),
}
