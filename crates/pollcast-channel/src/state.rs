//! Channel lifecycle state.

/// Where the channel's single connection stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No connection yet, or the last one was closed.
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The connection is usable.
    Open,
    /// The last connect attempt failed. The next `acquire()` retries.
    Failed,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Disconnected => write!(f, "disconnected"),
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Failed => write!(f, "failed"),
        }
    }
}
