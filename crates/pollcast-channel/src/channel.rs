//! The session's socket channel.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use pollcast_identity::ContentDigest;
use pollcast_protocol::{encode, OutgoingVote};
use tracing::{debug, info, warn};

use crate::connector::{Connection, Connector, InboundSink};
use crate::error::{ChannelError, Result};
use crate::state::ChannelState;

type ConnectFuture = Shared<BoxFuture<'static, Result<Arc<dyn Connection>>>>;

/// Channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Base endpoint, e.g. `wss://tally.example.org/`.
    pub endpoint: String,

    /// Whether to declare displayed questions as topics when connecting.
    pub topic_scoping: bool,
}

impl ChannelConfig {
    /// Config for `endpoint` with topic scoping on.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            topic_scoping: true,
        }
    }

    /// Enable or disable topic scoping.
    #[must_use]
    pub fn with_topic_scoping(mut self, enabled: bool) -> Self {
        self.topic_scoping = enabled;
        self
    }

    /// URI for a connect attempt declaring `topics`.
    pub fn endpoint_uri(&self, topics: &[ContentDigest]) -> String {
        if !self.topic_scoping || topics.is_empty() {
            return self.endpoint.clone();
        }
        let sep = if self.endpoint.contains('?') { '&' } else { '?' };
        let joined = topics
            .iter()
            .map(ContentDigest::to_hex)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}{}topics={}", self.endpoint, sep, joined)
    }
}

/// Mutable connection bookkeeping. Only ever locked briefly, never across an
/// await.
#[derive(Default)]
struct Slot {
    state: ChannelState,
    connection: Option<Arc<dyn Connection>>,
    pending: Option<ConnectFuture>,
    topics: Vec<ContentDigest>,
    attempts: u64,
}

/// The page session's single connection to the tally server.
///
/// Constructed once per session and shared (`Arc`) with everything that
/// sends or needs the connection state.
pub struct SocketChannel {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    inbound: InboundSink,
    slot: Arc<Mutex<Slot>>,
}

impl SocketChannel {
    /// Create a channel. Nothing connects until the first [`acquire`](Self::acquire).
    pub fn new(config: ChannelConfig, connector: Arc<dyn Connector>, inbound: InboundSink) -> Self {
        Self {
            config,
            connector,
            inbound,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
        slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Declare the questions currently displayed. Used by the next connect.
    pub fn set_topics(&self, topics: Vec<ContentDigest>) {
        Self::lock(&self.slot).topics = topics;
    }

    /// Current lifecycle state. An open connection that has since closed
    /// reads as `Disconnected`.
    pub fn state(&self) -> ChannelState {
        let slot = Self::lock(&self.slot);
        match (&slot.state, &slot.connection) {
            (ChannelState::Open, Some(conn)) if !conn.is_open() => ChannelState::Disconnected,
            (state, _) => *state,
        }
    }

    /// Number of connect attempts started so far.
    pub fn connect_attempts(&self) -> u64 {
        Self::lock(&self.slot).attempts
    }

    /// Get the open connection, joining or starting a connect as needed.
    pub async fn acquire(&self) -> Result<Arc<dyn Connection>> {
        let pending = {
            let mut slot = Self::lock(&self.slot);
            if let Some(pending) = slot.pending.clone() {
                debug!("Joining in-flight connect");
                pending
            } else {
                if let Some(conn) = slot.connection.as_ref().filter(|c| c.is_open()) {
                    return Ok(Arc::clone(conn));
                }
                self.start_connect(&mut slot)
            }
        };
        pending.await
    }

    /// Encode and send a vote on the current connection.
    pub async fn send(&self, vote: &OutgoingVote) -> Result<()> {
        let frame = encode(vote).map_err(|e| ChannelError::Encode(e.to_string()))?;
        let conn = self.acquire().await?;
        conn.send(frame).await
    }

    fn start_connect(&self, slot: &mut Slot) -> ConnectFuture {
        slot.attempts += 1;
        slot.state = ChannelState::Connecting;
        slot.connection = None;

        let uri = self.config.endpoint_uri(&slot.topics);
        info!("Connecting to {} (attempt {})", uri, slot.attempts);

        let connect = self.connector.connect(uri.clone(), self.inbound.clone());
        let shared_slot = Arc::clone(&self.slot);
        let fut = async move {
            let result = connect.await;
            let mut slot = Self::lock(&shared_slot);
            slot.pending = None;
            match &result {
                Ok(conn) => {
                    info!("Connected to {}", uri);
                    slot.state = ChannelState::Open;
                    slot.connection = Some(Arc::clone(conn));
                }
                Err(e) => {
                    warn!("Connection failed: {}", e);
                    slot.state = ChannelState::Failed;
                    slot.connection = None;
                }
            }
            result
        }
        .boxed()
        .shared();

        slot.pending = Some(fut.clone());
        fut
    }
}
