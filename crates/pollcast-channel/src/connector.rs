//! Seams between the channel and the transport.

use std::sync::Arc;

use futures::future::BoxFuture;
use pollcast_protocol::{decode_inbound, TallyPayload};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;

/// An established connection.
pub trait Connection: Send + Sync {
    /// Send one text frame.
    fn send(&self, text: String) -> BoxFuture<'_, Result<()>>;

    /// Whether the connection can still carry frames.
    fn is_open(&self) -> bool;
}

/// Opens connections. The production implementation is
/// [`WsConnector`](crate::WsConnector); tests substitute their own.
pub trait Connector: Send + Sync + 'static {
    /// Open a connection to `uri`, forwarding inbound frames to `inbound`.
    fn connect(&self, uri: String, inbound: InboundSink)
        -> BoxFuture<'static, Result<Arc<dyn Connection>>>;
}

/// Where decoded inbound payloads go.
#[derive(Debug, Clone)]
pub struct InboundSink {
    tx: mpsc::UnboundedSender<TallyPayload>,
}

impl InboundSink {
    /// Create a sink and the receiver the reconciler drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TallyPayload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Decode a text frame and forward it. Undecodable frames are dropped
    /// with a warning. Returns whether a payload was forwarded.
    pub fn deliver_frame(&self, frame: &str) -> bool {
        match decode_inbound(frame) {
            Ok(payload) => self.deliver(payload),
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                false
            }
        }
    }

    /// Forward an already decoded payload.
    pub fn deliver(&self, payload: TallyPayload) -> bool {
        if self.tx.send(payload).is_err() {
            debug!("Inbound receiver gone, payload discarded");
            return false;
        }
        true
    }
}
