//! WebSocket transport on tokio-tungstenite.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::connector::{Connection, Connector, InboundSink};
use crate::error::{ChannelError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens real WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn connect(
        &self,
        uri: String,
        inbound: InboundSink,
    ) -> BoxFuture<'static, Result<Arc<dyn Connection>>> {
        async move {
            let (stream, _) = connect_async(uri.as_str())
                .await
                .map_err(|e| ChannelError::Connect {
                    uri: uri.clone(),
                    reason: e.to_string(),
                })?;

            let (write, read) = stream.split();
            let conn = Arc::new(WsConnection {
                sink: Mutex::new(write),
                open: AtomicBool::new(true),
            });

            tokio::spawn(read_loop(read, Arc::clone(&conn), inbound));

            Ok(conn as Arc<dyn Connection>)
        }
        .boxed()
    }
}

/// An open WebSocket. Reads happen on a background task; writes are
/// serialized through the sink mutex.
pub struct WsConnection {
    sink: Mutex<SplitSink<WsStream, Message>>,
    open: AtomicBool,
}

impl WsConnection {
    fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl Connection for WsConnection {
    fn send(&self, text: String) -> BoxFuture<'_, Result<()>> {
        async move {
            if !self.is_open() {
                return Err(ChannelError::Closed);
            }
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Message::Text(text.into())).await {
                self.mark_closed();
                return Err(ChannelError::Send(e.to_string()));
            }
            Ok(())
        }
        .boxed()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Forward text frames until the server closes or the socket errors.
///
/// Pings are answered by tungstenite itself on the next read or write.
async fn read_loop(mut read: SplitStream<WsStream>, conn: Arc<WsConnection>, inbound: InboundSink) {
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                inbound.deliver_frame(text.as_str());
            }
            Ok(Message::Close(_)) => {
                info!("Server closed the connection");
                break;
            }
            Ok(other) => {
                debug!("Ignoring non-text frame ({} bytes)", other.len());
            }
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        }
    }
    conn.mark_closed();
}
