//! Pollcast Channel
//!
//! The one connection a page session keeps to the tally server.
//!
//! # Contract
//!
//! - At most one logical connection and at most one in-flight connect exist at
//!   any time. Concurrent [`SocketChannel::acquire`] calls during a connect all
//!   receive that connect's result.
//! - An open connection is handed out as is. A closed or failed one is
//!   replaced by a fresh connect, but only when somebody asks for it: there is
//!   no retry loop and no timeout.
//! - The endpoint URI may carry `?topics=<digests>` so the server only pushes
//!   tallies for the questions on this page.
//! - Inbound frames are decoded and forwarded; frames that fail to decode are
//!   dropped with a warning.
//!
//! # Architecture
//!
//! ```text
//! VoteSubmitter ──acquire()──► SocketChannel ──Connector──► WsConnection ──► server
//!                                    ▲                            │
//!                                    └── state, pending connect   │ reader task
//!                                                                 ▼
//!                                      InboundSink ──► Reconciler (via mpsc)
//! ```

mod channel;
mod connector;
mod error;
mod state;
mod ws;

pub use channel::{ChannelConfig, SocketChannel};
pub use connector::{Connection, Connector, InboundSink};
pub use error::{ChannelError, Result};
pub use state::ChannelState;
pub use ws::{WsConnection, WsConnector};
