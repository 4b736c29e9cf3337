//! Pollcast Overlay
//!
//! Shows, next to every answer of a quiz page, how many other viewers picked
//! it, and reports this viewer's picks back to the tally server.
//!
//! # Architecture
//!
//! - **Index**: finds question blocks and answer entries, derives their
//!   content digests, owns one tally counter per answer
//! - **Reconcile**: merges inbound tally payloads into the counters
//! - **Display**: renders counters into indicator spans and re-renders on change
//! - **Submit**: sends the full current selection whenever an input changes
//! - **Session**: wires the above to a page and a [`pollcast_channel::SocketChannel`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pollcast_channel::WsConnector;
//! use pollcast_overlay::{Overlay, OverlayConfig};
//! use pollcast_page::Document;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OverlayConfig::from_env()?;
//!     let page = Document::from_json(&std::fs::read_to_string("page.json")?)?;
//!     let overlay = Overlay::new(config, page, Arc::new(WsConnector::new()));
//!     overlay.initialize().await?;
//!     let (_events, rx) = tokio::sync::mpsc::channel(64);
//!     overlay.run(rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod index;
pub mod reconcile;
pub mod session;
pub mod submit;

pub use config::{HostContract, OverlayConfig};
pub use display::{Affordance, ReactiveDisplay};
pub use error::{Error, Result};
pub use index::{AnswerItem, AnswerLookup, DomIndex, InputControl, InputKind, QuestionItem, SharedDocument};
pub use reconcile::{ReconcileReport, Reconciler};
pub use session::{EventOutcome, InitReport, Overlay};
pub use submit::VoteSubmitter;
