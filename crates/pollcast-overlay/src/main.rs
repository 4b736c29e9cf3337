//! Pollcast binary
//!
//! Runs the overlay against a page snapshot captured by a host bridge. Page
//! events arrive on stdin, one JSON object per line.

use std::sync::Arc;

use pollcast_channel::WsConnector;
use pollcast_overlay::{Overlay, OverlayConfig};
use pollcast_page::{Document, PageEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollcast=info,pollcast_overlay=info,pollcast_channel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: pollcast <page-snapshot.json>");
        std::process::exit(2);
    };

    let config = OverlayConfig::from_env()?;
    tracing::info!("Starting pollcast against {} ({})", config.endpoint, config.variant);

    let page = Document::from_json(&tokio::fs::read_to_string(&path).await?)?;
    let overlay = Overlay::new(config, page, Arc::new(WsConnector::new()));
    let report = overlay.initialize().await?;
    tracing::info!("Page ready: {:?}", report);

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match serde_json::from_str::<PageEvent>(&line) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Ignoring event line: {}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        result = overlay.run(rx) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
