use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::connect_async;
use tracing::{info, warn};
use url::Url;

use common::{Result, TickBatch};

const STREAM_URL: &str = "wss://fstream.binance.com/ws/!markPrice@arr@1s";

/// Binance futures mark-price stream: one message per second carrying the
/// mark price of every symbol on the exchange.
///
/// Parses each message into a `TickBatch`, updates the shared price cache
/// and publishes on the broadcast channel. Reconnects automatically with
/// exponential backoff.
pub struct MarkPriceStream {
    tick_tx: broadcast::Sender<TickBatch>,
    cache: Arc<RwLock<HashMap<String, f64>>>,
}

impl MarkPriceStream {
    pub fn new(
        tick_tx: broadcast::Sender<TickBatch>,
        cache: Arc<RwLock<HashMap<String, f64>>>,
    ) -> Self {
        Self { tick_tx, cache }
    }

    /// Run the stream loop forever, reconnecting on failure.
    /// Call this inside a `tokio::spawn`.
    pub async fn run(self) {
        let mut backoff = Duration::from_secs(1);
        const MAX_BACKOFF: Duration = Duration::from_secs(60);

        loop {
            info!("Connecting to Binance mark-price stream");
            match self.connect_once().await {
                Ok(()) => {
                    info!("Mark-price stream closed cleanly");
                    // Clean close (e.g. 24h session end) — reconnect shortly
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    backoff = Duration::from_secs(1);
                }
                Err(e) => {
                    warn!(error = %e, backoff = ?backoff, "Stream error, reconnecting");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    async fn connect_once(&self) -> Result<()> {
        let url = Url::parse(STREAM_URL).map_err(|e| common::Error::WebSocket(e.to_string()))?;
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| common::Error::WebSocket(e.to_string()))?;

        let (_, mut read) = ws_stream.split();

        while let Some(msg) = read.next().await {
            let msg = msg.map_err(|e| common::Error::WebSocket(e.to_string()))?;

            if let tokio_tungstenite::tungstenite::Message::Text(text) = msg {
                match parse_mark_price_batch(&text) {
                    Ok(batch) if !batch.is_empty() => {
                        {
                            let mut cache = self.cache.write().await;
                            for (symbol, price) in &batch {
                                cache.insert(symbol.clone(), *price);
                            }
                        }
                        // Ignore send errors (no active receivers)
                        let _ = self.tick_tx.send(batch);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Failed to parse mark-price message"),
                }
            }
        }

        Ok(())
    }
}

// ─── Mark-price JSON parsing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct MarkPriceEntry {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    mark_price: String,
}

fn parse_mark_price_batch(text: &str) -> Result<TickBatch> {
    let entries: Vec<MarkPriceEntry> = serde_json::from_str(text)?;
    let mut batch = TickBatch::with_capacity(entries.len());
    for entry in entries {
        if let Ok(price) = entry.mark_price.parse::<f64>() {
            batch.insert(entry.symbol, price);
        }
    }
    Ok(batch)
}
