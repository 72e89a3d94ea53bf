use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{Candle, KlineInterval, Result, TickBatch};

/// Abstraction over the market-data source.
///
/// `BinanceFeed` in `crates/engine` implements this against the futures
/// mark-price stream and klines REST endpoint. Tests use in-memory fakes.
/// The core must keep working (with degraded freshness) when the live
/// stream is down and only the polling methods answer.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Latest mark price for a symbol, if known.
    async fn mark_price(&self, symbol: &str) -> Result<f64>;

    /// Fetch up to `limit` most recent candles, oldest first.
    async fn ohlc(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    /// Subscribe to mark-price batches (~1s cadence while the stream is up).
    fn subscribe(&self) -> broadcast::Receiver<TickBatch>;
}
