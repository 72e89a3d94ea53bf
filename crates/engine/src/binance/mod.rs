//! Binance USDⓈ-M futures market data: the combined mark-price WebSocket
//! stream for ticks and the REST klines endpoint for candles. Public
//! endpoints only — nothing here is signed.

pub mod rest;
pub mod stream;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use common::{Candle, KlineInterval, MarketFeed, Result, TickBatch};

use rest::BinanceRest;
use stream::MarkPriceStream;

/// Live market feed backed by Binance futures.
///
/// Mark prices arrive on the `!markPrice@arr@1s` stream and land in a
/// read-mostly cache; `mark_price` serves from the cache and only falls
/// back to REST before the first batch has arrived. The cache lock is
/// internal to the feed and is never held across a ledger operation.
pub struct BinanceFeed {
    rest: BinanceRest,
    ticks: broadcast::Sender<TickBatch>,
    cache: Arc<RwLock<HashMap<String, f64>>>,
}

impl BinanceFeed {
    pub fn new() -> Self {
        let (ticks, _) = broadcast::channel(64);
        Self {
            rest: BinanceRest::new(),
            ticks,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Spawn the WebSocket stream task. It reconnects forever; abort the
    /// returned handle to stop it.
    pub fn spawn_stream(&self) -> tokio::task::JoinHandle<()> {
        let stream = MarkPriceStream::new(self.ticks.clone(), self.cache.clone());
        tokio::spawn(stream.run())
    }
}

impl Default for BinanceFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketFeed for BinanceFeed {
    async fn mark_price(&self, symbol: &str) -> Result<f64> {
        if let Some(price) = self.cache.read().await.get(symbol) {
            return Ok(*price);
        }
        self.rest.mark_price(symbol).await
    }

    async fn ohlc(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.rest.klines(symbol, interval, limit).await
    }

    fn subscribe(&self) -> broadcast::Receiver<TickBatch> {
        self.ticks.subscribe()
    }
}
