//! Feed stub shared by the engine crate's tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use common::{Candle, Error, KlineInterval, MarketFeed, Result, TickBatch};

pub struct StubFeed {
    prices: RwLock<HashMap<String, f64>>,
    candles: RwLock<HashMap<String, Vec<Candle>>>,
    ticks: broadcast::Sender<TickBatch>,
}

impl StubFeed {
    pub fn new() -> Self {
        let (ticks, _) = broadcast::channel(16);
        Self {
            prices: RwLock::new(HashMap::new()),
            candles: RwLock::new(HashMap::new()),
            ticks,
        }
    }

    pub async fn set_price(&self, symbol: &str, price: f64) {
        self.prices.write().await.insert(symbol.to_string(), price);
    }

    #[allow(dead_code)]
    pub async fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.candles
            .write()
            .await
            .insert(symbol.to_string(), candles);
    }
}

#[async_trait]
impl MarketFeed for StubFeed {
    async fn mark_price(&self, symbol: &str) -> Result<f64> {
        self.prices
            .read()
            .await
            .get(symbol)
            .copied()
            .ok_or_else(|| Error::Feed(format!("no price for {symbol}")))
    }

    async fn ohlc(
        &self,
        symbol: &str,
        _interval: KlineInterval,
        _limit: usize,
    ) -> Result<Vec<Candle>> {
        Ok(self
            .candles
            .read()
            .await
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }

    fn subscribe(&self) -> broadcast::Receiver<TickBatch> {
        self.ticks.subscribe()
    }
}
