use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use common::{Candle, Error, KlineInterval, Result};

const BASE_URL: &str = "https://fapi.binance.com";

/// REST client for Binance futures public market data.
pub struct BinanceRest {
    http: Client,
}

impl BinanceRest {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .use_rustls_tls()
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Fetch up to `limit` candles, oldest first — Binance already returns
    /// them in that order.
    pub async fn klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!(
            "{BASE_URL}/fapi/v1/klines?symbol={symbol}&interval={}&limit={limit}",
            interval.as_str()
        );
        debug!(symbol = %symbol, interval = %interval, limit = limit, "Fetching klines");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Feed(format!("klines HTTP {status}: {body}")));
        }

        let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        let candles = rows.iter().filter_map(parse_kline_row).collect();
        Ok(candles)
    }

    /// Current mark price via the premium index endpoint. Only used before
    /// the stream has populated the cache.
    pub async fn mark_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{BASE_URL}/fapi/v1/premiumIndex?symbol={symbol}");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let index: PremiumIndex = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
        index
            .mark_price
            .parse::<f64>()
            .map_err(|e| Error::Feed(format!("bad mark price for {symbol}: {e}")))
    }
}

impl Default for BinanceRest {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Response parsing ─────────────────────────────────────────────────────────

/// Kline rows come as heterogeneous arrays:
/// `[open_time, "o", "h", "l", "c", "v", close_time, ...]`.
fn parse_kline_row(row: &serde_json::Value) -> Option<Candle> {
    let arr = row.as_array()?;
    let num = |i: usize| arr.get(i)?.as_str()?.parse::<f64>().ok();
    Some(Candle {
        open_time: Utc
            .timestamp_millis_opt(arr.first()?.as_i64()?)
            .single()
            .unwrap_or_else(Utc::now),
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumIndex {
    mark_price: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kline_row() {
        let row: serde_json::Value = serde_json::from_str(
            r#"[1700000000000,"100.1","101.2","99.3","100.9","1234.5",1700000059999,"0",0,"0","0","0"]"#,
        )
        .unwrap();
        let candle = parse_kline_row(&row).unwrap();
        assert!((candle.open - 100.1).abs() < 1e-9);
        assert!((candle.high - 101.2).abs() < 1e-9);
        assert!((candle.low - 99.3).abs() < 1e-9);
        assert!((candle.close - 100.9).abs() < 1e-9);
        assert!((candle.volume - 1234.5).abs() < 1e-9);
    }

    #[test]
    fn malformed_row_yields_none() {
        let row: serde_json::Value = serde_json::from_str(r#"[1700000000000,"oops"]"#).unwrap();
        assert!(parse_kline_row(&row).is_none());
    }
}
