//! ATR (Average True Range), Wilder-smoothed.

use common::Candle;

/// Wilder-smoothed ATR over `period`. Needs `period + 1` candles.
/// A perfectly flat series yields 0.0 — a defined value, not an error.
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let trs: Vec<f64> = candles
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            let hl = cur.high - cur.low;
            let hc = (cur.high - prev.close).abs();
            let lc = (cur.low - prev.close).abs();
            hl.max(hc).max(lc)
        })
        .collect();

    let mut value = trs[..period].iter().sum::<f64>() / period as f64;
    for tr in &trs[period..] {
        value = (value * (period - 1) as f64 + tr) / period as f64;
    }
    Some(value)
}

/// ATR as percent of the latest close. `None` when the close is not positive.
pub fn atr_pct(candles: &[Candle], period: usize) -> Option<f64> {
    let value = atr(candles, period)?;
    let close = candles.last()?.close;
    if close > 0.0 {
        Some(value / close * 100.0)
    } else {
        None
    }
}
