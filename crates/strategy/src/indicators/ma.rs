//! Moving-average helpers shared by the other indicators.

/// Simple moving average of the last `period` values.
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    Some(prices[prices.len() - period..].iter().sum::<f64>() / period as f64)
}

/// Full EMA series, SMA-seeded. Empty when fewer than `period` values.
pub fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = prices[..period].iter().sum::<f64>() / period as f64;
    let mut emas = Vec::with_capacity(prices.len() - period + 1);
    emas.push(seed);
    for &price in &prices[period..] {
        let prev = *emas.last().unwrap();
        emas.push(price * k + prev * (1.0 - k));
    }
    emas
}

/// Latest EMA value.
pub fn ema(prices: &[f64], period: usize) -> Option<f64> {
    ema_series(prices, period).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_requires_enough_data() {
        assert!(sma(&[1.0, 2.0], 3).is_none());
        assert_eq!(sma(&[1.0, 2.0, 3.0], 3), Some(2.0));
    }

    #[test]
    fn sma_uses_most_recent_window() {
        let v = sma(&[100.0, 1.0, 2.0, 3.0], 3).unwrap();
        assert!((v - 2.0).abs() < 1e-9);
    }

    #[test]
    fn ema_seeded_with_sma() {
        // With exactly `period` values the EMA equals the SMA seed
        let prices = vec![10.0, 20.0, 30.0];
        assert_eq!(ema(&prices, 3), Some(20.0));
    }

    #[test]
    fn ema_tracks_rising_prices() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let e = ema(&prices, 9).unwrap();
        // EMA lags the latest price but sits well above the series mean
        assert!(e > 130.0 && e < *prices.last().unwrap());
    }

}
