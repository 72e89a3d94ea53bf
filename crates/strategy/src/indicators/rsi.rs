//! RSI (Relative Strength Index), Wilder-smoothed.

/// Full Wilder-smoothed RSI series. Empty when fewer than `period + 1`
/// closes are available. Zero average loss yields 100.0 by definition,
/// never a divide-by-zero.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = deltas.iter().map(|d| d.max(0.0)).collect();
    let losses: Vec<f64> = deltas.iter().map(|d| (-d).max(0.0)).collect();

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let value = |avg_gain: f64, avg_loss: f64| {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    };

    let mut out = Vec::with_capacity(deltas.len() - period + 1);
    out.push(value(avg_gain, avg_loss));

    for i in period..deltas.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        out.push(value(avg_gain, avg_loss));
    }
    out
}

/// Latest RSI value, `None` with insufficient data.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    rsi_series(closes, period).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_returns_none_when_insufficient_data() {
        let prices = vec![100.0; 14];
        assert!(rsi(&prices, 14).is_none());
    }

    #[test]
    fn rsi_rising_series_converges_to_100() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let value = rsi(&prices, 14).unwrap();
        assert!((value - 100.0).abs() < 1e-6, "Expected ~100, got {value}");
    }

    #[test]
    fn rsi_falling_series_converges_to_0() {
        let prices: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let value = rsi(&prices, 14).unwrap();
        assert!(value < 1e-6, "Expected ~0, got {value}");
    }

    #[test]
    fn rsi_flat_series_uses_zero_loss_fallback() {
        // All-equal closes: average loss is 0, defined fallback is 100
        let prices = vec![42.0; 30];
        assert_eq!(rsi(&prices, 14), Some(100.0));
    }

    #[test]
    fn rsi_stays_in_range() {
        let prices = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.15, 43.61, 44.33, 44.83,
            45.10, 45.15, 44.34, 44.09, 44.50, 43.90, 44.20,
        ];
        let value = rsi(&prices, 14).unwrap();
        assert!((0.0..=100.0).contains(&value), "RSI out of range: {value}");
    }
}
