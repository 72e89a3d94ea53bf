//! MACD with a proper EMA signal line and crossover detection.

use super::ma::ema_series;
use super::Crossover;

/// One MACD snapshot: line, signal, histogram, and the previous histogram
/// value so strategies can detect momentum acceleration.
#[derive(Debug, Clone, Copy)]
pub struct Macd {
    pub value: f64,
    pub signal: f64,
    pub histogram: f64,
    pub prev_histogram: f64,
    pub crossover: Crossover,
}

/// Compute MACD from closes (oldest first). Needs `slow + signal_period`
/// values; returns `None` below that.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> Option<Macd> {
    if closes.len() < slow + signal_period {
        return None;
    }

    let ema_fast = ema_series(closes, fast);
    let ema_slow = ema_series(closes, slow);

    // The slow series starts `slow - fast` values later; align the two.
    let offset = slow - fast;
    if offset > ema_fast.len() {
        return None;
    }
    let macd_series: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, s)| ema_fast[i + offset] - s)
        .collect();

    if macd_series.len() < signal_period {
        return None;
    }
    let signal_series = ema_series(&macd_series, signal_period);
    if signal_series.is_empty() {
        return None;
    }

    let value = *macd_series.last().unwrap();
    let signal = *signal_series.last().unwrap();
    let histogram = value - signal;

    let prev_value = if macd_series.len() >= 2 {
        macd_series[macd_series.len() - 2]
    } else {
        value
    };
    let prev_signal = if signal_series.len() >= 2 {
        signal_series[signal_series.len() - 2]
    } else {
        signal
    };
    let prev_histogram = prev_value - prev_signal;

    let crossover = if prev_value <= prev_signal && value > signal {
        Crossover::Bullish
    } else if prev_value >= prev_signal && value < signal {
        Crossover::Bearish
    } else {
        Crossover::None
    };

    Some(Macd {
        value,
        signal,
        histogram,
        prev_histogram,
        crossover,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_returns_none_with_insufficient_data() {
        let prices = vec![100.0; 30]; // need >= 35 for 26+9
        assert!(macd(&prices, 12, 26, 9).is_none());
    }

    #[test]
    fn macd_returns_some_with_sufficient_data() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        assert!(macd(&prices, 12, 26, 9).is_some());
    }

    #[test]
    fn macd_positive_histogram_in_accelerating_uptrend() {
        let mut prices: Vec<f64> = (0..40).map(|_| 100.0).collect();
        prices.extend((0..20).map(|i| 100.0 + (i as f64).powf(1.3)));
        let m = macd(&prices, 12, 26, 9).unwrap();
        assert!(m.value > 0.0);
        assert!(m.histogram > 0.0);
    }

    #[test]
    fn macd_detects_bullish_crossover_after_reversal() {
        // Long decline followed by a sharp rally: the MACD line must cross
        // up through the signal line somewhere along the rally.
        let mut crossed = false;
        let mut prices: Vec<f64> = (0..40).map(|i| 150.0 - i as f64).collect();
        for i in 0..30 {
            prices.push(110.0 + i as f64 * 2.0);
            if let Some(m) = macd(&prices, 12, 26, 9) {
                if m.crossover == Crossover::Bullish {
                    crossed = true;
                    break;
                }
            }
        }
        assert!(crossed, "expected a bullish crossover during the rally");
    }

    #[test]
    fn macd_flat_series_is_neutral() {
        let prices = vec![100.0; 60];
        let m = macd(&prices, 12, 26, 9).unwrap();
        assert_eq!(m.crossover, Crossover::None);
        assert!(m.histogram.abs() < 1e-9);
    }
}
