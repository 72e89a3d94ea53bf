//! Bollinger Bands with %B position and squeeze detection.

use super::ma::sma;

/// Band width below this percent of the mid line counts as a squeeze.
const SQUEEZE_WIDTH_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
pub struct BollingerBands {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
    /// Position of the last close within the bands: 0 = lower, 1 = upper.
    pub pct_b: f64,
    /// Band width as percent of the mid line.
    pub width_pct: f64,
    pub squeeze: bool,
}

pub fn bollinger(closes: &[f64], period: usize, std_mult: f64) -> Option<BollingerBands> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let mid = sma(closes, period)?;
    let window = &closes[closes.len() - period..];
    let variance = window.iter().map(|p| (p - mid).powi(2)).sum::<f64>() / period as f64;
    let std = variance.sqrt();

    let upper = mid + std_mult * std;
    let lower = mid - std_mult * std;
    let width_pct = if mid > 0.0 {
        (upper - lower) / mid * 100.0
    } else {
        0.0
    };

    let current = *closes.last().unwrap();
    let span = upper - lower;
    // Degenerate band (flat window): treat the close as mid-band
    let pct_b = if span > 0.0 {
        (current - lower) / span
    } else {
        0.5
    };

    Some(BollingerBands {
        upper,
        mid,
        lower,
        pct_b,
        width_pct,
        squeeze: width_pct < SQUEEZE_WIDTH_PCT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_returns_none_when_insufficient_data() {
        assert!(bollinger(&[100.0; 19], 20, 2.0).is_none());
    }

    #[test]
    fn bollinger_flat_series_squeezes_at_mid() {
        let bb = bollinger(&[100.0; 25], 20, 2.0).unwrap();
        assert_eq!(bb.mid, 100.0);
        assert!(bb.squeeze);
        assert!((bb.pct_b - 0.5).abs() < 1e-9);
    }

    #[test]
    fn bollinger_close_at_top_of_range_has_high_pct_b() {
        let mut prices: Vec<f64> = (0..20).map(|i| 100.0 + (i % 5) as f64).collect();
        prices.push(110.0); // jump above the recent range
        let bb = bollinger(&prices, 20, 2.0).unwrap();
        assert!(bb.pct_b > 0.8, "pct_b {}", bb.pct_b);
        assert!(bb.upper > bb.mid && bb.mid > bb.lower);
    }
}
