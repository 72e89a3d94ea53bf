//! Stochastic RSI with smoothed %K.

use super::rsi::rsi_series;

const OVERSOLD: f64 = 20.0;
const OVERBOUGHT: f64 = 80.0;

#[derive(Debug, Clone, Copy)]
pub struct StochRsi {
    /// Smoothed %K.
    pub k: f64,
    /// %K one bar earlier — strategies use k vs d for cross detection.
    pub d: f64,
    pub oversold: bool,
    pub overbought: bool,
}

/// Stochastic RSI over an RSI series. A flat RSI window (max == min)
/// reads as 50, the neutral midpoint.
pub fn stoch_rsi(
    closes: &[f64],
    rsi_period: usize,
    stoch_period: usize,
    k_smooth: usize,
) -> Option<StochRsi> {
    let rsis = rsi_series(closes, rsi_period);
    if stoch_period == 0 || rsis.len() < stoch_period {
        return None;
    }

    let mut stoch_vals = Vec::with_capacity(rsis.len() - stoch_period + 1);
    for i in stoch_period - 1..rsis.len() {
        let window = &rsis[i + 1 - stoch_period..=i];
        let min = window.iter().copied().fold(f64::INFINITY, f64::min);
        let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        stoch_vals.push(if max > min {
            (rsis[i] - min) / (max - min) * 100.0
        } else {
            50.0
        });
    }

    let n = stoch_vals.len();
    let k = if n >= k_smooth && k_smooth > 0 {
        stoch_vals[n - k_smooth..].iter().sum::<f64>() / k_smooth as f64
    } else {
        stoch_vals[n - 1]
    };
    let d = if n >= k_smooth + 1 && k_smooth > 0 {
        stoch_vals[n - k_smooth - 1..n - 1].iter().sum::<f64>() / k_smooth as f64
    } else {
        k
    };

    Some(StochRsi {
        k,
        d,
        oversold: k < OVERSOLD,
        overbought: k > OVERBOUGHT,
    })
}
