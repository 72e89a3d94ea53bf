//! ADX (Average Directional Index) with +DI / -DI.

use common::Candle;

use super::Crossover;

/// ADX above this means a trend is in force.
const TRENDING_THRESHOLD: f64 = 25.0;
/// ADX above this means a strong trend.
const STRONG_TREND_THRESHOLD: f64 = 40.0;

#[derive(Debug, Clone, Copy)]
pub struct Adx {
    pub value: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub trending: bool,
    pub strong_trend: bool,
    pub di_crossover: Crossover,
}

/// Compute ADX. Requires at least `2 * period + 1` candles.
pub fn adx(candles: &[Candle], period: usize) -> Option<Adx> {
    if period == 0 || candles.len() < 2 * period + 1 {
        return None;
    }

    let mut plus_dms = Vec::with_capacity(candles.len() - 1);
    let mut minus_dms = Vec::with_capacity(candles.len() - 1);
    let mut trs = Vec::with_capacity(candles.len() - 1);

    for w in candles.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);
        let up = cur.high - prev.high;
        let down = prev.low - cur.low;
        plus_dms.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dms.push(if down > up && down > 0.0 { down } else { 0.0 });

        let hl = cur.high - cur.low;
        let hc = (cur.high - prev.close).abs();
        let lc = (cur.low - prev.close).abs();
        trs.push(hl.max(hc).max(lc));
    }

    let mut sm_plus = plus_dms[..period].iter().sum::<f64>();
    let mut sm_minus = minus_dms[..period].iter().sum::<f64>();
    let mut sm_tr = trs[..period].iter().sum::<f64>();

    // (dx, +di, -di) per bar after the seed window
    let mut dx_values: Vec<(f64, f64, f64)> = Vec::new();
    for i in period..trs.len() {
        sm_plus = sm_plus - sm_plus / period as f64 + plus_dms[i];
        sm_minus = sm_minus - sm_minus / period as f64 + minus_dms[i];
        sm_tr = sm_tr - sm_tr / period as f64 + trs[i];

        let (plus_di, minus_di) = if sm_tr > 0.0 {
            (100.0 * sm_plus / sm_tr, 100.0 * sm_minus / sm_tr)
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            (plus_di - minus_di).abs() / di_sum * 100.0
        } else {
            0.0
        };
        dx_values.push((dx, plus_di, minus_di));
    }

    if dx_values.len() < period {
        return None;
    }

    let mut value = dx_values[..period].iter().map(|d| d.0).sum::<f64>() / period as f64;
    for (dx, _, _) in &dx_values[period..] {
        value = (value * (period - 1) as f64 + dx) / period as f64;
    }

    let (_, plus_di, minus_di) = *dx_values.last().unwrap();
    let (prev_plus, prev_minus) = if dx_values.len() >= 2 {
        let d = dx_values[dx_values.len() - 2];
        (d.1, d.2)
    } else {
        (plus_di, minus_di)
    };

    let di_crossover = if prev_plus <= prev_minus && plus_di > minus_di {
        Crossover::Bullish
    } else if prev_plus >= prev_minus && plus_di < minus_di {
        Crossover::Bearish
    } else {
        Crossover::None
    };

    Some(Adx {
        value,
        plus_di,
        minus_di,
        trending: value > TRENDING_THRESHOLD,
        strong_trend: value > STRONG_TREND_THRESHOLD,
        di_crossover,
    })
}
