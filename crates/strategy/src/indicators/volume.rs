//! Volume trend and surge detection.

use common::Candle;

/// Recent/baseline volume ratio above this counts as increasing.
const INCREASING_RATIO: f64 = 1.3;
/// Last-bar volume above this multiple of the baseline is a spike.
const SPIKE_MULT: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
pub struct VolumeStats {
    /// Average of the recent window over the average of the baseline window.
    pub ratio: f64,
    pub increasing: bool,
    pub spike: bool,
    pub avg_volume: f64,
}

/// Compare the most recent `recent_n` bars against the `older_n` bars
/// before them. `None` when the series carries no volume at all.
pub fn volume_stats(candles: &[Candle], recent_n: usize, older_n: usize) -> Option<VolumeStats> {
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    if !volumes.iter().any(|&v| v > 0.0) {
        return None;
    }

    let n = volumes.len();
    let recent: &[f64] = if n >= recent_n && recent_n > 0 {
        &volumes[n - recent_n..]
    } else {
        &volumes
    };
    let older: &[f64] = if n >= recent_n + older_n {
        &volumes[n - recent_n - older_n..n - recent_n]
    } else if n > recent_n {
        &volumes[..n - recent_n]
    } else {
        &volumes[..(n / 2).max(1)]
    };

    let avg_recent = recent.iter().sum::<f64>() / recent.len() as f64;
    let avg_older = older.iter().sum::<f64>() / older.len() as f64;

    let ratio = if avg_older > 0.0 {
        avg_recent / avg_older
    } else {
        1.0
    };
    let last = *volumes.last().unwrap();
    let spike = avg_older > 0.0 && last > avg_older * SPIKE_MULT;

    Some(VolumeStats {
        ratio,
        increasing: ratio > INCREASING_RATIO,
        spike,
        avg_volume: avg_recent,
    })
}
