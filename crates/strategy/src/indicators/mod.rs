//! Pure indicator computations over an ordered candle window.
//!
//! Every function is stateless: the same window always produces the same
//! values. Insufficient history yields `None` fields in the bundle rather
//! than an error — a strategy seeing a partial bundle simply scores fewer
//! layers.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ma;
pub mod macd;
pub mod rsi;
pub mod stoch_rsi;
pub mod volume;

pub use adx::Adx;
pub use bollinger::BollingerBands;
pub use macd::Macd;
pub use stoch_rsi::StochRsi;
pub use volume::VolumeStats;

use common::Candle;

use crate::profile::IndicatorProfile;

/// Crossover state shared by MACD and DI lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    Bullish,
    Bearish,
    None,
}

/// Snapshot of every indicator for one evaluation call.
///
/// Fields are `None` when the window is too short for that indicator.
/// Derived data only — never persisted apart from the candles that
/// produced it.
#[derive(Debug, Clone)]
pub struct IndicatorBundle {
    pub current_price: f64,
    pub rsi: Option<f64>,
    pub macd: Option<Macd>,
    pub bb: Option<BollingerBands>,
    pub atr: Option<f64>,
    pub atr_pct: Option<f64>,
    pub adx: Option<Adx>,
    pub stoch_rsi: Option<StochRsi>,
    pub volume: Option<VolumeStats>,
    pub ema_short: Option<f64>,
    pub ema_mid: Option<f64>,
    pub ema_long: Option<f64>,
    pub sma_fast: Option<f64>,
    pub sma_mid: Option<f64>,
    /// Percent distance of the current price from the fast SMA.
    pub momentum: f64,
}

impl IndicatorBundle {
    /// Compute the full bundle from a candle window (oldest first) using
    /// the given timeframe profile. The caller bounds the window size; the
    /// engine passes a sliding window of at most 200 candles.
    pub fn compute(candles: &[Candle], profile: &IndicatorProfile) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let current_price = closes.last().copied().unwrap_or(0.0);

        let sma_fast = ma::sma(&closes, profile.sma_fast);
        let momentum = match sma_fast {
            Some(avg) if avg > 0.0 => (current_price - avg) / avg * 100.0,
            _ => 0.0,
        };

        Self {
            current_price,
            rsi: rsi::rsi(&closes, profile.rsi_period),
            macd: macd::macd(
                &closes,
                profile.macd_fast,
                profile.macd_slow,
                profile.macd_signal,
            ),
            bb: bollinger::bollinger(&closes, profile.bb_period, profile.bb_std),
            atr: atr::atr(candles, profile.atr_period),
            atr_pct: atr::atr_pct(candles, profile.atr_period),
            adx: adx::adx(candles, profile.adx_period),
            stoch_rsi: stoch_rsi::stoch_rsi(
                &closes,
                profile.stoch_rsi_period,
                profile.stoch_rsi_period,
                profile.stoch_k_smooth,
            ),
            volume: volume::volume_stats(candles, profile.vol_recent, profile.vol_older),
            ema_short: ma::ema(&closes, profile.ema_short),
            ema_mid: ma::ema(&closes, profile.ema_mid),
            ema_long: ma::ema(&closes, profile.ema_long),
            sma_fast,
            sma_mid: ma::sma(&closes, profile.sma_mid),
            momentum,
        }
    }
}
