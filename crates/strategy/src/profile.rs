use common::KlineInterval;

/// Indicator periods tuned per timeframe.
///
/// Short timeframes use shorter lookbacks so the oscillators react within
/// a few candles; the 1h profile matches the standard textbook periods.
/// The indicator library itself is profile-agnostic — callers pick the
/// profile for their interval and pass it in.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorProfile {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    pub atr_period: usize,
    pub adx_period: usize,
    pub stoch_rsi_period: usize,
    pub stoch_k_smooth: usize,
    pub ema_short: usize,
    pub ema_mid: usize,
    pub ema_long: usize,
    pub sma_fast: usize,
    pub sma_mid: usize,
    pub vol_recent: usize,
    pub vol_older: usize,
}

impl IndicatorProfile {
    pub const fn for_interval(interval: KlineInterval) -> Self {
        match interval {
            KlineInterval::M1 => Self {
                rsi_period: 7,
                macd_fast: 5,
                macd_slow: 13,
                macd_signal: 4,
                bb_period: 10,
                bb_std: 1.8,
                atr_period: 10,
                adx_period: 10,
                stoch_rsi_period: 7,
                stoch_k_smooth: 3,
                ema_short: 5,
                ema_mid: 13,
                ema_long: 21,
                sma_fast: 5,
                sma_mid: 13,
                vol_recent: 3,
                vol_older: 8,
            },
            KlineInterval::M3 => Self {
                rsi_period: 9,
                macd_fast: 8,
                macd_slow: 17,
                macd_signal: 6,
                bb_period: 14,
                bb_std: 2.0,
                atr_period: 10,
                adx_period: 10,
                stoch_rsi_period: 9,
                stoch_k_smooth: 3,
                ema_short: 7,
                ema_mid: 17,
                ema_long: 34,
                sma_fast: 5,
                sma_mid: 14,
                vol_recent: 4,
                vol_older: 10,
            },
            KlineInterval::M5 => Self {
                rsi_period: 10,
                macd_fast: 8,
                macd_slow: 21,
                macd_signal: 7,
                bb_period: 16,
                bb_std: 2.0,
                atr_period: 12,
                adx_period: 12,
                stoch_rsi_period: 10,
                stoch_k_smooth: 3,
                ema_short: 8,
                ema_mid: 21,
                ema_long: 50,
                sma_fast: 7,
                sma_mid: 21,
                vol_recent: 5,
                vol_older: 12,
            },
            KlineInterval::M15 => Self {
                rsi_period: 12,
                macd_fast: 10,
                macd_slow: 22,
                macd_signal: 8,
                bb_period: 18,
                bb_std: 2.0,
                atr_period: 14,
                adx_period: 14,
                stoch_rsi_period: 12,
                stoch_k_smooth: 3,
                ema_short: 9,
                ema_mid: 21,
                ema_long: 50,
                sma_fast: 7,
                sma_mid: 21,
                vol_recent: 5,
                vol_older: 15,
            },
            KlineInterval::H1 => Self {
                rsi_period: 14,
                macd_fast: 12,
                macd_slow: 26,
                macd_signal: 9,
                bb_period: 20,
                bb_std: 2.0,
                atr_period: 14,
                adx_period: 14,
                stoch_rsi_period: 14,
                stoch_k_smooth: 3,
                ema_short: 9,
                ema_mid: 21,
                ema_long: 55,
                sma_fast: 7,
                sma_mid: 21,
                vol_recent: 5,
                vol_older: 15,
            },
        }
    }
}
