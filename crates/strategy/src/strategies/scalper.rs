//! Scalper Pro — aggressive short-term scalping shared by the 1m/3m/5m/
//! 15m/1h variants. Enters on micro-trends, pullbacks, momentum bursts,
//! and mean-reversion extremes. Lower entry threshold for trade frequency;
//! ATR-adaptive stops with 2:1 R:R. No counter-trend penalty: scalping
//! trades both directions.

use common::Scores;

use crate::indicators::{Crossover, IndicatorBundle};
use crate::{ScoreCard, Strategy};

/// One type covers all timeframe variants; the key selects both the
/// config entry and (via its kline interval) the indicator profile.
pub struct Scalper {
    key: &'static str,
}

impl Scalper {
    pub fn new(key: &'static str) -> Self {
        Self { key }
    }
}

impl Strategy for Scalper {
    fn key(&self) -> &'static str {
        self.key
    }

    fn score(&self, ind: &IndicatorBundle, _price: f64) -> ScoreCard {
        let cfg = self.config();
        let mut long = 0i32;
        let mut short = 0i32;
        let mut reasons: Vec<String> = Vec::new();
        let atr_pct = ind.atr_pct.unwrap_or(2.0);
        let mom = ind.momentum;

        // Layer 1: micro-trend (EMA short vs mid)
        let mut trend_up = false;
        let mut trend_down = false;
        if let (Some(ema9), Some(ema21)) = (ind.ema_short, ind.ema_mid) {
            let spread = if ema21 > 0.0 {
                (ema9 - ema21).abs() / ema21 * 100.0
            } else {
                0.0
            };
            if ema9 > ema21 {
                trend_up = true;
                long += 1;
                if spread > 0.1 {
                    long += 1;
                    reasons.push(format!("EMA9>21 spread {spread:.2}%"));
                }
            } else {
                trend_down = true;
                short += 1;
                if spread > 0.1 {
                    short += 1;
                    reasons.push(format!("EMA9<21 spread {spread:.2}%"));
                }
            }
        }

        // Layer 2: RSI, multiple zones
        if let Some(rsi) = ind.rsi {
            if trend_up && (35.0..=55.0).contains(&rsi) {
                long += 1;
                reasons.push(format!("RSI pullback in uptrend: {rsi:.0}"));
            } else if trend_down && (45.0..=65.0).contains(&rsi) {
                short += 1;
                reasons.push(format!("RSI bounce in downtrend: {rsi:.0}"));
            }

            if rsi < 30.0 {
                long += 2;
                reasons.push(format!("RSI oversold: {rsi:.0}"));
            } else if rsi > 70.0 {
                short += 2;
                reasons.push(format!("RSI overbought: {rsi:.0}"));
            }

            if rsi < 40.0 && !trend_down {
                long += 1;
            } else if rsi > 60.0 && !trend_up {
                short += 1;
            }
        }

        // Layer 3: Bollinger position + squeeze
        if let Some(bb) = &ind.bb {
            if bb.pct_b < 0.20 {
                long += 1;
                reasons.push(format!("Price at lower BB ({:.2})", bb.pct_b));
            } else if bb.pct_b > 0.80 {
                short += 1;
                reasons.push(format!("Price at upper BB ({:.2})", bb.pct_b));
            }

            if bb.pct_b < 0.05 {
                long += 1;
                reasons.push("BB extreme low - bounce expected".into());
            } else if bb.pct_b > 0.95 {
                short += 1;
                reasons.push("BB extreme high - rejection expected".into());
            }

            if bb.squeeze {
                if trend_up {
                    long += 1;
                    reasons.push("BB squeeze - bullish breakout expected".into());
                } else if trend_down {
                    short += 1;
                    reasons.push("BB squeeze - bearish breakout expected".into());
                }
            }
        }

        // Layer 4: MACD crossover + histogram acceleration
        if let Some(macd) = &ind.macd {
            match macd.crossover {
                Crossover::Bullish => {
                    long += 2;
                    reasons.push("MACD bullish crossover".into());
                }
                Crossover::Bearish => {
                    short += 2;
                    reasons.push("MACD bearish crossover".into());
                }
                Crossover::None => {}
            }
            if macd.histogram > 0.0
                && macd.prev_histogram > 0.0
                && macd.histogram > macd.prev_histogram
            {
                long += 1;
                reasons.push("MACD histogram accelerating up".into());
            } else if macd.histogram < 0.0
                && macd.prev_histogram < 0.0
                && macd.histogram < macd.prev_histogram
            {
                short += 1;
                reasons.push("MACD histogram accelerating down".into());
            }
        }

        // Layer 5: StochRSI crosses
        if let Some(stoch) = &ind.stoch_rsi {
            if stoch.k > stoch.d && stoch.oversold {
                long += 1;
                reasons.push("StochRSI cross up from oversold".into());
            } else if stoch.k < stoch.d && stoch.overbought {
                short += 1;
                reasons.push("StochRSI cross down from overbought".into());
            }

            // Mid-zone momentum
            if stoch.k > stoch.d && stoch.k > 20.0 && stoch.k < 80.0 {
                long += 1;
            } else if stoch.k < stoch.d && stoch.k > 20.0 && stoch.k < 80.0 {
                short += 1;
            }
        }

        // Layer 6: momentum vs fast SMA
        if mom > 0.3 {
            long += 1;
            reasons.push(format!("Momentum +{mom:.1}%"));
        } else if mom < -0.3 {
            short += 1;
            reasons.push(format!("Momentum {mom:.1}%"));
        }

        // Layer 7: volume confirmation
        if let Some(vol) = &ind.volume {
            if vol.spike {
                if long > short {
                    long += 1;
                    reasons.push("Volume spike confirms".into());
                } else if short > long {
                    short += 1;
                    reasons.push("Volume spike confirms".into());
                }
            } else if vol.increasing {
                if long > short {
                    long += 1;
                } else if short > long {
                    short += 1;
                }
            }
        }

        let sl = (atr_pct * 0.8).max(0.3);
        let tp = (atr_pct * 1.6).max(sl * 2.0);
        let trail = (atr_pct * cfg.trail_atr_mult).max(sl);

        ScoreCard::new(Scores { long, short }, reasons, sl, tp, trail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorBundle;
    use crate::profile::IndicatorProfile;
    use crate::PositionContext;
    use chrono::Utc;
    use common::{Candle, Direction, KlineInterval};

    fn bundle(closes: impl Iterator<Item = f64>, interval: KlineInterval) -> IndicatorBundle {
        let candles: Vec<Candle> = closes
            .map(|c| Candle {
                open_time: Utc::now(),
                open: c,
                high: c * 1.003,
                low: c * 0.997,
                close: c,
                volume: 1000.0,
            })
            .collect();
        IndicatorBundle::compute(&candles, &IndicatorProfile::for_interval(interval))
    }

    #[test]
    fn scalper_stops_are_tighter_than_swing_stops() {
        let b = bundle((0..120).map(|i| 100.0 + i as f64 * 0.2), KlineInterval::M1);
        let card = Scalper::new("scalper_1m").score(&b, b.current_price);
        assert!(card.take_profit_pct >= card.stop_loss_pct * 2.0);
        assert!(card.stop_loss_pct >= 0.3);
    }

    #[test]
    fn all_variants_resolve_their_own_config() {
        for key in ["scalper", "scalper_1m", "scalper_3m", "scalper_5m", "scalper_15m"] {
            let s = Scalper::new(crate::config::get(key).key);
            assert_eq!(s.config().key, key);
        }
    }

    #[test]
    fn steep_uptrend_on_1m_scores_long_entry() {
        let b = bundle(
            (0..120).map(|i| 100.0 * (1.0 + 0.002 * i as f64)),
            KlineInterval::M1,
        );
        let sig = Scalper::new("scalper_1m").evaluate(&b, b.current_price, &PositionContext::flat());
        // A clean sustained uptrend must not read as a short
        assert_ne!(sig.direction, Direction::Short);
    }
}
