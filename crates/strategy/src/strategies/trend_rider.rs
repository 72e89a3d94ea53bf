//! Trend Rider — trades only with the dominant trend (EMA alignment),
//! waits for pullbacks, uses ADX for trend strength and MACD as catalyst.
//! ATR-adaptive stops with 3:1 R:R.

use common::Scores;

use crate::indicators::{Crossover, IndicatorBundle};
use crate::{ScoreCard, Strategy};

pub struct TrendRider;

impl Strategy for TrendRider {
    fn key(&self) -> &'static str {
        "trend_rider"
    }

    fn score(&self, ind: &IndicatorBundle, _price: f64) -> ScoreCard {
        let cfg = self.config();
        let mut long = 0i32;
        let mut short = 0i32;
        let mut reasons: Vec<String> = Vec::new();
        let atr_pct = ind.atr_pct.unwrap_or(3.0);

        // Layer 1: dominant trend filter (EMA alignment)
        let mut trend_up = false;
        let mut trend_down = false;
        if let (Some(ema9), Some(ema21)) = (ind.ema_short, ind.ema_mid) {
            if ema9 > ema21 {
                trend_up = true;
                long += 1;
            } else {
                trend_down = true;
                short += 1;
            }
            if let Some(ema55) = ind.ema_long {
                if ema9 > ema21 && ema21 > ema55 {
                    long += 2;
                    reasons.push("EMA 9>21>55 bullish alignment".into());
                } else if ema9 < ema21 && ema21 < ema55 {
                    short += 2;
                    reasons.push("EMA 9<21<55 bearish alignment".into());
                }
            }
        }

        // Layer 2: ADX trend strength
        if let Some(adx) = &ind.adx {
            if adx.strong_trend {
                if adx.plus_di > adx.minus_di {
                    long += 2;
                    reasons.push(format!("Strong uptrend ADX {:.0}", adx.value));
                } else {
                    short += 2;
                    reasons.push(format!("Strong downtrend ADX {:.0}", adx.value));
                }
            } else if adx.trending {
                if adx.plus_di > adx.minus_di {
                    long += 1;
                } else {
                    short += 1;
                }
                reasons.push(format!("Moderate trend ADX {:.0}", adx.value));
            } else {
                long = (long - 2).max(0);
                short = (short - 2).max(0);
                reasons.push(format!("Weak trend ADX {:.0} - reduced", adx.value));
            }
        }

        // Layer 3: pullback entry (RSI)
        if let Some(rsi) = ind.rsi {
            if trend_up && (35.0..=48.0).contains(&rsi) {
                long += 2;
                reasons.push(format!("Uptrend pullback: RSI {rsi:.0}"));
            } else if trend_down && (52.0..=65.0).contains(&rsi) {
                short += 2;
                reasons.push(format!("Downtrend bounce: RSI {rsi:.0}"));
            } else if trend_up && rsi > 72.0 {
                long = (long - 1).max(0);
                reasons.push(format!("RSI overextended {rsi:.0} - avoid chasing"));
            } else if trend_down && rsi < 28.0 {
                short = (short - 1).max(0);
                reasons.push(format!("RSI overextended {rsi:.0} - avoid chasing"));
            }
        }

        // Layer 4: MACD momentum catalyst
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
                Crossover::None => {
                    if macd.histogram > 0.0 && long > short {
                        long += 1;
                    } else if macd.histogram < 0.0 && short > long {
                        short += 1;
                    }
                }
            }
        }

        // Layer 5: BB pullback timing + StochRSI
        if let Some(bb) = &ind.bb {
            if trend_up && bb.pct_b < 0.30 {
                long += 1;
                reasons.push(format!("Price near lower BB ({:.2}) - pullback support", bb.pct_b));
            } else if trend_down && bb.pct_b > 0.70 {
                short += 1;
                reasons.push(format!("Price near upper BB ({:.2}) - bounce resistance", bb.pct_b));
            }
        }
        if let Some(stoch) = &ind.stoch_rsi {
            if stoch.k > stoch.d && stoch.oversold {
                long += 1;
                reasons.push("StochRSI cross up from oversold".into());
            } else if stoch.k < stoch.d && stoch.overbought {
                short += 1;
                reasons.push("StochRSI cross down from overbought".into());
            }
        }

        // Layer 6: volume confirmation
        if let Some(vol) = &ind.volume {
            if vol.increasing {
                if long > short {
                    long += 1;
                    reasons.push("Volume increasing".into());
                } else if short > long {
                    short += 1;
                    reasons.push("Volume increasing".into());
                }
            }
        }

        // Counter-trend penalty
        if trend_up && short > long {
            short = (short - 2).max(0);
        }
        if trend_down && long > short {
            long = (long - 2).max(0);
        }

        // Hard gate: full EMA alignment required for new entries
        let full_alignment = matches!(
            (ind.ema_short, ind.ema_mid, ind.ema_long),
            (Some(e9), Some(e21), Some(e55))
                if (e9 > e21 && e21 > e55) || (e9 < e21 && e21 < e55)
        );
        if !full_alignment {
            long = long.min(2);
            short = short.min(2);
        }

        let sl = (atr_pct * 1.5).max(1.5);
        let tp = (atr_pct * 4.5).max(sl * 3.0);
        let trail = (atr_pct * cfg.trail_atr_mult).max(sl);

        ScoreCard::new(Scores { long, short }, reasons, sl, tp, trail)
    }
}
