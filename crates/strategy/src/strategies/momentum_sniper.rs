//! Momentum Sniper — enters on MACD crossovers backed by volume surges
//! and momentum confirmation. Overrides the exit policy to let profitable
//! trend-aligned winners run.

use common::{Direction, Scores, Signal};

use crate::indicators::{Crossover, IndicatorBundle};
use crate::signal::build_signal;
use crate::{PositionContext, ScoreCard, Strategy};

/// Extra reversal score demanded before a profitable, still-trend-aligned
/// position is closed on a reversal signal.
const RUNNING_WINNER_EXTRA_SCORE: i32 = 2;

pub struct MomentumSniper;

impl Strategy for MomentumSniper {
    fn key(&self) -> &'static str {
        "momentum_sniper"
    }

    fn score(&self, ind: &IndicatorBundle, _price: f64) -> ScoreCard {
        let cfg = self.config();
        let mut long = 0i32;
        let mut short = 0i32;
        let mut reasons: Vec<String> = Vec::new();
        let mom = ind.momentum;

        // MACD crossover is the primary trigger
        if let Some(macd) = &ind.macd {
            match macd.crossover {
                Crossover::Bullish => {
                    long += 3;
                    reasons.push("MACD bullish crossover (primary signal)".into());
                }
                Crossover::Bearish => {
                    short += 3;
                    reasons.push("MACD bearish crossover (primary signal)".into());
                }
                Crossover::None => {}
            }
            if macd.histogram > 0.0 && macd.prev_histogram < macd.histogram {
                long += 1;
                reasons.push("MACD histogram accelerating up".into());
            } else if macd.histogram < 0.0 && macd.prev_histogram > macd.histogram {
                short += 1;
                reasons.push("MACD histogram accelerating down".into());
            }
        }

        // Volume confirmation
        if let Some(vol) = &ind.volume {
            if vol.spike {
                if mom > 0.0 {
                    long += 2;
                } else if mom < 0.0 {
                    short += 2;
                }
                reasons.push("Volume spike detected".into());
            } else if vol.increasing {
                if mom > 0.0 {
                    long += 1;
                } else if mom < 0.0 {
                    short += 1;
                }
                reasons.push("Increasing volume".into());
            }
        }

        // Strong momentum
        if mom > 5.0 {
            long += 2;
            reasons.push(format!("Strong momentum +{mom:.1}%"));
        } else if mom > 2.0 {
            long += 1;
        } else if mom < -5.0 {
            short += 2;
            reasons.push(format!("Strong negative momentum {mom:.1}%"));
        } else if mom < -2.0 {
            short += 1;
        }

        // RSI exhaustion filter
        if let Some(rsi) = ind.rsi {
            if rsi > 80.0 {
                long = (long - 2).max(0);
                reasons.push(format!("RSI too high ({rsi:.0}) - momentum exhaustion risk"));
            } else if rsi < 20.0 {
                short = (short - 2).max(0);
                reasons.push(format!("RSI too low ({rsi:.0}) - bounce risk"));
            }
        }

        let atr_pct = ind.atr_pct.unwrap_or(3.0);
        let sl = (atr_pct * 1.5).max(2.0);
        let tp = (atr_pct * 4.0).max(8.0);
        let trail = (atr_pct * cfg.trail_atr_mult).max(sl);

        ScoreCard::new(Scores { long, short }, reasons, sl, tp, trail)
    }

    /// Let winners run: a profitable position that is still trend-aligned
    /// only closes on a reversal when the opposing side clears the entry
    /// threshold by an extra margin. SL/TP breaches always close.
    fn check_exit(
        &self,
        ind: &IndicatorBundle,
        price: f64,
        ctx: &PositionContext,
    ) -> Option<Signal> {
        let card = self.score(ind, price);
        let cfg = self.config();
        let sig = build_signal(&card, cfg, ctx, price);
        if !sig.is_exit() {
            return None;
        }

        let closing_long = sig.direction == Direction::CloseLong;
        let entry = if closing_long {
            ctx.entry_long
        } else {
            ctx.entry_short
        };
        let pnl_pct = if entry > 0.0 {
            if closing_long {
                (price - entry) / entry * 100.0
            } else {
                (entry - price) / entry * 100.0
            }
        } else {
            0.0
        };

        // SL/TP closes pass through untouched
        if entry > 0.0 && (pnl_pct <= -card.stop_loss_pct || pnl_pct >= card.take_profit_pct) {
            return Some(sig);
        }

        let opposing = if closing_long {
            card.scores.short
        } else {
            card.scores.long
        };
        let trend_aligned = ind.macd.as_ref().is_some_and(|m| {
            if closing_long {
                m.histogram > 0.0
            } else {
                m.histogram < 0.0
            }
        });

        if pnl_pct > 0.0 && trend_aligned && opposing < cfg.min_score + RUNNING_WINNER_EXTRA_SCORE {
            return None;
        }
        Some(sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{Macd, IndicatorBundle};
    use crate::profile::IndicatorProfile;
    use chrono::Utc;
    use common::{Candle, KlineInterval};

    fn bundle_from(closes: Vec<f64>) -> IndicatorBundle {
        let candles: Vec<Candle> = closes
            .iter()
            .map(|&c| Candle {
                open_time: Utc::now(),
                open: c,
                high: c * 1.004,
                low: c * 0.996,
                close: c,
                volume: 1000.0,
            })
            .collect();
        let profile = IndicatorProfile::for_interval(KlineInterval::H1);
        IndicatorBundle::compute(&candles, &profile)
    }

    #[test]
    fn profitable_trend_aligned_long_rides_mild_reversal() {
        let mut bundle = bundle_from((0..80).map(|i| 100.0 + i as f64 * 0.5).collect());
        // Force a mild bearish reading against a still-positive histogram
        bundle.macd = Some(Macd {
            value: 1.0,
            signal: 0.5,
            histogram: 0.5,
            prev_histogram: 0.6,
            crossover: Crossover::None,
        });
        let ctx = PositionContext {
            has_long: true,
            entry_long: 100.0,
            ..PositionContext::flat()
        };
        // In profit at 120, histogram positive, no strong reversal: hold
        let exit = MomentumSniper.check_exit(&bundle, 120.0, &ctx);
        assert!(exit.is_none());
    }

    #[test]
    fn stop_loss_still_closes_a_loser() {
        let bundle = bundle_from((0..80).map(|i| 140.0 - i as f64 * 0.5).collect());
        let ctx = PositionContext {
            has_long: true,
            entry_long: 140.0,
            ..PositionContext::flat()
        };
        // Deep under water: far beyond any ATR stop distance
        let exit = MomentumSniper.check_exit(&bundle, 80.0, &ctx);
        assert!(exit.is_some());
    }
}
