//! Confluence Master — institutional multi-factor approach. Only trades
//! when five or more independent checks align; leverage steps up with the
//! degree of confluence. Fewest trades of all variants.
//!
//! Overrides `evaluate` wholesale: its confidence is the fraction of
//! aligned checks rather than a score divisor, and it chooses leverage
//! itself, so the shared builder does not apply.

use common::{Direction, Scores, Signal};

use crate::indicators::{Crossover, IndicatorBundle};
use crate::{PositionContext, ScoreCard, Strategy};

/// Aligned checks required before any entry.
const MIN_ALIGNED: i32 = 5;

pub struct ConfluenceMaster;

struct Tally {
    long: i32,
    short: i32,
    checks: i32,
    reasons: Vec<String>,
}

impl ConfluenceMaster {
    fn tally(&self, ind: &IndicatorBundle, mom: f64) -> Tally {
        let mut long = 0i32;
        let mut short = 0i32;
        let mut checks = 0i32;
        let mut reasons: Vec<String> = Vec::new();

        // 1. RSI
        if let Some(rsi) = ind.rsi {
            checks += 1;
            if rsi < 35.0 {
                long += 1;
                reasons.push(format!("+ RSI bullish ({rsi:.0})"));
            } else if rsi > 65.0 {
                short += 1;
                reasons.push(format!("+ RSI bearish ({rsi:.0})"));
            } else {
                reasons.push(format!("o RSI neutral ({rsi:.0})"));
            }
        }

        // 2. MACD histogram + crossover
        if let Some(macd) = &ind.macd {
            checks += 1;
            if macd.histogram > 0.0 {
                long += 1;
                reasons.push("+ MACD bullish".into());
            } else {
                short += 1;
                reasons.push("+ MACD bearish".into());
            }
            match macd.crossover {
                Crossover::Bullish => {
                    long += 1;
                    reasons.push("+ MACD bullish crossover".into());
                }
                Crossover::Bearish => {
                    short += 1;
                    reasons.push("+ MACD bearish crossover".into());
                }
                Crossover::None => {}
            }
        }

        // 3. Bollinger bands
        if let Some(bb) = &ind.bb {
            checks += 1;
            if bb.pct_b < 0.2 {
                long += 1;
                reasons.push(format!("+ BB oversold (%B={:.2})", bb.pct_b));
            } else if bb.pct_b > 0.8 {
                short += 1;
                reasons.push(format!("+ BB overbought (%B={:.2})", bb.pct_b));
            } else {
                reasons.push(format!("o BB neutral (%B={:.2})", bb.pct_b));
            }
        }

        // 4. EMA alignment
        if let (Some(ema9), Some(ema21)) = (ind.ema_short, ind.ema_mid) {
            checks += 1;
            if ema9 > ema21 {
                long += 1;
                reasons.push("+ EMA bullish alignment".into());
            } else {
                short += 1;
                reasons.push("+ EMA bearish alignment".into());
            }
        }

        // 5. ADX trend strength
        if let Some(adx) = &ind.adx {
            checks += 1;
            if adx.trending {
                if adx.plus_di > adx.minus_di {
                    long += 1;
                    reasons.push(format!("+ ADX uptrend ({:.0})", adx.value));
                } else {
                    short += 1;
                    reasons.push(format!("+ ADX downtrend ({:.0})", adx.value));
                }
            } else {
                reasons.push(format!("o ADX no trend ({:.0})", adx.value));
            }
        }

        // 6. Stochastic RSI
        if let Some(stoch) = &ind.stoch_rsi {
            checks += 1;
            if stoch.oversold {
                long += 1;
                reasons.push(format!("+ StochRSI oversold ({:.0})", stoch.k));
            } else if stoch.overbought {
                short += 1;
                reasons.push(format!("+ StochRSI overbought ({:.0})", stoch.k));
            } else {
                reasons.push(format!("o StochRSI neutral ({:.0})", stoch.k));
            }
        }

        // 7. Volume confirms the current leader
        if let Some(vol) = &ind.volume {
            checks += 1;
            if vol.spike || vol.increasing {
                reasons.push("+ Volume confirms".into());
                if long > short {
                    long += 1;
                } else if short > long {
                    short += 1;
                }
            }
        }

        // 8. Momentum
        checks += 1;
        if mom > 2.0 {
            long += 1;
            reasons.push(format!("+ Momentum bullish (+{mom:.1}%)"));
        } else if mom < -2.0 {
            short += 1;
            reasons.push(format!("+ Momentum bearish ({mom:.1}%)"));
        } else {
            reasons.push(format!("o Momentum neutral ({mom:.1}%)"));
        }

        Tally {
            long,
            short,
            checks,
            reasons,
        }
    }
}

impl Strategy for ConfluenceMaster {
    fn key(&self) -> &'static str {
        "confluence_master"
    }

    fn score(&self, ind: &IndicatorBundle, _price: f64) -> ScoreCard {
        let cfg = self.config();
        let t = self.tally(ind, ind.momentum);
        let atr_pct = ind.atr_pct.unwrap_or(3.0);
        let sl = (atr_pct * 2.0).max(3.0);
        let tp = (atr_pct * 5.0).max(10.0);
        let trail = (atr_pct * cfg.trail_atr_mult).max(sl);
        ScoreCard::new(
            Scores {
                long: t.long,
                short: t.short,
            },
            t.reasons,
            sl,
            tp,
            trail,
        )
    }

    fn evaluate(&self, ind: &IndicatorBundle, price: f64, ctx: &PositionContext) -> Signal {
        let cfg = self.config();
        let t = self.tally(ind, ind.momentum);
        let max_signals = t.long.max(t.short);
        let confidence = max_signals as f64 / t.checks.max(1) as f64;
        let scores = Scores {
            long: t.long,
            short: t.short,
        };
        let joined = t.reasons.join("; ");

        if max_signals < MIN_ALIGNED {
            return Signal {
                direction: Direction::Neutral,
                confidence,
                leverage: cfg.default_leverage,
                stop_loss_pct: 3.0,
                take_profit_pct: 8.0,
                trail_pct: 0.0,
                reasoning: format!(
                    "HOLD - Insufficient confluence: {}L/{}S out of {} checks. Need {MIN_ALIGNED}+. | {joined}",
                    t.long, t.short, t.checks
                ),
                scores,
            };
        }

        // Step leverage up with the degree of confluence
        let leverage = if max_signals >= 7 {
            cfg.max_leverage.min(10)
        } else if max_signals >= 6 {
            cfg.max_leverage.min(7)
        } else {
            cfg.default_leverage
        };

        let atr_pct = ind.atr_pct.unwrap_or(3.0);
        let sl = (atr_pct * 2.0).max(3.0);
        let tp = (atr_pct * 5.0).max(10.0);
        let trail = (atr_pct * cfg.trail_atr_mult).max(sl);

        let bullish = t.long > t.short;
        let (direction, reasoning) = if ctx.has_long && !bullish {
            (
                Direction::CloseLong,
                format!(
                    "CLOSE LONG - Confluence shifted bearish ({}/{}) | {joined}",
                    t.short, t.checks
                ),
            )
        } else if ctx.has_short && bullish {
            (
                Direction::CloseShort,
                format!(
                    "CLOSE SHORT - Confluence shifted bullish ({}/{}) | {joined}",
                    t.long, t.checks
                ),
            )
        } else if bullish {
            (
                Direction::Long,
                format!("LONG - Confluence {max_signals}/{} | {joined}", t.checks),
            )
        } else {
            (
                Direction::Short,
                format!("SHORT - Confluence {max_signals}/{} | {joined}", t.checks),
            )
        };

        Signal {
            direction,
            confidence,
            leverage,
            stop_loss_pct: sl,
            take_profit_pct: tp,
            trail_pct: trail,
            reasoning,
            scores,
        }
    }

    // The default check_exit is correct here: evaluate already emits
    // close_long/close_short on a dominant-side flip.
}
