//! Shared score-to-signal conversion used by every strategy.

use common::{Direction, Scores, Signal};

use crate::config::StrategyConfig;
use crate::PositionContext;

/// Hard cap on reported confidence, whatever the scores say.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Raw output of one strategy's layer accumulation, before the shared
/// entry/exit policy is applied.
#[derive(Debug, Clone)]
pub struct ScoreCard {
    pub scores: Scores,
    pub reasons: Vec<String>,
    /// ATR-derived stop-loss distance in percent.
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Trailing distance in percent; negative opts out of trailing.
    pub trail_pct: f64,
    /// Set by strategies that pick leverage themselves (e.g. confluence
    /// scaling); otherwise leverage scales with confidence.
    pub leverage_override: Option<u32>,
}

impl ScoreCard {
    pub fn new(scores: Scores, reasons: Vec<String>, sl: f64, tp: f64, trail: f64) -> Self {
        Self {
            scores,
            reasons,
            stop_loss_pct: sl,
            take_profit_pct: tp,
            trail_pct: trail,
            leverage_override: None,
        }
    }
}

/// Convert raw scores into a Signal under the per-style thresholds.
///
/// Policy, in order: exit checks for a held side (reversal, then SL/TP
/// against the known entry), then entry checks (score floor, score lead,
/// confidence floor), else neutral. Adding a strategy never means editing
/// this function — variants tune it through `StrategyConfig` or override
/// `evaluate`/`check_exit` on the trait.
pub fn build_signal(
    card: &ScoreCard,
    cfg: &StrategyConfig,
    ctx: &PositionContext,
    current_price: f64,
) -> Signal {
    let Scores { long, short } = card.scores;
    let max_score = card.scores.max();
    let confidence = (max_score as f64 / cfg.confidence_divisor).min(MAX_CONFIDENCE);
    let reasoning = if card.reasons.is_empty() {
        "No clear signals".to_string()
    } else {
        card.reasons.join("; ")
    };

    let leverage = card.leverage_override.unwrap_or_else(|| {
        if confidence > 0.7 {
            cfg.max_leverage.min(cfg.default_leverage + 2)
        } else if confidence < 0.5 {
            cfg.default_leverage.saturating_sub(1).max(1)
        } else {
            cfg.default_leverage
        }
    });

    let sig = |direction: Direction, conf: f64, reasoning: String| Signal {
        direction,
        confidence: conf,
        leverage,
        stop_loss_pct: card.stop_loss_pct,
        take_profit_pct: card.take_profit_pct,
        trail_pct: card.trail_pct,
        reasoning,
        scores: card.scores,
    };

    // Exits for a held side come first
    if ctx.has_long {
        if short >= cfg.min_score && short - long >= cfg.min_score_lead {
            return sig(
                Direction::CloseLong,
                confidence,
                format!("CLOSE LONG - bearish reversal: {reasoning}"),
            );
        }
        if ctx.entry_long > 0.0 {
            let pnl_pct = (current_price - ctx.entry_long) / ctx.entry_long * 100.0;
            if pnl_pct <= -card.stop_loss_pct {
                return sig(
                    Direction::CloseLong,
                    0.95,
                    format!("CLOSE LONG - stop-loss hit ({pnl_pct:.1}%)"),
                );
            }
            if pnl_pct >= card.take_profit_pct {
                return sig(
                    Direction::CloseLong,
                    0.90,
                    format!("CLOSE LONG - take-profit hit (+{pnl_pct:.1}%)"),
                );
            }
        }
    }

    if ctx.has_short {
        if long >= cfg.min_score && long - short >= cfg.min_score_lead {
            return sig(
                Direction::CloseShort,
                confidence,
                format!("CLOSE SHORT - bullish reversal: {reasoning}"),
            );
        }
        if ctx.entry_short > 0.0 {
            let pnl_pct = (ctx.entry_short - current_price) / ctx.entry_short * 100.0;
            if pnl_pct <= -card.stop_loss_pct {
                return sig(
                    Direction::CloseShort,
                    0.95,
                    format!("CLOSE SHORT - stop-loss hit ({pnl_pct:.1}%)"),
                );
            }
            if pnl_pct >= card.take_profit_pct {
                return sig(
                    Direction::CloseShort,
                    0.90,
                    format!("CLOSE SHORT - take-profit hit (+{pnl_pct:.1}%)"),
                );
            }
        }
    }

    // New entries
    if long >= cfg.min_score
        && long - short >= cfg.min_score_lead
        && !ctx.has_long
        && confidence >= cfg.min_confidence
    {
        return sig(Direction::Long, confidence, format!("LONG - {reasoning}"));
    }
    if short >= cfg.min_score
        && short - long >= cfg.min_score_lead
        && !ctx.has_short
        && confidence >= cfg.min_confidence
    {
        return sig(Direction::Short, confidence, format!("SHORT - {reasoning}"));
    }

    sig(
        Direction::Neutral,
        confidence,
        format!("HOLD - {reasoning} (L={long}/S={short})"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn card(long: i32, short: i32) -> ScoreCard {
        ScoreCard::new(Scores { long, short }, vec!["test".into()], 2.0, 6.0, 3.0)
    }

    #[test]
    fn sub_threshold_scores_are_neutral_and_idempotent() {
        let cfg = config::get("trend_rider");
        let ctx = PositionContext::flat();
        let a = build_signal(&card(2, 1), cfg, &ctx, 100.0);
        let b = build_signal(&card(2, 1), cfg, &ctx, 100.0);
        assert_eq!(a.direction, Direction::Neutral);
        assert_eq!(b.direction, Direction::Neutral);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.reasoning, b.reasoning);
    }

    #[test]
    fn entry_requires_confidence_floor() {
        let cfg = config::get("confluence_master"); // min_confidence 0.70
        let ctx = PositionContext::flat();
        // score 5 → confidence 0.5 < 0.70 floor
        let sig = build_signal(&card(5, 0), cfg, &ctx, 100.0);
        assert_eq!(sig.direction, Direction::Neutral);
    }

    #[test]
    fn strong_long_score_opens_long() {
        let cfg = config::get("trend_rider"); // min_confidence 0.55
        let ctx = PositionContext::flat();
        let sig = build_signal(&card(7, 1), cfg, &ctx, 100.0);
        assert_eq!(sig.direction, Direction::Long);
        assert!((sig.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn confidence_caps_at_095() {
        let cfg = config::get("scalper"); // divisor 8
        let ctx = PositionContext::flat();
        let sig = build_signal(&card(12, 0), cfg, &ctx, 100.0);
        assert_eq!(sig.confidence, MAX_CONFIDENCE);
    }

    #[test]
    fn leverage_scales_with_confidence() {
        let cfg = config::get("trend_rider"); // default 3, max 5
        let ctx = PositionContext::flat();
        let high = build_signal(&card(8, 0), cfg, &ctx, 100.0); // conf 0.8
        assert_eq!(high.leverage, 5);
        let low = build_signal(&card(2, 0), cfg, &ctx, 100.0); // conf 0.2
        assert_eq!(low.leverage, 2);
    }

    #[test]
    fn reversal_closes_held_long() {
        let cfg = config::get("trend_rider");
        let ctx = PositionContext {
            has_long: true,
            entry_long: 100.0,
            ..PositionContext::flat()
        };
        let sig = build_signal(&card(1, 5), cfg, &ctx, 100.5);
        assert_eq!(sig.direction, Direction::CloseLong);
    }

    #[test]
    fn stop_loss_breach_closes_before_entry_logic() {
        let cfg = config::get("trend_rider");
        let ctx = PositionContext {
            has_long: true,
            entry_long: 100.0,
            ..PositionContext::flat()
        };
        // 2% SL in the card; price down 3%
        let sig = build_signal(&card(0, 0), cfg, &ctx, 97.0);
        assert_eq!(sig.direction, Direction::CloseLong);
        assert_eq!(sig.confidence, 0.95);
    }

    #[test]
    fn take_profit_closes_held_short() {
        let cfg = config::get("trend_rider");
        let ctx = PositionContext {
            has_short: true,
            entry_short: 100.0,
            ..PositionContext::flat()
        };
        // 6% TP in the card; price down 7% = short in profit
        let sig = build_signal(&card(0, 0), cfg, &ctx, 93.0);
        assert_eq!(sig.direction, Direction::CloseShort);
    }

    #[test]
    fn hedged_symbol_uses_each_sides_own_entry() {
        let cfg = config::get("trend_rider");
        // Long from 100 sits flat; short from 90 is 11% under water,
        // well past the 2% stop. Only the short's math may fire.
        let ctx = PositionContext {
            has_long: true,
            has_short: true,
            entry_long: 100.0,
            entry_short: 90.0,
        };
        let sig = build_signal(&card(0, 0), cfg, &ctx, 100.0);
        assert_eq!(sig.direction, Direction::CloseShort);
        assert_eq!(sig.confidence, 0.95);
    }

    #[test]
    fn tie_scores_never_enter() {
        let cfg = config::get("scalper");
        let ctx = PositionContext::flat();
        let sig = build_signal(&card(4, 4), cfg, &ctx, 100.0);
        assert_eq!(sig.direction, Direction::Neutral);
    }
}
