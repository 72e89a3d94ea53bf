//! Pure position-lifecycle math: liquidation, sizing, leverage clamping
//! and the two-phase trailing-stop state machine. No locking, no I/O —
//! everything here is unit-testable in isolation.

use common::{Position, Side, TrailPhase};

/// Fraction of margin lost before forced liquidation. The remaining 10%
/// stands in for the exchange maintenance-margin buffer.
pub const MAINTENANCE_BUFFER: f64 = 0.9;

/// A single position may never commit more than a quarter of the balance.
pub const MAX_MARGIN_FRACTION: f64 = 0.25;

/// Positions below this margin are dust and are not opened.
pub const MIN_MARGIN_FRACTION: f64 = 0.01;
pub const MIN_MARGIN_FLOOR_USD: f64 = 1.0;

/// Price at which the position's margin is wiped out (less the
/// maintenance buffer). Long: `entry × (1 − 0.9/L)`, short mirrored.
pub fn liquidation_price(entry: f64, leverage: u32, side: Side) -> f64 {
    let l = leverage.max(1) as f64;
    match side {
        Side::Long => entry * (1.0 - MAINTENANCE_BUFFER / l),
        Side::Short => entry * (1.0 + MAINTENANCE_BUFFER / l),
    }
}

/// Effective leverage: the signal's choice raised to the agent's minimum,
/// capped by the strategy's maximum.
pub fn clamp_leverage(signal_leverage: u32, agent_min: u32, strategy_max: u32) -> u32 {
    signal_leverage.max(agent_min).min(strategy_max).max(1)
}

/// Strategy risk-per-trade percentage clamped into the agent's band,
/// where the agent sets one.
pub fn effective_risk_pct(strategy_pct: f64, agent_min: Option<f64>, agent_max: Option<f64>) -> f64 {
    let mut pct = strategy_pct;
    if let Some(lo) = agent_min {
        pct = pct.max(lo);
    }
    if let Some(hi) = agent_max {
        pct = pct.min(hi);
    }
    pct
}

/// Margin to commit so that a stop-loss hit costs `risk_pct` of balance:
/// `balance × risk/100 / (sl/100 × leverage)`, capped at a quarter of the
/// balance. Returns `None` when the result falls below the dust floor —
/// the trade is rejected rather than opened tiny.
pub fn position_margin(balance: f64, risk_pct: f64, sl_pct: f64, leverage: u32) -> Option<f64> {
    if balance <= 0.0 || risk_pct <= 0.0 || sl_pct <= 0.0 || leverage == 0 {
        return None;
    }
    let risk_usd = balance * risk_pct / 100.0;
    let margin = (risk_usd / (sl_pct / 100.0 * leverage as f64)).min(balance * MAX_MARGIN_FRACTION);
    let floor = (balance * MIN_MARGIN_FRACTION).max(MIN_MARGIN_FLOOR_USD);
    (margin >= floor).then_some(margin)
}

/// Outcome of a trailing-stop advancement: the new phase, stop and best
/// price to store on the position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailAdvance {
    pub phase: TrailPhase,
    pub stop: f64,
    pub best_price: f64,
}

/// Advance the two-phase trailing stop for `pos` at `price`.
///
/// Inactive → Breakeven once the favorable move reaches 1R (stop moves to
/// entry, one-way); Breakeven → Chandelier once it reaches `trail_pct`
/// from entry. In Chandelier the best price ratchets monotonically and
/// the stop follows at `best × (1 ∓ trail_pct/100)`, tightening only.
/// A negative `trail_pct` keeps the stop at the original SL for the life
/// of the trade. Returns `None` when nothing changed.
pub fn advance_trail(pos: &Position, price: f64) -> Option<TrailAdvance> {
    if pos.trail_pct < 0.0 || pos.entry_price <= 0.0 {
        return None;
    }

    let favorable = pos.favorable_move_pct(price);
    let sign = pos.side.sign();
    let tighter = |candidate: f64, current: f64| match pos.side {
        Side::Long => candidate > current,
        Side::Short => candidate < current,
    };
    let ratchet = |best: f64| match pos.side {
        Side::Long => best.max(price),
        Side::Short => best.min(price),
    };

    match pos.trail_phase {
        TrailPhase::Inactive => {
            // A large jump can skip straight past breakeven.
            if pos.trail_pct > 0.0 && favorable >= pos.trail_pct {
                let best = ratchet(pos.best_price);
                let candidate = best * (1.0 - sign * pos.trail_pct / 100.0);
                // Entering chandelier never leaves the stop looser than entry
                let stop = if tighter(candidate, pos.entry_price) {
                    candidate
                } else {
                    pos.entry_price
                };
                return Some(TrailAdvance {
                    phase: TrailPhase::Chandelier,
                    stop,
                    best_price: best,
                });
            }
            if favorable >= pos.stop_distance_pct() && pos.stop_distance_pct() > 0.0 {
                return Some(TrailAdvance {
                    phase: TrailPhase::Breakeven,
                    stop: pos.entry_price,
                    best_price: ratchet(pos.best_price),
                });
            }
            None
        }
        TrailPhase::Breakeven => {
            if pos.trail_pct > 0.0 && favorable >= pos.trail_pct {
                let best = ratchet(pos.best_price);
                let candidate = best * (1.0 - sign * pos.trail_pct / 100.0);
                let stop = if tighter(candidate, pos.stop_loss) {
                    candidate
                } else {
                    pos.stop_loss
                };
                return Some(TrailAdvance {
                    phase: TrailPhase::Chandelier,
                    stop,
                    best_price: best,
                });
            }
            None
        }
        TrailPhase::Chandelier => {
            let best = ratchet(pos.best_price);
            let candidate = best * (1.0 - sign * pos.trail_pct / 100.0);
            let stop = if tighter(candidate, pos.stop_loss) {
                candidate
            } else {
                pos.stop_loss
            };
            if best != pos.best_price || stop != pos.stop_loss {
                return Some(TrailAdvance {
                    phase: TrailPhase::Chandelier,
                    stop,
                    best_price: best,
                });
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn position(side: Side, entry: f64, sl_pct: f64, trail_pct: f64) -> Position {
        let sign = side.sign();
        Position {
            id: "p1".into(),
            agent_id: "a1".into(),
            symbol: "BTCUSDT".into(),
            side,
            entry_price: entry,
            size: 1.0,
            leverage: 10,
            margin: 100.0,
            stop_loss: entry * (1.0 - sign * sl_pct / 100.0),
            take_profit: entry * (1.0 + sign * sl_pct * 3.0 / 100.0),
            liquidation_price: liquidation_price(entry, 10, side),
            trail_pct,
            trail_phase: TrailPhase::Inactive,
            best_price: entry,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn liquidation_long_10x_is_91pct_of_entry() {
        let liq = liquidation_price(100.0, 10, Side::Long);
        assert!((liq - 91.0).abs() < 1e-9);
    }

    #[test]
    fn liquidation_short_10x_is_109pct_of_entry() {
        let liq = liquidation_price(100.0, 10, Side::Short);
        assert!((liq - 109.0).abs() < 1e-9);
    }

    #[test]
    fn liquidation_1x_long_never_above_entry() {
        // 1x long: liquidation at 10% of entry, effectively unreachable
        let liq = liquidation_price(100.0, 1, Side::Long);
        assert!((liq - 10.0).abs() < 1e-9);
    }

    #[test]
    fn margin_formula_basic() {
        // 1000 balance, 2% risk, 2% SL, 5x: 20 / (0.02*5) = 200
        let m = position_margin(1000.0, 2.0, 2.0, 5).unwrap();
        assert!((m - 200.0).abs() < 1e-9);
    }

    #[test]
    fn margin_caps_at_quarter_balance() {
        // Raw formula would exceed 25% of balance
        let m = position_margin(1000.0, 4.0, 1.0, 1).unwrap();
        assert!((m - 250.0).abs() < 1e-9);
    }

    #[test]
    fn dust_margin_rejected() {
        // Tiny risk with huge leverage computes below the $1 floor
        assert!(position_margin(50.0, 0.1, 10.0, 100).is_none());
    }

    #[test]
    fn zero_or_negative_inputs_reject() {
        assert!(position_margin(0.0, 2.0, 2.0, 5).is_none());
        assert!(position_margin(1000.0, 2.0, 0.0, 5).is_none());
        assert!(position_margin(1000.0, 2.0, 2.0, 0).is_none());
    }

    #[test]
    fn leverage_clamps_both_ends() {
        assert_eq!(clamp_leverage(3, 5, 20), 5);
        assert_eq!(clamp_leverage(50, 1, 20), 20);
        assert_eq!(clamp_leverage(7, 1, 20), 7);
        assert_eq!(clamp_leverage(0, 0, 20), 1);
    }

    #[test]
    fn risk_pct_respects_agent_band() {
        assert!((effective_risk_pct(2.5, Some(1.0), Some(2.0)) - 2.0).abs() < 1e-12);
        assert!((effective_risk_pct(0.5, Some(1.0), None) - 1.0).abs() < 1e-12);
        assert!((effective_risk_pct(2.5, None, None) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn one_r_move_arms_breakeven() {
        // Long 100, SL 2% → 98. At 102 the move is 1R: stop to entry.
        let pos = position(Side::Long, 100.0, 2.0, 3.0);
        let adv = advance_trail(&pos, 102.0).unwrap();
        assert_eq!(adv.phase, TrailPhase::Breakeven);
        assert!((adv.stop - 100.0).abs() < 1e-9);
    }

    #[test]
    fn breakeven_is_one_way() {
        let mut pos = position(Side::Long, 100.0, 2.0, 3.0);
        let adv = advance_trail(&pos, 102.0).unwrap();
        pos.trail_phase = adv.phase;
        pos.stop_loss = adv.stop;
        pos.best_price = adv.best_price;
        // Price falls back under 1R: no change, stop stays at entry
        assert!(advance_trail(&pos, 100.5).is_none());
        assert!((pos.stop_loss - 100.0).abs() < 1e-9);
    }

    #[test]
    fn chandelier_ratchets_and_only_tightens() {
        let mut pos = position(Side::Long, 100.0, 2.0, 3.0);
        // 5% favorable: straight into chandelier
        let adv = advance_trail(&pos, 105.0).unwrap();
        assert_eq!(adv.phase, TrailPhase::Chandelier);
        pos.trail_phase = adv.phase;
        pos.stop_loss = adv.stop;
        pos.best_price = adv.best_price;
        let first_stop = pos.stop_loss;

        // Higher high: stop tightens upward
        let adv = advance_trail(&pos, 110.0).unwrap();
        assert!(adv.stop > first_stop);
        assert!((adv.best_price - 110.0).abs() < 1e-9);
        pos.trail_phase = adv.phase;
        pos.stop_loss = adv.stop;
        pos.best_price = adv.best_price;

        // Pullback: best and stop hold
        assert!(advance_trail(&pos, 107.0).is_none());
        assert!((pos.best_price - 110.0).abs() < 1e-9);
    }

    #[test]
    fn short_chandelier_trails_downward() {
        let mut pos = position(Side::Short, 100.0, 2.0, 3.0);
        let adv = advance_trail(&pos, 95.0).unwrap();
        assert_eq!(adv.phase, TrailPhase::Chandelier);
        assert!(adv.stop < pos.stop_loss);
        pos.trail_phase = adv.phase;
        pos.stop_loss = adv.stop;
        pos.best_price = adv.best_price;

        let adv = advance_trail(&pos, 90.0).unwrap();
        assert!(adv.stop < pos.stop_loss);
        assert!((adv.best_price - 90.0).abs() < 1e-9);
    }

    #[test]
    fn negative_trail_pct_opts_out_forever() {
        let pos = position(Side::Long, 100.0, 2.0, -1.0);
        assert!(advance_trail(&pos, 150.0).is_none());
        assert!(advance_trail(&pos, 300.0).is_none());
    }
}
