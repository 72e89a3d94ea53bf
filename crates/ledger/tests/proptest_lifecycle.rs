use chrono::Utc;
use common::{Position, Side, TrailPhase};
use ledger::{advance_trail, liquidation_price, position_margin};
use proptest::prelude::*;

fn make_position(side: Side, entry: f64, sl_pct: f64, trail_pct: f64) -> Position {
    let sign = side.sign();
    Position {
        id: "p1".into(),
        agent_id: "a1".into(),
        symbol: "TESTUSDT".into(),
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

proptest! {
    /// Long liquidation always sits below entry, short above, at exactly
    /// the 0.9/L fraction. Checked across the leverage tiers the agents
    /// actually use.
    #[test]
    fn liquidation_formula_holds(
        entry in 0.001f64..1_000_000.0f64,
        lev_idx in 0usize..5,
    ) {
        let leverage = [1u32, 5, 10, 50, 100][lev_idx];
        let l = leverage as f64;

        let long = liquidation_price(entry, leverage, Side::Long);
        prop_assert!((long - entry * (1.0 - 0.9 / l)).abs() < entry * 1e-12);
        prop_assert!(long < entry);

        let short = liquidation_price(entry, leverage, Side::Short);
        prop_assert!((short - entry * (1.0 + 0.9 / l)).abs() < entry * 1e-12);
        prop_assert!(short > entry);
    }

    /// Higher leverage always moves liquidation closer to entry.
    #[test]
    fn liquidation_tightens_with_leverage(entry in 0.001f64..1_000_000.0f64) {
        let mut prev = liquidation_price(entry, 1, Side::Long);
        for lev in [5u32, 10, 50, 100] {
            let liq = liquidation_price(entry, lev, Side::Long);
            prop_assert!(liq > prev);
            prev = liq;
        }
    }

    /// Sizing never commits more than a quarter of the balance and never
    /// returns dust below the floor.
    #[test]
    fn margin_respects_clamps(
        balance in 10.0f64..1_000_000.0f64,
        risk_pct in 0.1f64..5.0f64,
        sl_pct in 0.3f64..10.0f64,
        leverage in 1u32..100,
    ) {
        if let Some(margin) = position_margin(balance, risk_pct, sl_pct, leverage) {
            prop_assert!(margin <= balance * 0.25 + 1e-9);
            prop_assert!(margin >= (balance * 0.01).max(1.0) - 1e-9);
        }
    }

    /// Whatever the tick sequence, the trailing stop of a long never
    /// loosens and the best price never falls back.
    #[test]
    fn long_trail_is_monotonic(prices in proptest::collection::vec(50.0f64..200.0f64, 1..60)) {
        let mut pos = make_position(Side::Long, 100.0, 2.0, 3.0);
        let mut last_stop = pos.stop_loss;
        let mut last_best = pos.best_price;

        for price in prices {
            if let Some(adv) = advance_trail(&pos, price) {
                prop_assert!(adv.stop >= last_stop - 1e-9, "stop loosened: {} -> {}", last_stop, adv.stop);
                prop_assert!(adv.best_price >= last_best - 1e-9);
                pos.trail_phase = adv.phase;
                pos.stop_loss = adv.stop;
                pos.best_price = adv.best_price;
                last_stop = adv.stop;
                last_best = adv.best_price;
            }
        }
    }

    /// Mirror property for shorts: the stop only ever moves down.
    #[test]
    fn short_trail_is_monotonic(prices in proptest::collection::vec(50.0f64..200.0f64, 1..60)) {
        let mut pos = make_position(Side::Short, 100.0, 2.0, 3.0);
        let mut last_stop = pos.stop_loss;

        for price in prices {
            if let Some(adv) = advance_trail(&pos, price) {
                prop_assert!(adv.stop <= last_stop + 1e-9, "stop loosened: {} -> {}", last_stop, adv.stop);
                pos.trail_phase = adv.phase;
                pos.stop_loss = adv.stop;
                pos.best_price = adv.best_price;
                last_stop = adv.stop;
            }
        }
    }

    /// Trailing opt-out holds for any price.
    #[test]
    fn negative_trail_never_advances(price in 0.001f64..1_000_000.0f64) {
        let pos = make_position(Side::Long, 100.0, 2.0, -1.0);
        prop_assert!(advance_trail(&pos, price).is_none());
    }
}
