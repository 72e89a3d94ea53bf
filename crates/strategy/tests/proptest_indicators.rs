use chrono::Utc;
use proptest::prelude::*;

use common::{Candle, KlineInterval};
use strategy::indicators::{atr, bollinger, rsi, stoch_rsi};
use strategy::{IndicatorBundle, IndicatorProfile};

fn candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .map(|&c| Candle {
            open_time: Utc::now(),
            open: c,
            high: c * 1.01,
            low: c * 0.99,
            close: c,
            volume: 1000.0,
        })
        .collect()
}

proptest! {
    /// RSI is a bounded oscillator whatever the price path looks like.
    #[test]
    fn rsi_stays_within_bounds(
        closes in proptest::collection::vec(0.01f64..50_000.0, 0..220),
        period in 2usize..30,
    ) {
        if let Some(value) = rsi::rsi(&closes, period) {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn stoch_rsi_lines_stay_within_bounds(
        closes in proptest::collection::vec(0.01f64..50_000.0, 30..220),
    ) {
        if let Some(s) = stoch_rsi::stoch_rsi(&closes, 14, 14, 3) {
            prop_assert!((0.0..=100.0).contains(&s.k));
            prop_assert!((0.0..=100.0).contains(&s.d));
            prop_assert!(!(s.oversold && s.overbought));
        }
    }

    /// Band ordering holds for any window: lower <= mid <= upper, and a
    /// price inside the bands maps to pct_b inside [0, 1].
    #[test]
    fn bollinger_bands_are_ordered(
        closes in proptest::collection::vec(1.0f64..10_000.0, 20..220),
    ) {
        if let Some(bb) = bollinger::bollinger(&closes, 20, 2.0) {
            prop_assert!(bb.lower <= bb.mid);
            prop_assert!(bb.mid <= bb.upper);
            prop_assert!(bb.width_pct >= 0.0);
        }
    }

    #[test]
    fn atr_is_never_negative(
        closes in proptest::collection::vec(1.0f64..10_000.0, 0..220),
        period in 2usize..30,
    ) {
        let cs = candles(&closes);
        if let Some(value) = atr::atr(&cs, period) {
            prop_assert!(value >= 0.0);
        }
        if let Some(pct) = atr::atr_pct(&cs, period) {
            prop_assert!(pct >= 0.0);
        }
    }

    /// Any window length yields a bundle: too-short windows degrade to
    /// `None` fields instead of panicking, and the current price always
    /// mirrors the last close.
    #[test]
    fn bundle_degrades_gracefully_on_any_window(
        closes in proptest::collection::vec(0.01f64..50_000.0, 0..80),
    ) {
        let cs = candles(&closes);
        let profile = IndicatorProfile::for_interval(KlineInterval::H1);
        let bundle = IndicatorBundle::compute(&cs, &profile);
        match closes.last() {
            Some(&last) => prop_assert_eq!(bundle.current_price, last),
            None => prop_assert_eq!(bundle.current_price, 0.0),
        }
        if closes.len() < profile.rsi_period + 1 {
            prop_assert!(bundle.rsi.is_none());
        }
        if closes.len() < profile.macd_slow {
            prop_assert!(bundle.macd.is_none());
        }
    }
}
