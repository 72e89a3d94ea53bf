//! Grid Trader — systematic positions at regular ATR-sized intervals from
//! the mid SMA, profiting from oscillation around the mean. Best in
//! sideways markets; backs off when a squeeze hints at a breakout.

use common::Scores;

use crate::indicators::IndicatorBundle;
use crate::{ScoreCard, Strategy};

pub struct GridTrader;

impl Strategy for GridTrader {
    fn key(&self) -> &'static str {
        "grid_trader"
    }

    fn score(&self, ind: &IndicatorBundle, price: f64) -> ScoreCard {
        let cfg = self.config();
        let mut long = 0i32;
        let mut short = 0i32;
        let mut reasons: Vec<String> = Vec::new();
        let atr_pct = ind.atr_pct.unwrap_or(2.0);

        // Grid levels: deviation from the mid SMA in ATR-sized steps
        if let Some(sma21) = ind.sma_mid.filter(|s| *s > 0.0) {
            let deviation = (price - sma21) / sma21 * 100.0;
            let grid_step = atr_pct.max(1.5);

            if deviation < -grid_step * 2.0 {
                long += 3;
                reasons.push(format!("Price {deviation:.1}% below SMA21 - deep grid buy"));
            } else if deviation < -grid_step {
                long += 2;
                reasons.push(format!("Price {deviation:.1}% below SMA21 - grid buy"));
            } else if deviation > grid_step * 2.0 {
                short += 3;
                reasons.push(format!("Price +{deviation:.1}% above SMA21 - deep grid sell"));
            } else if deviation > grid_step {
                short += 2;
                reasons.push(format!("Price +{deviation:.1}% above SMA21 - grid sell"));
            }
        }

        // A squeeze precedes breakouts, which is when grids get run over
        if let Some(bb) = &ind.bb {
            if bb.squeeze {
                reasons.push("BB squeeze - expect breakout, reduce grid size".into());
                long = (long - 1).max(0);
                short = (short - 1).max(0);
            }
        }

        if let Some(rsi) = ind.rsi {
            if rsi < 30.0 {
                long += 1;
            } else if rsi > 70.0 {
                short += 1;
            }
        }

        // Wide stop, modest target: the grid wins on frequency, not size
        let sl = (atr_pct * 3.0).max(4.0);
        let tp = (atr_pct * 1.5).max(2.5);
        let trail = (atr_pct * cfg.trail_atr_mult).max(sl);

        ScoreCard::new(Scores { long, short }, reasons, sl, tp, trail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorBundle;
    use crate::profile::IndicatorProfile;
    use chrono::Utc;
    use common::{Candle, KlineInterval};

    fn bundle(closes: impl Iterator<Item = f64>) -> IndicatorBundle {
        let candles: Vec<Candle> = closes
            .map(|c| Candle {
                open_time: Utc::now(),
                open: c,
                high: c * 1.002,
                low: c * 0.998,
                close: c,
                volume: 1000.0,
            })
            .collect();
        IndicatorBundle::compute(&candles, &IndicatorProfile::for_interval(KlineInterval::H1))
    }

    #[test]
    fn price_far_below_mean_scores_grid_buy() {
        // Stable range then a sharp dislocation below the mean
        let mut closes: Vec<f64> = (0..80).map(|_| 100.0).collect();
        closes.extend([94.0, 93.0, 92.0]);
        let b = bundle(closes.into_iter());
        let price = 92.0;
        let card = GridTrader.score(&b, price);
        assert!(card.scores.long >= 2, "L={}", card.scores.long);
        assert!(card.scores.long > card.scores.short);
    }

    #[test]
    fn stop_is_wider_than_target() {
        let b = bundle((0..80).map(|_| 100.0));
        let card = GridTrader.score(&b, 100.0);
        assert!(card.stop_loss_pct > card.take_profit_pct);
        assert!(card.stop_loss_pct >= 4.0);
        assert!(card.take_profit_pct >= 2.5);
    }

    #[test]
    fn price_at_mean_is_flat() {
        let b = bundle((0..80).map(|_| 100.0));
        let card = GridTrader.score(&b, 100.0);
        assert_eq!(card.scores.long, 0);
        assert_eq!(card.scores.short, 0);
    }
}
