//! Mean Reversion — longs oversold at the lower Bollinger band, shorts
//! overbought at the upper band, targets the band middle. Avoids strong
//! trending markets.

use common::Scores;

use crate::indicators::IndicatorBundle;
use crate::{ScoreCard, Strategy};

pub struct MeanReversion;

impl Strategy for MeanReversion {
    fn key(&self) -> &'static str {
        "mean_reversion"
    }

    fn score(&self, ind: &IndicatorBundle, _price: f64) -> ScoreCard {
        let cfg = self.config();
        let mut long = 0i32;
        let mut short = 0i32;
        let mut reasons: Vec<String> = Vec::new();

        // Bollinger band position
        if let Some(bb) = &ind.bb {
            if bb.pct_b <= 0.05 {
                long += 3;
                reasons.push(format!("Price at/below lower BB (%B={:.2})", bb.pct_b));
            } else if bb.pct_b <= 0.2 {
                long += 2;
                reasons.push(format!("Price near lower BB (%B={:.2})", bb.pct_b));
            } else if bb.pct_b >= 0.95 {
                short += 3;
                reasons.push(format!("Price at/above upper BB (%B={:.2})", bb.pct_b));
            } else if bb.pct_b >= 0.8 {
                short += 2;
                reasons.push(format!("Price near upper BB (%B={:.2})", bb.pct_b));
            }
        }

        // RSI extremes
        if let Some(rsi) = ind.rsi {
            if rsi < 25.0 {
                long += 3;
                reasons.push(format!("RSI deeply oversold ({rsi:.1})"));
            } else if rsi < 35.0 {
                long += 1;
                reasons.push(format!("RSI oversold zone ({rsi:.1})"));
            } else if rsi > 75.0 {
                short += 3;
                reasons.push(format!("RSI deeply overbought ({rsi:.1})"));
            } else if rsi > 65.0 {
                short += 1;
                reasons.push(format!("RSI overbought zone ({rsi:.1})"));
            }
        }

        // StochRSI for timing
        if let Some(stoch) = &ind.stoch_rsi {
            if stoch.oversold {
                long += 1;
                reasons.push(format!("StochRSI oversold ({:.0})", stoch.k));
            } else if stoch.overbought {
                short += 1;
                reasons.push(format!("StochRSI overbought ({:.0})", stoch.k));
            }
        }

        // Fading a strong trend is how mean reversion dies
        if let Some(adx) = &ind.adx {
            if adx.strong_trend {
                long = (long - 2).max(0);
                short = (short - 2).max(0);
                reasons.push(format!("Strong trend (ADX {:.0}) - reducing confidence", adx.value));
            }
        }

        let atr_pct = ind.atr_pct.unwrap_or(2.0);
        let sl = (atr_pct * 1.5).max(2.0);
        let tp = (atr_pct * 2.5).max(4.0);
        let trail = (atr_pct * cfg.trail_atr_mult).max(sl);

        ScoreCard::new(Scores { long, short }, reasons, sl, tp, trail)
    }
}
