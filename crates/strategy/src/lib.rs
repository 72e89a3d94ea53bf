pub mod config;
pub mod indicators;
pub mod profile;
pub mod registry;
pub mod signal;
pub mod strategies;

pub use config::{Style, StrategyConfig};
pub use indicators::IndicatorBundle;
pub use profile::IndicatorProfile;
pub use registry::StrategyRegistry;
pub use signal::{build_signal, ScoreCard};

use common::Signal;

/// What the evaluating strategy knows about the agent's existing exposure
/// on the symbol under evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionContext {
    pub has_long: bool,
    pub has_short: bool,
    /// Entry price of the held long, 0.0 when none. Tracked per side so
    /// exit math stays correct when both sides are open on one symbol.
    pub entry_long: f64,
    /// Entry price of the held short, 0.0 when none.
    pub entry_short: f64,
}

impl PositionContext {
    pub fn flat() -> Self {
        Self::default()
    }
}

/// All strategy implementations must satisfy this trait.
///
/// `score` is the per-strategy layer accumulation; `evaluate` and
/// `check_exit` are provided methods built on the shared signal builder,
/// overridable where a variant wants different entry or exit policy.
/// New strategies are added by implementing this trait and registering
/// the type — the shared builder is never modified for a new variant.
pub trait Strategy: Send + Sync {
    /// Registry key, e.g. "trend_rider".
    fn key(&self) -> &'static str;

    fn config(&self) -> &'static StrategyConfig {
        config::get(self.key())
    }

    /// Accumulate long/short scores across this strategy's layers and
    /// derive ATR-based stop distances.
    fn score(&self, ind: &IndicatorBundle, price: f64) -> ScoreCard;

    /// Full evaluation: scores plus the shared entry/exit signal policy.
    /// Never fails on odd-but-valid input; degraded data yields neutral.
    fn evaluate(&self, ind: &IndicatorBundle, price: f64, ctx: &PositionContext) -> Signal {
        let card = self.score(ind, price);
        build_signal(&card, self.config(), ctx, price)
    }

    /// Exit check for an existing position. Default policy: close on a
    /// reversal whose opposing score crosses the entry threshold, or on
    /// SL/TP breach — exactly what `evaluate` produces for a held side.
    fn check_exit(
        &self,
        ind: &IndicatorBundle,
        price: f64,
        ctx: &PositionContext,
    ) -> Option<Signal> {
        let sig = self.evaluate(ind, price, ctx);
        sig.is_exit().then_some(sig)
    }
}
