use std::collections::HashMap;

use tracing::info;

use crate::config;
use crate::strategies::{
    ConfluenceMaster, GridTrader, MeanReversion, MomentumSniper, Scalper, TrendRider,
};
use crate::Strategy;

/// Holds one instance of every strategy variant, keyed for agent lookup.
pub struct StrategyRegistry {
    strategies: HashMap<&'static str, Box<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Build the full registry, one instance per config entry, exiting on
    /// an entry without a matching implementation.
    pub fn new() -> Self {
        let mut strategies: HashMap<&'static str, Box<dyn Strategy>> = HashMap::new();

        for cfg in config::STRATEGIES {
            let strategy = build_strategy(cfg.key)
                .unwrap_or_else(|| panic!("Unknown strategy key '{}'", cfg.key));
            info!(key = cfg.key, name = cfg.name, style = ?cfg.style, "Registered strategy");
            strategies.insert(cfg.key, strategy);
        }

        Self { strategies }
    }

    /// Look up a strategy by key. Panics on an unknown key: agent config
    /// referencing a nonexistent strategy is a deployment error, caught
    /// at startup.
    pub fn resolve(&self, key: &str) -> &dyn Strategy {
        self.strategies
            .get(key)
            .unwrap_or_else(|| panic!("Unknown strategy key '{key}'"))
            .as_ref()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.strategies.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.strategies.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &dyn Strategy)> + '_ {
        self.strategies.iter().map(|(k, s)| (*k, s.as_ref()))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Strategy builders ────────────────────────────────────────────────────────

fn build_strategy(key: &'static str) -> Option<Box<dyn Strategy>> {
    let strategy: Box<dyn Strategy> = match key {
        "trend_rider" => Box::new(TrendRider),
        "mean_reversion" => Box::new(MeanReversion),
        "momentum_sniper" => Box::new(MomentumSniper),
        "grid_trader" => Box::new(GridTrader),
        "confluence_master" => Box::new(ConfluenceMaster),
        "scalper" | "scalper_1m" | "scalper_3m" | "scalper_5m" | "scalper_15m" => {
            Box::new(Scalper::new(key))
        }
        _ => return None,
    };
    Some(strategy)
}
