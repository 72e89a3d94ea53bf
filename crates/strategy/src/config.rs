use common::KlineInterval;

/// Trading style of a strategy. Used for logging and agent display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Trend,
    MeanReversion,
    Momentum,
    Scalping,
    Grid,
    Confluence,
}

/// Immutable per-strategy tuning. One entry per registry key, compiled in.
///
/// The score thresholds and confidence divisors are deliberate per-style
/// tuning constants, not derived values: scalpers divide by 8 and act from
/// score 2 to trade more often; everything else divides by 10 and needs 3.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub key: &'static str,
    pub name: &'static str,
    pub style: Style,
    pub default_leverage: u32,
    pub max_leverage: u32,
    /// Max concurrent open positions per agent running this strategy.
    pub max_positions: usize,
    /// Percent of balance risked per trade (before agent overrides).
    pub risk_per_trade_pct: f64,
    /// Minimum confidence to open a new position.
    pub min_confidence: f64,
    /// Chandelier trail distance in ATR multiples.
    pub trail_atr_mult: f64,
    pub kline_interval: KlineInterval,
    /// Candidate coins scanned per decision cycle.
    pub scan_limit: usize,
    /// Minimum winning-side score to act on.
    pub min_score: i32,
    /// Required lead of the winning side over the losing side.
    pub min_score_lead: i32,
    /// Confidence = winning score / this divisor, capped at 0.95.
    pub confidence_divisor: f64,
}

pub static STRATEGIES: &[StrategyConfig] = &[
    StrategyConfig {
        key: "trend_rider",
        name: "Trend Rider",
        style: Style::Trend,
        default_leverage: 3,
        max_leverage: 5,
        max_positions: 3,
        risk_per_trade_pct: 2.5,
        min_confidence: 0.55,
        trail_atr_mult: 3.0,
        kline_interval: KlineInterval::H1,
        scan_limit: 10,
        min_score: 3,
        min_score_lead: 1,
        confidence_divisor: 10.0,
    },
    StrategyConfig {
        key: "mean_reversion",
        name: "Mean Reversion",
        style: Style::MeanReversion,
        default_leverage: 2,
        max_leverage: 3,
        max_positions: 4,
        risk_per_trade_pct: 1.5,
        min_confidence: 0.50,
        trail_atr_mult: 2.0,
        kline_interval: KlineInterval::H1,
        scan_limit: 10,
        min_score: 3,
        min_score_lead: 1,
        confidence_divisor: 10.0,
    },
    StrategyConfig {
        key: "momentum_sniper",
        name: "Momentum Sniper",
        style: Style::Momentum,
        default_leverage: 4,
        max_leverage: 7,
        max_positions: 2,
        risk_per_trade_pct: 2.5,
        min_confidence: 0.60,
        trail_atr_mult: 2.5,
        kline_interval: KlineInterval::H1,
        scan_limit: 10,
        min_score: 3,
        min_score_lead: 1,
        confidence_divisor: 10.0,
    },
    StrategyConfig {
        key: "scalper",
        name: "Scalper Pro",
        style: Style::Scalping,
        default_leverage: 5,
        max_leverage: 10,
        max_positions: 5,
        risk_per_trade_pct: 4.0,
        min_confidence: 0.50,
        trail_atr_mult: 2.5,
        kline_interval: KlineInterval::H1,
        scan_limit: 10,
        min_score: 2,
        min_score_lead: 1,
        confidence_divisor: 8.0,
    },
    StrategyConfig {
        key: "scalper_1m",
        name: "Scalper Pro 1m",
        style: Style::Scalping,
        default_leverage: 10,
        max_leverage: 20,
        max_positions: 5,
        risk_per_trade_pct: 2.0,
        min_confidence: 0.50,
        trail_atr_mult: 1.5,
        kline_interval: KlineInterval::M1,
        scan_limit: 6,
        min_score: 2,
        min_score_lead: 1,
        confidence_divisor: 8.0,
    },
    StrategyConfig {
        key: "scalper_3m",
        name: "Scalper Pro 3m",
        style: Style::Scalping,
        default_leverage: 8,
        max_leverage: 15,
        max_positions: 5,
        risk_per_trade_pct: 2.5,
        min_confidence: 0.50,
        trail_atr_mult: 1.8,
        kline_interval: KlineInterval::M3,
        scan_limit: 6,
        min_score: 2,
        min_score_lead: 1,
        confidence_divisor: 8.0,
    },
    StrategyConfig {
        key: "scalper_5m",
        name: "Scalper Pro 5m",
        style: Style::Scalping,
        default_leverage: 7,
        max_leverage: 12,
        max_positions: 5,
        risk_per_trade_pct: 3.0,
        min_confidence: 0.50,
        trail_atr_mult: 2.0,
        kline_interval: KlineInterval::M5,
        scan_limit: 8,
        min_score: 2,
        min_score_lead: 1,
        confidence_divisor: 8.0,
    },
    StrategyConfig {
        key: "scalper_15m",
        name: "Scalper Pro 15m",
        style: Style::Scalping,
        default_leverage: 6,
        max_leverage: 10,
        max_positions: 5,
        risk_per_trade_pct: 3.5,
        min_confidence: 0.50,
        trail_atr_mult: 2.2,
        kline_interval: KlineInterval::M15,
        scan_limit: 8,
        min_score: 2,
        min_score_lead: 1,
        confidence_divisor: 8.0,
    },
    StrategyConfig {
        key: "grid_trader",
        name: "Grid Trader",
        style: Style::Grid,
        default_leverage: 2,
        max_leverage: 3,
        max_positions: 8,
        risk_per_trade_pct: 1.0,
        min_confidence: 0.40,
        trail_atr_mult: 2.0,
        kline_interval: KlineInterval::H1,
        scan_limit: 10,
        min_score: 3,
        min_score_lead: 1,
        confidence_divisor: 10.0,
    },
    StrategyConfig {
        key: "confluence_master",
        name: "Confluence Master",
        style: Style::Confluence,
        default_leverage: 5,
        max_leverage: 10,
        max_positions: 2,
        risk_per_trade_pct: 3.0,
        min_confidence: 0.70,
        trail_atr_mult: 2.5,
        kline_interval: KlineInterval::H1,
        scan_limit: 10,
        min_score: 5,
        min_score_lead: 1,
        confidence_divisor: 10.0,
    },
];

/// Resolve a strategy key to its config. An unknown key is a programming
/// error wired in at startup, so this panics rather than returning Result.
pub fn get(key: &str) -> &'static StrategyConfig {
    STRATEGIES
        .iter()
        .find(|c| c.key == key)
        .unwrap_or_else(|| panic!("Unknown strategy key '{key}'"))
}

pub fn keys() -> impl Iterator<Item = &'static str> {
    STRATEGIES.iter().map(|c| c.key)
}
