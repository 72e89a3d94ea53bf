use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle. Sequences are ordered oldest-first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle timeframe used when fetching OHLC data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlineInterval {
    M1,
    M3,
    M5,
    M15,
    H1,
}

impl KlineInterval {
    /// Exchange wire format, e.g. "1m", "1h".
    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::M1 => "1m",
            KlineInterval::M3 => "3m",
            KlineInterval::M5 => "5m",
            KlineInterval::M15 => "15m",
            KlineInterval::H1 => "1h",
        }
    }
}

impl std::fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for KlineInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(KlineInterval::M1),
            "3m" => Ok(KlineInterval::M3),
            "5m" => Ok(KlineInterval::M5),
            "15m" => Ok(KlineInterval::M15),
            "1h" => Ok(KlineInterval::H1),
            other => Err(format!("unknown kline interval '{other}'")),
        }
    }
}

/// Side of an open futures position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short. Used for direction-agnostic PnL math.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// Directional outcome of a strategy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
    CloseLong,
    CloseShort,
    Neutral,
}

/// Raw layer scores accumulated during an evaluation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Scores {
    pub long: i32,
    pub short: i32,
}

impl Scores {
    pub fn max(&self) -> i32 {
        self.long.max(self.short)
    }
}

/// Trading signal produced by one strategy evaluation.
/// Transient: consumed immediately by the position lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// 0.0 – 1.0, capped at 0.95 by the signal builder.
    pub confidence: f64,
    pub leverage: u32,
    /// Stop-loss distance from entry, in percent of entry price.
    pub stop_loss_pct: f64,
    /// Take-profit distance from entry, in percent of entry price.
    pub take_profit_pct: f64,
    /// ATR-based trailing distance in percent. Negative opts the position
    /// out of trailing for its whole life.
    pub trail_pct: f64,
    pub reasoning: String,
    pub scores: Scores,
}

impl Signal {
    pub fn neutral(reasoning: impl Into<String>) -> Self {
        Self {
            direction: Direction::Neutral,
            confidence: 0.0,
            leverage: 1,
            stop_loss_pct: 5.0,
            take_profit_pct: 10.0,
            trail_pct: 0.0,
            reasoning: reasoning.into(),
            scores: Scores::default(),
        }
    }

    /// True for signals that open a new position.
    pub fn is_entry(&self) -> bool {
        matches!(self.direction, Direction::Long | Direction::Short)
    }

    /// True for signals that close an existing position.
    pub fn is_exit(&self) -> bool {
        matches!(self.direction, Direction::CloseLong | Direction::CloseShort)
    }
}

/// Phase of the two-phase trailing stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum TrailPhase {
    /// Stop fixed at the original SL from the opening signal.
    Inactive,
    /// Stop moved to entry after a 1R favorable move. One-way.
    Breakeven,
    /// Stop trails the best price at an ATR-based distance, tightening only.
    Chandelier,
}

/// An open leveraged position in the virtual ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub agent_id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    /// Position size in base-asset units.
    pub size: f64,
    pub leverage: u32,
    /// Margin committed in quote currency (USD).
    pub margin: f64,
    /// Current stop-loss price (moves as the trail advances).
    pub stop_loss: f64,
    pub take_profit: f64,
    pub liquidation_price: f64,
    /// Trailing distance in percent; negative means trailing disabled.
    pub trail_pct: f64,
    pub trail_phase: TrailPhase,
    /// Best price reached since entry (highest for long, lowest for short).
    pub best_price: f64,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Unrealized PnL at `price` in quote currency.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size * self.side.sign()
    }

    /// Favorable price move from entry, in percent. Positive = in profit.
    pub fn favorable_move_pct(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        (price - self.entry_price) / self.entry_price * 100.0 * self.side.sign()
    }

    /// Stop-loss distance from entry in percent (the position's 1R).
    pub fn stop_distance_pct(&self) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        (self.entry_price - self.stop_loss).abs() / self.entry_price * 100.0
    }
}

/// Why a position was closed. Liquidations are urgent and flagged as such
/// in logs and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum CloseReason {
    Signal,
    StopLoss,
    TakeProfit,
    Liquidation,
    Manual,
}

impl CloseReason {
    pub fn is_urgent(&self) -> bool {
        matches!(self, CloseReason::Liquidation)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Signal => write!(f, "signal"),
            CloseReason::StopLoss => write!(f, "stop_loss"),
            CloseReason::TakeProfit => write!(f, "take_profit"),
            CloseReason::Liquidation => write!(f, "liquidation"),
            CloseReason::Manual => write!(f, "manual"),
        }
    }
}

/// Batch of mark prices delivered by the feed, keyed by symbol.
pub type TickBatch = HashMap<String, f64>;

/// Events broadcast outward by the core. Fire-and-forget: a slow or dead
/// subscriber never blocks the ledger.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    PositionOpened {
        position: Position,
    },
    PositionClosed {
        position: Position,
        exit_price: f64,
        pnl: f64,
        fee: f64,
        reason: CloseReason,
    },
    TrailAdvanced {
        agent_id: String,
        position_id: String,
        symbol: String,
        phase: TrailPhase,
        new_stop: f64,
    },
    AccountSnapshot {
        agent_id: String,
        balance: f64,
        equity: f64,
        open_positions: usize,
    },
}
