//! The periodic decision loop: every cycle, each active agent first
//! re-checks its open positions for strategy exits, then scans its
//! candidate symbols for the best new entry. All market-data work happens
//! outside the ledger gate; the gate is taken only to mutate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use common::{CloseReason, Direction, Error, MarketFeed, Position, Result, Side, Signal};
use ledger::{clamp_leverage, effective_risk_pct, position_margin, Ledger, OpenRequest};
use risk::Watchlist;
use strategy::{IndicatorBundle, IndicatorProfile, PositionContext, Strategy, StrategyRegistry};

/// Sliding candle window handed to the indicator library.
const MAX_CANDLES: usize = 200;

/// The adjuster may move confidence by at most this much either way.
const ADJUST_CLAMP: f64 = 0.15;

/// Optional second opinion on a proposed entry (an LLM, a regime filter).
/// Absent or failing, the signal's own confidence stands.
#[async_trait]
pub trait ConfidenceAdjuster: Send + Sync {
    async fn adjust(&self, symbol: &str, signal: &Signal) -> Result<f64>;
}

/// Clamp an adjusted confidence to ±15 points around the original, and
/// into the valid range.
fn clamp_adjusted(original: f64, adjusted: f64) -> f64 {
    adjusted
        .clamp(original - ADJUST_CLAMP, original + ADJUST_CLAMP)
        .clamp(0.0, 0.95)
}

/// Read-only view of one agent, snapshotted under the gate once per cycle
/// so scanning runs against a consistent picture without holding it.
struct AgentView {
    agent_id: String,
    strategy_key: String,
    min_leverage: u32,
    risk_pct_min: Option<f64>,
    risk_pct_max: Option<f64>,
    trailing_enabled: bool,
    symbols: Vec<String>,
    positions: Vec<Position>,
}

pub struct DecisionLoop {
    ledger: Arc<Ledger>,
    feed: Arc<dyn MarketFeed>,
    registry: Arc<StrategyRegistry>,
    watchlist: Arc<Watchlist>,
    /// Global scan list for agents without their own.
    symbols: Vec<String>,
    interval: Duration,
    adjuster: Option<Arc<dyn ConfidenceAdjuster>>,
}

impl DecisionLoop {
    pub fn new(
        ledger: Arc<Ledger>,
        feed: Arc<dyn MarketFeed>,
        registry: Arc<StrategyRegistry>,
        watchlist: Arc<Watchlist>,
        symbols: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            feed,
            registry,
            watchlist,
            symbols,
            interval,
            adjuster: None,
        }
    }

    pub fn with_adjuster(mut self, adjuster: Arc<dyn ConfidenceAdjuster>) -> Self {
        self.adjuster = Some(adjuster);
        self
    }

    /// Run decision cycles forever. Call from `tokio::spawn`.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            symbols = self.symbols.len(),
            "DecisionLoop running"
        );
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.cycle().await;
        }
    }

    /// One full pass over all active agents. A failing agent is logged
    /// and never aborts the others.
    pub async fn cycle(&self) {
        let agents = self.snapshot_agents().await;
        for agent in agents {
            if let Err(e) = self.agent_cycle(&agent).await {
                warn!(agent = %agent.agent_id, error = %e, "Agent cycle failed");
            }
        }
    }

    async fn snapshot_agents(&self) -> Vec<AgentView> {
        let state = self.ledger.lock().await;
        state
            .accounts
            .values()
            .filter(|a| a.active)
            .map(|a| AgentView {
                agent_id: a.agent_id.clone(),
                strategy_key: a.strategy.clone(),
                min_leverage: a.min_leverage,
                risk_pct_min: a.risk_pct_min,
                risk_pct_max: a.risk_pct_max,
                trailing_enabled: a.trailing_enabled,
                symbols: a.symbols.clone(),
                positions: state
                    .positions_for_agent(&a.agent_id)
                    .into_iter()
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    async fn agent_cycle(&self, agent: &AgentView) -> Result<()> {
        let strategy = self.registry.resolve(&agent.strategy_key);
        let cfg = strategy.config();
        let profile = IndicatorProfile::for_interval(cfg.kline_interval);

        // ── Exit checks on open positions ────────────────────────────────
        let mut still_open = agent.positions.len();
        for pos in &agent.positions {
            match self.check_exit(strategy, &profile, pos).await {
                Ok(true) => still_open -= 1,
                Ok(false) => {}
                Err(e) => {
                    debug!(
                        agent = %agent.agent_id,
                        symbol = %pos.symbol,
                        error = %e,
                        "Exit check failed, position keeps its protective stops"
                    );
                }
            }
        }

        // ── Entry scan ───────────────────────────────────────────────────
        if still_open >= cfg.max_positions as usize {
            debug!(agent = %agent.agent_id, open = still_open, "At position cap, no scan");
            return Ok(());
        }

        let candidates = if agent.symbols.is_empty() {
            &self.symbols
        } else {
            &agent.symbols
        };

        let mut best: Option<(String, Signal)> = None;
        for symbol in candidates.iter().take(cfg.scan_limit) {
            let ctx = context_for(agent, symbol);
            match self.scan_symbol(strategy, &profile, symbol, &ctx).await {
                Ok(Some(sig)) => {
                    if best.as_ref().map_or(true, |(_, b)| sig.confidence > b.confidence) {
                        best = Some((symbol.clone(), sig));
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(symbol = %symbol, error = %e, "Scan failed for symbol"),
            }
        }

        // No candidate cleared the bar: a quiet cycle, not an error.
        let Some((symbol, mut signal)) = best else {
            return Ok(());
        };

        if let Some(adjuster) = &self.adjuster {
            match adjuster.adjust(&symbol, &signal).await {
                Ok(adjusted) => {
                    let clamped = clamp_adjusted(signal.confidence, adjusted);
                    debug!(
                        symbol = %symbol,
                        original = signal.confidence,
                        adjusted = clamped,
                        "Confidence adjusted"
                    );
                    signal.confidence = clamped;
                }
                Err(e) => debug!(error = %e, "Adjuster failed, keeping raw confidence"),
            }
        }
        if signal.confidence < cfg.min_confidence {
            debug!(
                agent = %agent.agent_id,
                symbol = %symbol,
                confidence = signal.confidence,
                "Adjusted confidence under floor, trade dropped"
            );
            return Ok(());
        }

        self.open_from_signal(agent, &symbol, &signal, cfg).await
    }

    /// Exit check for one position. Returns true when it closed.
    async fn check_exit(
        &self,
        strategy: &dyn Strategy,
        profile: &IndicatorProfile,
        pos: &Position,
    ) -> Result<bool> {
        let cfg = strategy.config();
        let candles = self
            .feed
            .ohlc(&pos.symbol, cfg.kline_interval, MAX_CANDLES)
            .await?;
        if candles.is_empty() {
            return Ok(false);
        }
        let bundle = IndicatorBundle::compute(&candles, profile);
        let price = self.feed.mark_price(&pos.symbol).await?;
        let ctx = match pos.side {
            Side::Long => PositionContext {
                has_long: true,
                entry_long: pos.entry_price,
                ..PositionContext::flat()
            },
            Side::Short => PositionContext {
                has_short: true,
                entry_short: pos.entry_price,
                ..PositionContext::flat()
            },
        };

        let Some(signal) = strategy.check_exit(&bundle, price, &ctx) else {
            return Ok(false);
        };

        info!(
            agent = %pos.agent_id,
            symbol = %pos.symbol,
            side = %pos.side,
            reasoning = %signal.reasoning,
            "Strategy exit"
        );
        let mut state = self.ledger.lock().await;
        match self
            .ledger
            .close_position(&mut state, &pos.id, price, CloseReason::Signal)
        {
            Ok(_) => {
                self.watchlist.rebuild(&state).await;
                Ok(true)
            }
            // The monitor got there first; nothing to do
            Err(Error::UnknownPosition(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    async fn scan_symbol(
        &self,
        strategy: &dyn Strategy,
        profile: &IndicatorProfile,
        symbol: &str,
        ctx: &PositionContext,
    ) -> Result<Option<Signal>> {
        let cfg = strategy.config();
        let candles = self.feed.ohlc(symbol, cfg.kline_interval, MAX_CANDLES).await?;
        if candles.is_empty() {
            return Ok(None);
        }
        let bundle = IndicatorBundle::compute(&candles, profile);
        let signal = strategy.evaluate(&bundle, bundle.current_price, ctx);
        Ok(signal.is_entry().then_some(signal))
    }

    async fn open_from_signal(
        &self,
        agent: &AgentView,
        symbol: &str,
        signal: &Signal,
        cfg: &strategy::StrategyConfig,
    ) -> Result<()> {
        let side = match signal.direction {
            Direction::Long => Side::Long,
            Direction::Short => Side::Short,
            _ => return Ok(()),
        };
        let leverage = clamp_leverage(signal.leverage, agent.min_leverage, cfg.max_leverage);
        let risk_pct =
            effective_risk_pct(cfg.risk_per_trade_pct, agent.risk_pct_min, agent.risk_pct_max);
        let entry_price = self.feed.mark_price(symbol).await?;

        let mut state = self.ledger.lock().await;
        let balance = state.account(&agent.agent_id)?.balance;
        let Some(margin) = position_margin(balance, risk_pct, signal.stop_loss_pct, leverage)
        else {
            debug!(
                agent = %agent.agent_id,
                symbol = %symbol,
                balance = balance,
                "Sizing under dust floor, trade rejected"
            );
            return Ok(());
        };

        let position = self.ledger.open_position(
            &mut state,
            OpenRequest {
                agent_id: agent.agent_id.clone(),
                symbol: symbol.to_string(),
                side,
                entry_price,
                leverage,
                margin,
                stop_loss_pct: signal.stop_loss_pct,
                take_profit_pct: signal.take_profit_pct,
                trail_pct: if agent.trailing_enabled {
                    signal.trail_pct
                } else {
                    -1.0
                },
            },
        )?;
        self.watchlist.rebuild(&state).await;

        info!(
            agent = %agent.agent_id,
            symbol = %symbol,
            side = %position.side,
            confidence = signal.confidence,
            reasoning = %signal.reasoning,
            "Entry taken"
        );
        Ok(())
    }
}

fn context_for(agent: &AgentView, symbol: &str) -> PositionContext {
    let mut ctx = PositionContext::flat();
    for pos in agent.positions.iter().filter(|p| p.symbol == symbol) {
        match pos.side {
            Side::Long => {
                ctx.has_long = true;
                ctx.entry_long = pos.entry_price;
            }
            Side::Short => {
                ctx.has_short = true;
                ctx.entry_short = pos.entry_price;
            }
        }
    }
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubFeed;
    use ledger::Account;

    fn account(agent_id: &str, strategy: &str, balance: f64) -> Account {
        Account {
            agent_id: agent_id.into(),
            name: agent_id.into(),
            strategy: strategy.into(),
            balance,
            active: true,
            min_leverage: 1,
            risk_pct_min: None,
            risk_pct_max: None,
            trailing_enabled: true,
            symbols: Vec::new(),
        }
    }

    #[test]
    fn adjuster_clamps_to_fifteen_points() {
        assert!((clamp_adjusted(0.60, 0.90) - 0.75).abs() < 1e-12);
        assert!((clamp_adjusted(0.60, 0.10) - 0.45).abs() < 1e-12);
        assert!((clamp_adjusted(0.60, 0.65) - 0.65).abs() < 1e-12);
        // Never above the global confidence cap
        assert!(clamp_adjusted(0.93, 1.5) <= 0.95);
        assert!(clamp_adjusted(0.05, -1.0) >= 0.0);
    }

    #[tokio::test]
    async fn empty_scan_is_a_quiet_cycle_not_an_error() {
        // Feed has no candles and no prices: every scan degrades to
        // nothing, the cycle completes, the ledger is untouched.
        let ledger = Arc::new(Ledger::new(vec![account("a1", "trend_rider", 1000.0)]));
        let feed = Arc::new(StubFeed::new());
        let dl = DecisionLoop::new(
            ledger.clone(),
            feed,
            Arc::new(StrategyRegistry::new()),
            Arc::new(Watchlist::new()),
            vec!["BTCUSDT".into(), "ETHUSDT".into()],
            Duration::from_secs(60),
        );

        dl.cycle().await;

        let state = ledger.lock().await;
        assert!(state.positions.is_empty());
        assert!((state.account("a1").unwrap().balance - 1000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn inactive_agents_are_not_cycled() {
        let mut acc = account("a1", "trend_rider", 1000.0);
        acc.active = false;
        let ledger = Arc::new(Ledger::new(vec![acc]));
        let dl = DecisionLoop::new(
            ledger.clone(),
            Arc::new(StubFeed::new()),
            Arc::new(StrategyRegistry::new()),
            Arc::new(Watchlist::new()),
            vec!["BTCUSDT".into()],
            Duration::from_secs(60),
        );
        assert!(dl.snapshot_agents().await.is_empty());
    }

    fn position(symbol: &str, side: Side, entry: f64) -> Position {
        Position {
            id: format!("{symbol}-{side}"),
            agent_id: "a1".into(),
            symbol: symbol.into(),
            side,
            entry_price: entry,
            size: 1.0,
            leverage: 5,
            margin: 100.0,
            stop_loss: entry * 0.98,
            take_profit: entry * 1.06,
            liquidation_price: entry * 0.82,
            trail_pct: 3.0,
            trail_phase: common::TrailPhase::Inactive,
            best_price: entry,
            opened_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn context_reflects_held_sides() {
        let mut agent = AgentView {
            agent_id: "a1".into(),
            strategy_key: "trend_rider".into(),
            min_leverage: 1,
            risk_pct_min: None,
            risk_pct_max: None,
            trailing_enabled: true,
            symbols: Vec::new(),
            positions: Vec::new(),
        };
        let ctx = context_for(&agent, "BTCUSDT");
        assert!(!ctx.has_long && !ctx.has_short);
        assert_eq!(ctx.entry_long, 0.0);
        assert_eq!(ctx.entry_short, 0.0);

        // A hedged symbol keeps each side's own entry
        agent.positions = vec![
            position("BTCUSDT", Side::Long, 100.0),
            position("BTCUSDT", Side::Short, 110.0),
            position("ETHUSDT", Side::Long, 2000.0),
        ];
        let ctx = context_for(&agent, "BTCUSDT");
        assert!(ctx.has_long && ctx.has_short);
        assert_eq!(ctx.entry_long, 100.0);
        assert_eq!(ctx.entry_short, 110.0);
    }
}
