//! The virtual ledger: every agent's account and open positions behind a
//! single `tokio::sync::Mutex`. The decision loop awaits the lock; the
//! reactive monitor only ever `try_lock`s and skips on contention. All
//! mutations happen through methods that take the guard, so a caller can
//! compose several (check then close) atomically.

use std::collections::HashMap;

use tokio::sync::{broadcast, Mutex, MutexGuard, TryLockError};
use tracing::{info, warn};

use common::{
    CloseReason, EngineEvent, Error, Position, Result, Side, TickBatch, TrailPhase,
};

use crate::lifecycle::{self, TrailAdvance};

/// Flat taker fee applied to notional on each side of a trade.
pub const TAKER_FEE_RATE: f64 = 0.0004;

/// One simulated trading account, configured per agent.
#[derive(Debug, Clone)]
pub struct Account {
    pub agent_id: String,
    pub name: String,
    /// Strategy registry key this agent trades with.
    pub strategy: String,
    pub balance: f64,
    pub active: bool,
    pub min_leverage: u32,
    pub risk_pct_min: Option<f64>,
    pub risk_pct_max: Option<f64>,
    pub trailing_enabled: bool,
    /// Symbols this agent scans; empty means the global list.
    pub symbols: Vec<String>,
}

/// Everything an open needs, sized and clamped by the caller beforehand.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub agent_id: String,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub leverage: u32,
    pub margin: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Negative disables trailing for this position.
    pub trail_pct: f64,
}

/// Result of a close, echoed to the caller and broadcast as an event.
#[derive(Debug, Clone)]
pub struct ClosedTrade {
    pub position: Position,
    pub exit_price: f64,
    pub pnl: f64,
    pub fee: f64,
    /// Amount credited back to the account (0 on liquidation).
    pub returned: f64,
    pub reason: CloseReason,
}

/// Accounts and positions. Only reachable through the gate.
#[derive(Debug, Default)]
pub struct LedgerState {
    pub accounts: HashMap<String, Account>,
    pub positions: HashMap<String, Position>,
}

impl LedgerState {
    pub fn positions_for_agent(&self, agent_id: &str) -> Vec<&Position> {
        self.positions
            .values()
            .filter(|p| p.agent_id == agent_id)
            .collect()
    }

    /// The agent's open position on a symbol and side, if any.
    pub fn position_on(&self, agent_id: &str, symbol: &str, side: Side) -> Option<&Position> {
        self.positions
            .values()
            .find(|p| p.agent_id == agent_id && p.symbol == symbol && p.side == side)
    }

    pub fn account(&self, agent_id: &str) -> Result<&Account> {
        self.accounts
            .get(agent_id)
            .ok_or_else(|| Error::UnknownAgent(agent_id.to_string()))
    }
}

pub struct Ledger {
    state: Mutex<LedgerState>,
    events: broadcast::Sender<EngineEvent>,
}

impl Ledger {
    pub fn new(accounts: Vec<Account>) -> Self {
        let (events, _) = broadcast::channel(256);
        let accounts = accounts
            .into_iter()
            .map(|a| (a.agent_id.clone(), a))
            .collect();
        Self {
            state: Mutex::new(LedgerState {
                accounts,
                positions: HashMap::new(),
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Acquire the gate, waiting. Decision-loop side.
    pub async fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().await
    }

    /// Acquire the gate without waiting. Reactive-monitor side: on
    /// contention the caller skips the tick, it never queues.
    pub fn try_lock(&self) -> std::result::Result<MutexGuard<'_, LedgerState>, TryLockError> {
        self.state.try_lock()
    }

    /// Open a position: debit margin plus entry fee, insert, broadcast.
    pub fn open_position(&self, state: &mut LedgerState, req: OpenRequest) -> Result<Position> {
        let account = state.account(&req.agent_id)?;
        let notional = req.margin * req.leverage as f64;
        let fee = notional * TAKER_FEE_RATE;
        let cost = req.margin + fee;
        if cost > account.balance {
            return Err(Error::InsufficientBalance {
                needed: cost,
                available: account.balance,
            });
        }

        let sign = req.side.sign();
        let position = Position {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: req.agent_id.clone(),
            symbol: req.symbol.clone(),
            side: req.side,
            entry_price: req.entry_price,
            size: notional / req.entry_price,
            leverage: req.leverage,
            margin: req.margin,
            stop_loss: req.entry_price * (1.0 - sign * req.stop_loss_pct / 100.0),
            take_profit: req.entry_price * (1.0 + sign * req.take_profit_pct / 100.0),
            liquidation_price: lifecycle::liquidation_price(
                req.entry_price,
                req.leverage,
                req.side,
            ),
            trail_pct: req.trail_pct,
            trail_phase: TrailPhase::Inactive,
            best_price: req.entry_price,
            opened_at: chrono::Utc::now(),
        };

        let account = state
            .accounts
            .get_mut(&req.agent_id)
            .ok_or_else(|| Error::UnknownAgent(req.agent_id.clone()))?;
        account.balance -= cost;

        info!(
            agent = %position.agent_id,
            symbol = %position.symbol,
            side = %position.side,
            entry = position.entry_price,
            margin = position.margin,
            leverage = position.leverage,
            liq = position.liquidation_price,
            "Position opened"
        );

        state.positions.insert(position.id.clone(), position.clone());
        let _ = self.events.send(EngineEvent::PositionOpened {
            position: position.clone(),
        });
        Ok(position)
    }

    /// Close a position at `exit_price`. Liquidation forfeits the whole
    /// margin; every other reason credits `margin + pnl − exit fee`,
    /// floored at zero. The account balance never goes negative.
    pub fn close_position(
        &self,
        state: &mut LedgerState,
        position_id: &str,
        exit_price: f64,
        reason: CloseReason,
    ) -> Result<ClosedTrade> {
        let position = state
            .positions
            .remove(position_id)
            .ok_or_else(|| Error::UnknownPosition(position_id.to_string()))?;

        let pnl = position.unrealized_pnl(exit_price);
        let fee = exit_price * position.size * TAKER_FEE_RATE;
        let returned = if reason == CloseReason::Liquidation {
            0.0
        } else {
            (position.margin + pnl - fee).max(0.0)
        };

        if let Some(account) = state.accounts.get_mut(&position.agent_id) {
            account.balance += returned;
        }

        if reason.is_urgent() {
            warn!(
                agent = %position.agent_id,
                symbol = %position.symbol,
                side = %position.side,
                exit = exit_price,
                margin_lost = position.margin,
                "LIQUIDATED"
            );
        } else {
            info!(
                agent = %position.agent_id,
                symbol = %position.symbol,
                side = %position.side,
                exit = exit_price,
                pnl = pnl,
                reason = %reason,
                "Position closed"
            );
        }

        let trade = ClosedTrade {
            position: position.clone(),
            exit_price,
            pnl,
            fee,
            returned,
            reason,
        };
        let _ = self.events.send(EngineEvent::PositionClosed {
            position,
            exit_price,
            pnl,
            fee,
            reason,
        });
        Ok(trade)
    }

    /// Store an advanced trailing stop and broadcast the move.
    pub fn apply_trail(
        &self,
        state: &mut LedgerState,
        position_id: &str,
        adv: TrailAdvance,
    ) -> Result<()> {
        let position = state
            .positions
            .get_mut(position_id)
            .ok_or_else(|| Error::UnknownPosition(position_id.to_string()))?;
        position.trail_phase = adv.phase;
        position.stop_loss = adv.stop;
        position.best_price = adv.best_price;

        let _ = self.events.send(EngineEvent::TrailAdvanced {
            agent_id: position.agent_id.clone(),
            position_id: position.id.clone(),
            symbol: position.symbol.clone(),
            phase: adv.phase,
            new_stop: adv.stop,
        });
        Ok(())
    }

    /// Close every open position of one agent at the latest known prices.
    /// A symbol without a price closes at entry (flat) rather than hang.
    pub fn close_all(
        &self,
        state: &mut LedgerState,
        agent_id: &str,
        prices: &TickBatch,
    ) -> Result<Vec<ClosedTrade>> {
        state.account(agent_id)?;
        let ids: Vec<(String, String, f64)> = state
            .positions
            .values()
            .filter(|p| p.agent_id == agent_id)
            .map(|p| (p.id.clone(), p.symbol.clone(), p.entry_price))
            .collect();

        let mut closed = Vec::with_capacity(ids.len());
        for (id, symbol, entry) in ids {
            let exit = prices.get(&symbol).copied().unwrap_or_else(|| {
                warn!(symbol = %symbol, "No price for manual close, settling at entry");
                entry
            });
            closed.push(self.close_position(state, &id, exit, CloseReason::Manual)?);
        }
        Ok(closed)
    }

    /// Pause or resume an agent. Pausing leaves positions open; the
    /// monitor drops them from its watchlist until resume.
    pub fn set_active(&self, state: &mut LedgerState, agent_id: &str, active: bool) -> Result<()> {
        let account = state
            .accounts
            .get_mut(agent_id)
            .ok_or_else(|| Error::UnknownAgent(agent_id.to_string()))?;
        account.active = active;
        info!(agent = %agent_id, active = active, "Agent state changed");
        Ok(())
    }

    /// Broadcast an equity snapshot per account at the given prices.
    /// Positions without a price are valued at entry.
    pub fn broadcast_snapshots(&self, state: &LedgerState, prices: &TickBatch) {
        for account in state.accounts.values() {
            let open = state.positions_for_agent(&account.agent_id);
            let unrealized: f64 = open
                .iter()
                .map(|p| {
                    let price = prices.get(&p.symbol).copied().unwrap_or(p.entry_price);
                    p.unrealized_pnl(price) + p.margin
                })
                .sum();
            let _ = self.events.send(EngineEvent::AccountSnapshot {
                agent_id: account.agent_id.clone(),
                balance: account.balance,
                equity: account.balance + unrealized,
                open_positions: open.len(),
            });
        }
    }
}
