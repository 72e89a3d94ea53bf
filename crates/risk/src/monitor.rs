//! Reactive risk monitor: consumes the feed's 1 s mark-price broadcast
//! plus a slower fallback poll, and evaluates breaches for the watched
//! positions only. Strict per-position precedence: liquidation, then
//! stop-loss, then take-profit, then trailing advancement.
//!
//! Gate discipline: this task only ever `try_lock`s the ledger. On
//! contention the tick is dropped and counted; the next tick (at most a
//! second away) re-evaluates from fresh state, so nothing is queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use common::{CloseReason, EngineEvent, MarketFeed, Position, Side, TickBatch};
use ledger::{advance_trail, Ledger, LedgerState};

use crate::watchlist::Watchlist;

// ─── Stats ────────────────────────────────────────────────────────────────────

/// Monitor health counters, updated lock-free from the check path.
#[derive(Debug, Default)]
pub struct MonitorStats {
    pub ticks_received: AtomicU64,
    pub ticks_processed: AtomicU64,
    /// Ticks dropped because the decision loop held the gate.
    pub ticks_skipped_locked: AtomicU64,
    /// Ticks dropped because a previous check was still in flight.
    pub ticks_skipped_busy: AtomicU64,
    pub closes: AtomicU64,
    pub trail_advances: AtomicU64,
    pub last_check_micros: AtomicU64,
}

/// Plain-data copy of the counters for logging or inspection.
#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    pub ticks_received: u64,
    pub ticks_processed: u64,
    pub ticks_skipped_locked: u64,
    pub ticks_skipped_busy: u64,
    pub closes: u64,
    pub trail_advances: u64,
    pub last_check_micros: u64,
}

impl MonitorStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks_received: self.ticks_received.load(Ordering::Relaxed),
            ticks_processed: self.ticks_processed.load(Ordering::Relaxed),
            ticks_skipped_locked: self.ticks_skipped_locked.load(Ordering::Relaxed),
            ticks_skipped_busy: self.ticks_skipped_busy.load(Ordering::Relaxed),
            closes: self.closes.load(Ordering::Relaxed),
            trail_advances: self.trail_advances.load(Ordering::Relaxed),
            last_check_micros: self.last_check_micros.load(Ordering::Relaxed),
        }
    }
}

// ─── Monitor ──────────────────────────────────────────────────────────────────

pub struct RiskMonitor {
    ledger: Arc<Ledger>,
    feed: Arc<dyn MarketFeed>,
    watchlist: Arc<Watchlist>,
    stats: Arc<MonitorStats>,
    in_flight: AtomicBool,
    fallback_poll: Duration,
    watchlist_refresh: Duration,
}

impl RiskMonitor {
    pub fn new(
        ledger: Arc<Ledger>,
        feed: Arc<dyn MarketFeed>,
        watchlist: Arc<Watchlist>,
        fallback_poll: Duration,
        watchlist_refresh: Duration,
    ) -> Self {
        Self {
            ledger,
            feed,
            watchlist,
            stats: Arc::new(MonitorStats::default()),
            in_flight: AtomicBool::new(false),
            fallback_poll,
            watchlist_refresh,
        }
    }

    pub fn stats(&self) -> Arc<MonitorStats> {
        self.stats.clone()
    }

    /// Run the monitor loop: tick broadcast, fallback poll, periodic
    /// watchlist refresh and ledger-event-driven rebuilds, all in one
    /// task via `tokio::select!`.
    pub async fn run(self) {
        info!(
            fallback_secs = self.fallback_poll.as_secs(),
            refresh_secs = self.watchlist_refresh.as_secs(),
            "RiskMonitor running"
        );
        let mut ticks = self.feed.subscribe();
        let mut events = self.ledger.subscribe();
        let mut fallback = tokio::time::interval(self.fallback_poll);
        let mut refresh = tokio::time::interval(self.watchlist_refresh);

        loop {
            tokio::select! {
                // ── Primary path: 1 s mark-price batches ─────────────────
                tick = ticks.recv() => {
                    match tick {
                        Ok(batch) => self.handle_batch(&batch).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(dropped = n, "Monitor lagged behind tick broadcast");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("Tick broadcast closed — RiskMonitor exiting");
                            return;
                        }
                    }
                }

                // ── Fallback: poll watched symbols when the stream is quiet
                _ = fallback.tick() => {
                    let batch = self.poll_watched().await;
                    if !batch.is_empty() {
                        self.handle_batch(&batch).await;
                    }
                }

                // ── Safety-net watchlist refresh ─────────────────────────
                _ = refresh.tick() => {
                    if let Ok(state) = self.ledger.try_lock() {
                        self.watchlist.rebuild(&state).await;
                    }
                }

                // ── Ledger events: rebuild on open/close ─────────────────
                event = events.recv() => {
                    match event {
                        Ok(EngineEvent::PositionOpened { .. })
                        | Ok(EngineEvent::PositionClosed { .. }) => {
                            if let Ok(state) = self.ledger.try_lock() {
                                self.watchlist.rebuild(&state).await;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            debug!(dropped = n, "Monitor lagged behind ledger events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("Ledger event channel closed — RiskMonitor exiting");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Fetch current prices for every watched symbol. Feed errors on one
    /// symbol are logged and skipped; the rest of the batch proceeds.
    async fn poll_watched(&self) -> TickBatch {
        let mut batch = TickBatch::new();
        for symbol in self.watchlist.watched_symbols().await {
            match self.feed.mark_price(&symbol).await {
                Ok(price) => {
                    batch.insert(symbol, price);
                }
                Err(e) => debug!(symbol = %symbol, error = %e, "Fallback poll failed"),
            }
        }
        batch
    }

    /// Evaluate one price batch against the watchlist. Public so tests
    /// drive the monitor without a live feed.
    pub async fn handle_batch(&self, batch: &TickBatch) {
        self.stats.ticks_received.fetch_add(1, Ordering::Relaxed);

        if self.in_flight.swap(true, Ordering::Acquire) {
            self.stats.ticks_skipped_busy.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut state = match self.ledger.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.stats
                    .ticks_skipped_locked
                    .fetch_add(1, Ordering::Relaxed);
                self.in_flight.store(false, Ordering::Release);
                return;
            }
        };

        let started = Instant::now();
        let mut closed_any = false;

        for (symbol, price) in batch {
            let entries = self.watchlist.entries_for(symbol).await;
            for (agent_id, position_id) in entries {
                match self.check_position(&mut state, &position_id, *price) {
                    Ok(acted) => closed_any |= acted,
                    Err(e) => {
                        // A position closed moments ago is expected churn;
                        // anything else is worth a warning.
                        debug!(
                            agent = %agent_id,
                            position = %position_id,
                            error = %e,
                            "Risk check failed for position"
                        );
                    }
                }
            }
        }

        if closed_any {
            self.watchlist.rebuild(&state).await;
        }
        drop(state);

        self.stats
            .last_check_micros
            .store(started.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.stats.ticks_processed.fetch_add(1, Ordering::Relaxed);
        self.in_flight.store(false, Ordering::Release);
    }

    /// One position against one price, in strict precedence order.
    /// Returns true when the position was closed.
    fn check_position(
        &self,
        state: &mut LedgerState,
        position_id: &str,
        price: f64,
    ) -> common::Result<bool> {
        let Some(pos) = state.positions.get(position_id) else {
            // Already closed by the decision loop or an earlier tick
            return Ok(false);
        };

        if let Some(reason) = breach(pos, price) {
            self.ledger
                .close_position(state, position_id, price, reason)?;
            self.stats.closes.fetch_add(1, Ordering::Relaxed);
            return Ok(true);
        }

        if let Some(adv) = advance_trail(pos, price) {
            self.ledger.apply_trail(state, position_id, adv)?;
            self.stats.trail_advances.fetch_add(1, Ordering::Relaxed);
        }
        Ok(false)
    }
}

/// Breach test with fixed precedence: liquidation before stop-loss before
/// take-profit. A tick through both liquidation and stop levels must
/// settle as a liquidation.
pub fn breach(pos: &Position, price: f64) -> Option<CloseReason> {
    match pos.side {
        Side::Long => {
            if price <= pos.liquidation_price {
                Some(CloseReason::Liquidation)
            } else if price <= pos.stop_loss {
                Some(CloseReason::StopLoss)
            } else if price >= pos.take_profit {
                Some(CloseReason::TakeProfit)
            } else {
                None
            }
        }
        Side::Short => {
            if price >= pos.liquidation_price {
                Some(CloseReason::Liquidation)
            } else if price >= pos.stop_loss {
                Some(CloseReason::StopLoss)
            } else if price <= pos.take_profit {
                Some(CloseReason::TakeProfit)
            } else {
                None
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
