//! Manual control surface. Commands arrive on an mpsc channel and are
//! executed under the ledger gate on the decision-loop side (they wait
//! for the lock rather than skip). Every command that changes exposure
//! triggers an immediate watchlist rebuild.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use common::{CloseReason, MarketFeed, Result, TickBatch};
use ledger::Ledger;
use risk::Watchlist;

#[derive(Debug, Clone)]
pub enum EngineCommand {
    ClosePosition { position_id: String },
    CloseAllPositions { agent_id: String },
    PauseAgent { agent_id: String },
    ResumeAgent { agent_id: String },
}

/// Cloneable handle for anything that needs to steer the engine.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn close_position(&self, position_id: impl Into<String>) {
        self.send(EngineCommand::ClosePosition {
            position_id: position_id.into(),
        })
        .await;
    }

    pub async fn close_all(&self, agent_id: impl Into<String>) {
        self.send(EngineCommand::CloseAllPositions {
            agent_id: agent_id.into(),
        })
        .await;
    }

    pub async fn pause_agent(&self, agent_id: impl Into<String>) {
        self.send(EngineCommand::PauseAgent {
            agent_id: agent_id.into(),
        })
        .await;
    }

    pub async fn resume_agent(&self, agent_id: impl Into<String>) {
        self.send(EngineCommand::ResumeAgent {
            agent_id: agent_id.into(),
        })
        .await;
    }
}

pub struct CommandProcessor {
    ledger: Arc<Ledger>,
    feed: Arc<dyn MarketFeed>,
    watchlist: Arc<Watchlist>,
    command_rx: mpsc::Receiver<EngineCommand>,
}

impl CommandProcessor {
    pub fn new(
        ledger: Arc<Ledger>,
        feed: Arc<dyn MarketFeed>,
        watchlist: Arc<Watchlist>,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        (
            Self {
                ledger,
                feed,
                watchlist,
                command_rx,
            },
            EngineHandle { command_tx },
        )
    }

    /// Process commands until every handle is dropped.
    pub async fn run(mut self) {
        info!("CommandProcessor running");
        while let Some(cmd) = self.command_rx.recv().await {
            if let Err(e) = self.handle(cmd).await {
                warn!(error = %e, "Engine command failed");
            }
        }
        warn!("Command channel closed — CommandProcessor exiting");
    }

    async fn handle(&self, cmd: EngineCommand) -> Result<()> {
        match cmd {
            EngineCommand::ClosePosition { position_id } => {
                // Resolve the symbol first so the price fetch happens
                // outside the gate.
                let symbol = {
                    let state = self.ledger.lock().await;
                    match state.positions.get(&position_id) {
                        Some(p) => p.symbol.clone(),
                        None => {
                            warn!(position = %position_id, "Close requested for unknown position");
                            return Ok(());
                        }
                    }
                };
                let price = self.feed.mark_price(&symbol).await?;

                let mut state = self.ledger.lock().await;
                self.ledger
                    .close_position(&mut state, &position_id, price, CloseReason::Manual)?;
                self.watchlist.rebuild(&state).await;
            }

            EngineCommand::CloseAllPositions { agent_id } => {
                let symbols: Vec<String> = {
                    let state = self.ledger.lock().await;
                    state
                        .positions_for_agent(&agent_id)
                        .iter()
                        .map(|p| p.symbol.clone())
                        .collect()
                };
                let mut prices = TickBatch::new();
                for symbol in symbols {
                    if let Ok(price) = self.feed.mark_price(&symbol).await {
                        prices.insert(symbol, price);
                    }
                }

                let mut state = self.ledger.lock().await;
                let closed = self.ledger.close_all(&mut state, &agent_id, &prices)?;
                self.watchlist.rebuild(&state).await;
                info!(agent = %agent_id, closed = closed.len(), "Closed all positions");
            }

            EngineCommand::PauseAgent { agent_id } => {
                let mut state = self.ledger.lock().await;
                self.ledger.set_active(&mut state, &agent_id, false)?;
                self.watchlist.rebuild(&state).await;
            }

            EngineCommand::ResumeAgent { agent_id } => {
                let mut state = self.ledger.lock().await;
                self.ledger.set_active(&mut state, &agent_id, true)?;
                self.watchlist.rebuild(&state).await;
            }
        }
        Ok(())
    }
}
