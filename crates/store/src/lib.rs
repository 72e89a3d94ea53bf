//! Sqlite persistence for the trade event log and account snapshots.
//!
//! The store is a passive consumer: it drains the ledger's event
//! broadcast on its own task. A write failure is logged and dropped —
//! persistence trouble must never stall or crash the trading core.

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::{info, warn};

use common::{CloseReason, EngineEvent, Position, Result};

pub struct TradeStore {
    pool: SqlitePool,
}

impl TradeStore {
    /// Connect and create the schema if it does not exist yet.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        info!(url = %database_url, "Trade store connected");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                position_id TEXT NOT NULL,
                agent_id    TEXT NOT NULL,
                symbol      TEXT NOT NULL,
                side        TEXT NOT NULL,
                action      TEXT NOT NULL,
                price       REAL NOT NULL,
                size        REAL NOT NULL,
                leverage    INTEGER NOT NULL,
                margin      REAL NOT NULL,
                pnl         REAL,
                fee         REAL,
                reason      TEXT,
                ts          TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS account_snapshots (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id       TEXT NOT NULL,
                balance        REAL NOT NULL,
                equity         REAL NOT NULL,
                open_positions INTEGER NOT NULL,
                ts             TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_open(&self, position: &Position) -> Result<()> {
        sqlx::query(
            "INSERT INTO trades \
             (position_id, agent_id, symbol, side, action, price, size, leverage, margin, ts) \
             VALUES (?, ?, ?, ?, 'open', ?, ?, ?, ?, ?)",
        )
        .bind(&position.id)
        .bind(&position.agent_id)
        .bind(&position.symbol)
        .bind(position.side)
        .bind(position.entry_price)
        .bind(position.size)
        .bind(position.leverage as i64)
        .bind(position.margin)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_close(
        &self,
        position: &Position,
        exit_price: f64,
        pnl: f64,
        fee: f64,
        reason: CloseReason,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO trades \
             (position_id, agent_id, symbol, side, action, price, size, leverage, margin, \
              pnl, fee, reason, ts) \
             VALUES (?, ?, ?, ?, 'close', ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&position.id)
        .bind(&position.agent_id)
        .bind(&position.symbol)
        .bind(position.side)
        .bind(exit_price)
        .bind(position.size)
        .bind(position.leverage as i64)
        .bind(position.margin)
        .bind(pnl)
        .bind(fee)
        .bind(reason)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_snapshot(
        &self,
        agent_id: &str,
        balance: f64,
        equity: f64,
        open_positions: usize,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO account_snapshots (agent_id, balance, equity, open_positions, ts) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(agent_id)
        .bind(balance)
        .bind(equity)
        .bind(open_positions as i64)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Spawn the consumer task draining the event broadcast.
    pub fn spawn_consumer(
        self: Arc<Self>,
        mut events: broadcast::Receiver<EngineEvent>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("Trade store consumer running");
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Err(e) = self.persist(event).await {
                            warn!(error = %e, "Failed to persist engine event");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(dropped = n, "Store lagged behind engine events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Event channel closed — store consumer exiting");
                        return;
                    }
                }
            }
        })
    }

    async fn persist(&self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::PositionOpened { position } => self.record_open(&position).await,
            EngineEvent::PositionClosed {
                position,
                exit_price,
                pnl,
                fee,
                reason,
            } => {
                self.record_close(&position, exit_price, pnl, fee, reason)
                    .await
            }
            EngineEvent::AccountSnapshot {
                agent_id,
                balance,
                equity,
                open_positions,
            } => {
                self.record_snapshot(&agent_id, balance, equity, open_positions)
                    .await
            }
            // Trail moves are visible in logs; not part of the trade log
            EngineEvent::TrailAdvanced { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Side, TrailPhase};

    fn position() -> Position {
        Position {
            id: "pos-1".into(),
            agent_id: "a1".into(),
            symbol: "BTCUSDT".into(),
            side: Side::Long,
            entry_price: 100.0,
            size: 5.0,
            leverage: 10,
            margin: 50.0,
            stop_loss: 98.0,
            take_profit: 106.0,
            liquidation_price: 91.0,
            trail_pct: 3.0,
            trail_phase: TrailPhase::Inactive,
            best_price: 100.0,
            opened_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_and_close_rows_round_trip() {
        let store = TradeStore::connect("sqlite::memory:").await.unwrap();
        let pos = position();
        store.record_open(&pos).await.unwrap();
        store
            .record_close(&pos, 105.0, 25.0, 0.21, CloseReason::TakeProfit)
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trades")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let reason: Option<String> =
            sqlx::query_scalar("SELECT reason FROM trades WHERE action = 'close'")
                .fetch_one(&store.pool)
                .await
                .unwrap();
        assert_eq!(reason.as_deref(), Some("take_profit"));
    }

    #[tokio::test]
    async fn consumer_drains_broadcast() {
        let store = Arc::new(TradeStore::connect("sqlite::memory:").await.unwrap());
        let (tx, rx) = broadcast::channel(8);
        let handle = store.clone().spawn_consumer(rx);

        tx.send(EngineEvent::PositionOpened {
            position: position(),
        })
        .unwrap();
        tx.send(EngineEvent::AccountSnapshot {
            agent_id: "a1".into(),
            balance: 950.0,
            equity: 975.0,
            open_positions: 1,
        })
        .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let trades: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trades")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let snapshots: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account_snapshots")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(trades, 1);
        assert_eq!(snapshots, 1);
        handle.abort();
    }
}
