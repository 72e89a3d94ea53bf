//! Periodic account-state broadcast. Equity is marked against the feed's
//! latest prices; consumers (the store, any future surface) subscribe to
//! the ledger's event channel.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use common::{MarketFeed, TickBatch};
use ledger::Ledger;

pub async fn run(ledger: Arc<Ledger>, feed: Arc<dyn MarketFeed>, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "Snapshot task running");
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        // Collect exposed symbols first, price them outside the gate.
        let symbols: Vec<String> = {
            let state = ledger.lock().await;
            let mut symbols: Vec<String> =
                state.positions.values().map(|p| p.symbol.clone()).collect();
            symbols.sort();
            symbols.dedup();
            symbols
        };

        let mut prices = TickBatch::new();
        for symbol in symbols {
            if let Ok(price) = feed.mark_price(&symbol).await {
                prices.insert(symbol, price);
            }
        }

        let state = ledger.lock().await;
        ledger.broadcast_snapshots(&state, &prices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubFeed;
    use common::EngineEvent;
    use ledger::Account;

    #[tokio::test]
    async fn snapshots_report_balance_and_open_count() {
        let ledger = Arc::new(Ledger::new(vec![Account {
            agent_id: "a1".into(),
            name: "a1".into(),
            strategy: "trend_rider".into(),
            balance: 500.0,
            active: true,
            min_leverage: 1,
            risk_pct_min: None,
            risk_pct_max: None,
            trailing_enabled: true,
            symbols: Vec::new(),
        }]));
        let mut events = ledger.subscribe();

        tokio::spawn(run(
            ledger.clone(),
            Arc::new(StubFeed::new()),
            Duration::from_millis(10),
        ));

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        match event {
            EngineEvent::AccountSnapshot {
                agent_id,
                balance,
                equity,
                open_positions,
            } => {
                assert_eq!(agent_id, "a1");
                assert!((balance - 500.0).abs() < 1e-9);
                assert!((equity - 500.0).abs() < 1e-9);
                assert_eq!(open_positions, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
