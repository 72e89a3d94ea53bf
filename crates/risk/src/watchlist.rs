//! Symbol → positions index for the reactive monitor. A mark-price tick
//! only touches the positions actually exposed to that symbol, so a
//! 300-symbol batch with two open positions does two lookups, not a scan.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use ledger::LedgerState;

/// One watched position: the owning agent and the position id.
pub type WatchEntry = (String, String);

/// Invariant: after a rebuild, every open position of every *active*
/// agent appears in exactly one symbol bucket. Paused agents' positions
/// are absent (not closed, just unwatched).
#[derive(Default)]
pub struct Watchlist {
    inner: RwLock<HashMap<String, Vec<WatchEntry>>>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the whole index from ledger state. Cheap relative to the
    /// tick path, so rebuilds are always full, never incremental.
    pub async fn rebuild(&self, state: &LedgerState) {
        let mut index: HashMap<String, Vec<WatchEntry>> = HashMap::new();
        for pos in state.positions.values() {
            let active = state
                .accounts
                .get(&pos.agent_id)
                .is_some_and(|a| a.active);
            if active {
                index
                    .entry(pos.symbol.clone())
                    .or_default()
                    .push((pos.agent_id.clone(), pos.id.clone()));
            }
        }
        let entries: usize = index.values().map(Vec::len).sum();
        debug!(symbols = index.len(), positions = entries, "Watchlist rebuilt");
        *self.inner.write().await = index;
    }

    /// Positions watching a symbol. Empty vec when nobody cares.
    pub async fn entries_for(&self, symbol: &str) -> Vec<WatchEntry> {
        self.inner
            .read()
            .await
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn watched_symbols(&self) -> Vec<String> {
        self.inner.read().await.keys().cloned().collect()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
