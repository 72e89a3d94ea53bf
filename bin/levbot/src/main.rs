use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use common::Config;
use engine::{snapshot, AgentsFile, BinanceFeed, CommandProcessor, DecisionLoop};
use ledger::Ledger;
use risk::{RiskMonitor, Watchlist};
use store::TradeStore;
use strategy::StrategyRegistry;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(symbols = cfg.symbols.len(), "LevBot starting");

    // ── Strategies and agent roster ───────────────────────────────────────────
    let registry = Arc::new(StrategyRegistry::new());
    let agents_file = AgentsFile::load(&cfg.agents_config_path);
    agents_file.validate(&registry);

    // ── Ledger ────────────────────────────────────────────────────────────────
    let ledger = Arc::new(Ledger::new(agents_file.into_accounts()));

    // ── Trade store ───────────────────────────────────────────────────────────
    let db = TradeStore::connect(&cfg.database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to open trade store: {e}"));
    Arc::new(db).spawn_consumer(ledger.subscribe());
    info!("Database ready");

    // ── Market feed ───────────────────────────────────────────────────────────
    let feed = Arc::new(BinanceFeed::new());
    feed.spawn_stream();

    // ── Risk monitor ──────────────────────────────────────────────────────────
    let watchlist = Arc::new(Watchlist::new());
    let monitor = RiskMonitor::new(
        ledger.clone(),
        feed.clone(),
        watchlist.clone(),
        Duration::from_secs(cfg.fallback_poll_secs),
        Duration::from_secs(cfg.watchlist_refresh_secs),
    );
    let monitor_stats = monitor.stats();
    tokio::spawn(monitor.run());

    // ── Decision loop ─────────────────────────────────────────────────────────
    let decision = DecisionLoop::new(
        ledger.clone(),
        feed.clone(),
        registry,
        watchlist.clone(),
        cfg.symbols.clone(),
        Duration::from_secs(cfg.decision_interval_secs),
    );
    tokio::spawn(decision.run());

    // ── Command surface ───────────────────────────────────────────────────────
    let (processor, _handle) = CommandProcessor::new(ledger.clone(), feed.clone(), watchlist);
    tokio::spawn(processor.run());

    // ── Snapshots ─────────────────────────────────────────────────────────────
    tokio::spawn(snapshot::run(
        ledger.clone(),
        feed.clone(),
        Duration::from_secs(cfg.snapshot_interval_secs),
    ));

    // ── Monitor health log ────────────────────────────────────────────────────
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let stats = monitor_stats.snapshot();
            info!(
                ticks = stats.ticks_received,
                processed = stats.ticks_processed,
                skipped_locked = stats.ticks_skipped_locked,
                skipped_busy = stats.ticks_skipped_busy,
                closes = stats.closes,
                trail_advances = stats.trail_advances,
                last_check_micros = stats.last_check_micros,
                "Monitor stats"
            );
        }
    });

    // Keep main alive
    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await.unwrap();
    info!("Shutdown signal received. Exiting.");
}
