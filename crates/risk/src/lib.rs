pub mod monitor;
pub mod watchlist;

pub use monitor::{breach, MonitorStats, RiskMonitor, StatsSnapshot};
pub use watchlist::Watchlist;
