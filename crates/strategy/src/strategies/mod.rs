//! Concrete strategy variants. Each accumulates long/short scores across
//! its own layers; the shared builder in `signal.rs` turns scores into
//! entries and exits.

pub mod confluence_master;
pub mod grid_trader;
pub mod mean_reversion;
pub mod momentum_sniper;
pub mod scalper;
pub mod trend_rider;

pub use confluence_master::ConfluenceMaster;
pub use grid_trader::GridTrader;
pub use mean_reversion::MeanReversion;
pub use momentum_sniper::MomentumSniper;
pub use scalper::Scalper;
pub use trend_rider::TrendRider;
