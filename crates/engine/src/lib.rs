pub mod agents;
pub mod binance;
pub mod decision;
pub mod handle;
pub mod snapshot;

#[cfg(test)]
mod testutil;

pub use agents::{AgentConfig, AgentsFile};
pub use binance::BinanceFeed;
pub use decision::{ConfidenceAdjuster, DecisionLoop};
pub use handle::{CommandProcessor, EngineCommand, EngineHandle};
