//! Agent definitions loaded from a TOML file. Each agent pairs a strategy
//! key with its own balance, leverage floor and risk-band overrides.

use serde::Deserialize;
use tracing::info;

use ledger::Account;

fn default_true() -> bool {
    true
}

fn default_min_leverage() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    /// Strategy registry key, e.g. "trend_rider".
    pub strategy: String,
    /// Starting balance in USD.
    pub balance: f64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_min_leverage")]
    pub min_leverage: u32,
    /// Optional clamp band for the strategy's risk-per-trade percentage.
    #[serde(default)]
    pub risk_pct_min: Option<f64>,
    #[serde(default)]
    pub risk_pct_max: Option<f64>,
    #[serde(default = "default_true")]
    pub trailing_enabled: bool,
    /// Symbols this agent scans; empty falls back to the global list.
    #[serde(default)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentsFile {
    pub agents: Vec<AgentConfig>,
}

impl AgentsFile {
    /// Load and parse the agents file. A missing or malformed file is a
    /// deployment error: panic at startup rather than trade without the
    /// intended roster.
    pub fn load(path: &str) -> Self {
        let raw = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Cannot read agents config '{path}': {e}"));
        let file: AgentsFile = toml::from_str(&raw)
            .unwrap_or_else(|e| panic!("Malformed agents config '{path}': {e}"));
        info!(path = %path, agents = file.agents.len(), "Agents config loaded");
        file
    }

    /// Validate every agent's strategy key against the registry, panicking
    /// on an unknown key — same startup-fatal policy as the registry.
    pub fn validate(&self, registry: &strategy::StrategyRegistry) {
        for agent in &self.agents {
            if !registry.contains(&agent.strategy) {
                panic!(
                    "Agent '{}' references unknown strategy '{}'",
                    agent.id, agent.strategy
                );
            }
        }
    }

    pub fn into_accounts(self) -> Vec<Account> {
        self.agents
            .into_iter()
            .map(|a| Account {
                agent_id: a.id,
                name: a.name,
                strategy: a.strategy,
                balance: a.balance,
                active: a.active,
                min_leverage: a.min_leverage,
                risk_pct_min: a.risk_pct_min,
                risk_pct_max: a.risk_pct_max,
                trailing_enabled: a.trailing_enabled,
                symbols: a.symbols,
            })
            .collect()
    }
}
