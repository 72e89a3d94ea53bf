/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Agent definitions (TOML)
    pub agents_config_path: String,

    // Candidate symbol universe scanned by the decision loop
    pub symbols: Vec<String>,

    // Task cadences (seconds)
    pub decision_interval_secs: u64,
    pub fallback_poll_secs: u64,
    pub watchlist_refresh_secs: u64,
    pub snapshot_interval_secs: u64,
}

const DEFAULT_SYMBOLS: &str =
    "BTCUSDT,ETHUSDT,SOLUSDT,BNBUSDT,XRPUSDT,DOGEUSDT,ADAUSDT,LINKUSDT,AVAXUSDT,DOTUSDT";

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let symbols = optional_env("SYMBOLS")
            .unwrap_or_else(|| DEFAULT_SYMBOLS.to_string())
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        Config {
            database_url: required_env("DATABASE_URL"),
            agents_config_path: optional_env("AGENTS_CONFIG_PATH")
                .unwrap_or_else(|| "config/agents.toml".to_string()),
            symbols,
            decision_interval_secs: optional_env_u64("DECISION_INTERVAL_SECS", 60),
            fallback_poll_secs: optional_env_u64("FALLBACK_POLL_SECS", 5),
            watchlist_refresh_secs: optional_env_u64("WATCHLIST_REFRESH_SECS", 30),
            snapshot_interval_secs: optional_env_u64("SNAPSHOT_INTERVAL_SECS", 3),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn optional_env_u64(key: &str, default: u64) -> u64 {
    optional_env(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
