//! Configuration for the control console.
//!
//! Supports loading from a TOML file with environment variable and CLI
//! overrides, in that order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Backend watchdog timeout. AUTO mode is reverted server-side when no
/// heartbeat arrives within this window, so the client interval must stay
/// strictly under it.
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(30);

/// Top-level configuration for the console.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Backend base URL. `None` falls back to the persisted override or the
    /// build-time default.
    pub base_url: Option<String>,

    /// Logging level.
    pub log_level: String,

    /// Operator allow-list: identities granted the privileged role when the
    /// auth backend supplies no role claim.
    pub operators: Vec<String>,

    /// Symbols to keep price subscriptions on.
    pub symbols: Vec<String>,

    /// Override for the session/state directory (defaults to the platform
    /// config dir).
    pub state_dir: Option<PathBuf>,

    /// Polling intervals.
    pub polling: PollingConfig,

    /// AUTO-mode loop parameters.
    pub autopilot: AutopilotConfig,
}

/// Polling intervals per subscription.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Settings/connectivity poll interval (milliseconds).
    pub settings_interval_ms: u64,

    /// Last-traded-price poll interval (milliseconds).
    pub ltp_interval_ms: u64,

    /// Order book poll interval (milliseconds).
    pub orders_interval_ms: u64,

    /// Autopilot run-state poll interval (milliseconds).
    pub observatory_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            settings_interval_ms: 10_000,
            ltp_interval_ms: 3_000,
            orders_interval_ms: 5_000,
            observatory_interval_ms: 10_000,
        }
    }
}

impl PollingConfig {
    pub fn settings_interval(&self) -> Duration {
        Duration::from_millis(self.settings_interval_ms)
    }

    pub fn ltp_interval(&self) -> Duration {
        Duration::from_millis(self.ltp_interval_ms)
    }

    pub fn orders_interval(&self) -> Duration {
        Duration::from_millis(self.orders_interval_ms)
    }

    pub fn observatory_interval(&self) -> Duration {
        Duration::from_millis(self.observatory_interval_ms)
    }
}

/// Parameters for the AUTO-mode heartbeat and decision loops.
#[derive(Debug, Clone)]
pub struct AutopilotConfig {
    /// Heartbeat interval (milliseconds). Must stay under the backend
    /// watchdog timeout.
    pub heartbeat_interval_ms: u64,

    /// Decision cycle interval (milliseconds).
    pub decision_interval_ms: u64,

    /// Symbol the decision cycle trades.
    pub symbol: String,

    /// Quantity per executed trade.
    pub quantity: u32,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 5_000,
            decision_interval_ms: 30_000,
            symbol: "NSE:BANKNIFTY".to_string(),
            quantity: 1,
        }
    }
}

impl AutopilotConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn decision_interval(&self) -> Duration {
        Duration::from_millis(self.decision_interval_ms)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            log_level: "info".to_string(),
            operators: Vec::new(),
            symbols: vec!["NSE:NIFTY 50".to_string(), "NSE:BANKNIFTY".to_string()],
            state_dir: None,
            polling: PollingConfig::default(),
            autopilot: AutopilotConfig::default(),
        }
    }
}

// TOML mirror types: every field optional so partial config files work.

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    base_url: Option<String>,
    log_level: Option<String>,
    operators: Option<Vec<String>>,
    symbols: Option<Vec<String>>,
    state_dir: Option<PathBuf>,
    #[serde(default)]
    polling: TomlPolling,
    #[serde(default)]
    autopilot: TomlAutopilot,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPolling {
    settings_interval_ms: Option<u64>,
    ltp_interval_ms: Option<u64>,
    orders_interval_ms: Option<u64>,
    observatory_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlAutopilot {
    heartbeat_interval_ms: Option<u64>,
    decision_interval_ms: Option<u64>,
    symbol: Option<String>,
    quantity: Option<u32>,
}

impl From<TomlConfig> for ConsoleConfig {
    fn from(file: TomlConfig) -> Self {
        let defaults = ConsoleConfig::default();
        let polling_defaults = PollingConfig::default();
        let autopilot_defaults = AutopilotConfig::default();

        Self {
            base_url: file.base_url,
            log_level: file.log_level.unwrap_or(defaults.log_level),
            operators: file.operators.unwrap_or_default(),
            symbols: file.symbols.unwrap_or(defaults.symbols),
            state_dir: file.state_dir,
            polling: PollingConfig {
                settings_interval_ms: file
                    .polling
                    .settings_interval_ms
                    .unwrap_or(polling_defaults.settings_interval_ms),
                ltp_interval_ms: file
                    .polling
                    .ltp_interval_ms
                    .unwrap_or(polling_defaults.ltp_interval_ms),
                orders_interval_ms: file
                    .polling
                    .orders_interval_ms
                    .unwrap_or(polling_defaults.orders_interval_ms),
                observatory_interval_ms: file
                    .polling
                    .observatory_interval_ms
                    .unwrap_or(polling_defaults.observatory_interval_ms),
            },
            autopilot: AutopilotConfig {
                heartbeat_interval_ms: file
                    .autopilot
                    .heartbeat_interval_ms
                    .unwrap_or(autopilot_defaults.heartbeat_interval_ms),
                decision_interval_ms: file
                    .autopilot
                    .decision_interval_ms
                    .unwrap_or(autopilot_defaults.decision_interval_ms),
                symbol: file.autopilot.symbol.unwrap_or(autopilot_defaults.symbol),
                quantity: file
                    .autopilot
                    .quantity
                    .unwrap_or(autopilot_defaults.quantity),
            },
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlConfig = toml::from_str(content).context("Failed to parse TOML config")?;
        Ok(Self::from(file))
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("VERSE_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Ok(dir) = std::env::var("VERSE_STATE_DIR") {
            self.state_dir = Some(PathBuf::from(dir));
        }
        if let Ok(operators) = std::env::var("VERSE_OPERATORS") {
            let list: Vec<String> = operators
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !list.is_empty() {
                self.operators = list;
            }
        }
        if let Ok(level) = std::env::var("VERSE_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_cli_overrides(&mut self, base_url: Option<String>, symbols: Option<Vec<String>>) {
        if let Some(url) = base_url {
            self.base_url = Some(url);
        }
        if let Some(symbol_list) = symbols {
            if !symbol_list.is_empty() {
                self.symbols = symbol_list;
            }
        }
    }

    /// Validate configuration and return errors for invalid values.
    pub fn validate(&self) -> Result<()> {
        if self.polling.settings_interval_ms == 0
            || self.polling.ltp_interval_ms == 0
            || self.polling.orders_interval_ms == 0
            || self.polling.observatory_interval_ms == 0
        {
            bail!("polling intervals must be positive");
        }

        if self.autopilot.heartbeat_interval_ms == 0 {
            bail!("heartbeat_interval_ms must be positive");
        }
        if self.autopilot.heartbeat_interval_ms >= WATCHDOG_TIMEOUT.as_millis() as u64 {
            bail!(
                "heartbeat_interval_ms must stay under the {}s backend watchdog timeout",
                WATCHDOG_TIMEOUT.as_secs()
            );
        }

        if self.autopilot.decision_interval_ms == 0 {
            bail!("decision_interval_ms must be positive");
        }
        if self.autopilot.quantity == 0 {
            bail!("autopilot quantity must be at least 1");
        }
        if self.autopilot.symbol.trim().is_empty() {
            bail!("autopilot symbol must not be empty");
        }

        if self.symbols.is_empty() {
            bail!("At least one symbol must be configured");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConsoleConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ConsoleConfig::from_toml_str(
            r#"
            base_url = "http://10.0.0.5:8000"

            [autopilot]
            symbol = "NSE:NIFTY 50"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("http://10.0.0.5:8000"));
        assert_eq!(config.autopilot.symbol, "NSE:NIFTY 50");
        assert_eq!(config.autopilot.quantity, 1);
        assert_eq!(config.polling.ltp_interval_ms, 3_000);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = ConsoleConfig::from_toml_str("unknown_key = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = ConsoleConfig::default();
        config.polling.ltp_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_heartbeat_at_watchdog_timeout() {
        let mut config = ConsoleConfig::default();
        config.autopilot.heartbeat_interval_ms = 30_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("watchdog"));

        config.autopilot.heartbeat_interval_ms = 29_999;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let mut config = ConsoleConfig::default();
        config.autopilot.quantity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_symbols() {
        let mut config = ConsoleConfig::default();
        config.symbols.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ConsoleConfig::default();
        config.apply_cli_overrides(
            Some("http://192.168.0.10:8000".to_string()),
            Some(vec!["NSE:RELIANCE".to_string()]),
        );
        assert_eq!(
            config.base_url.as_deref(),
            Some("http://192.168.0.10:8000")
        );
        assert_eq!(config.symbols, vec!["NSE:RELIANCE".to_string()]);
    }

    #[test]
    fn test_cli_empty_symbol_list_keeps_existing() {
        let mut config = ConsoleConfig::default();
        let before = config.symbols.clone();
        config.apply_cli_overrides(None, Some(Vec::new()));
        assert_eq!(config.symbols, before);
    }
}
