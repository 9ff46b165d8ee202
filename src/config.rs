//! Client configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Prefix for environment overrides, e.g. `AO_TICTACTOE_COMPUTE_URL`.
pub const ENV_PREFIX: &str = "AO_TICTACTOE_";

/// How the reconciler reads remote progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::EnumString, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PollMode {
    /// Page through the result log while a match is being played.
    #[default]
    Incremental,
    /// Re-fetch the full game state on every tick, in every phase.
    Snapshot,
}

/// Configuration for the game client.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Messenger unit accepting signed messages.
    messenger_url: String,
    /// Compute unit serving results and dry-runs.
    compute_url: String,
    /// Arweave GraphQL endpoint for process lookup.
    graphql_url: String,
    /// Arweave gateway for contract source.
    arweave_url: String,
    /// Local wallet bridge.
    signer_url: String,
    /// Discovery router process. Deployment specific, no default.
    router_process: String,
    /// Scheduler for spawned processes.
    scheduler: String,
    /// Transaction holding the game contract source. Deployment specific, no default.
    contract_src_txid: String,
    /// Runtime manifest (aos `package.json`).
    manifest_url: String,
    /// Reconciler tick interval.
    poll_interval_ms: u64,
    /// Reconciler mode.
    poll_mode: PollMode,
    /// Result-log page size.
    page_size: usize,
    /// Attempts for retried provisioning steps.
    provision_attempts: u32,
    /// Delay between provisioning attempts.
    provision_backoff_ms: u64,
    /// HTTP request timeout.
    request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            messenger_url: "https://mu.ao-testnet.xyz".to_string(),
            compute_url: "https://cu.ao-testnet.xyz".to_string(),
            graphql_url: "https://arweave.net/graphql".to_string(),
            arweave_url: "https://arweave.net".to_string(),
            signer_url: "http://127.0.0.1:4422".to_string(),
            router_process: String::new(),
            scheduler: "_GQ33BkPtZrqxA84vM8Zk-N2aO0toNNu_C-l-rawrBA".to_string(),
            contract_src_txid: String::new(),
            manifest_url: "https://raw.githubusercontent.com/permaweb/aos/main/package.json"
                .to_string(),
            poll_interval_ms: 2000,
            poll_mode: PollMode::Incremental,
            page_size: 10,
            provision_attempts: 5,
            provision_backoff_ms: 3000,
            request_timeout_ms: 30_000,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        info!(compute_url = %config.compute_url, "Config loaded successfully");
        Ok(config)
    }

    /// Loads the file if it exists, otherwise starts from defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            debug!("No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Applies `AO_TICTACTOE_*` environment overrides.
    #[instrument(skip(self))]
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Applies overrides from `lookup`, keyed by upper-case field name.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let strings: [(&str, &mut String); 9] = [
            ("MESSENGER_URL", &mut self.messenger_url),
            ("COMPUTE_URL", &mut self.compute_url),
            ("GRAPHQL_URL", &mut self.graphql_url),
            ("ARWEAVE_URL", &mut self.arweave_url),
            ("SIGNER_URL", &mut self.signer_url),
            ("ROUTER_PROCESS", &mut self.router_process),
            ("SCHEDULER", &mut self.scheduler),
            ("CONTRACT_SRC_TXID", &mut self.contract_src_txid),
            ("MANIFEST_URL", &mut self.manifest_url),
        ];
        for (key, field) in strings {
            if let Some(value) = lookup(key) {
                debug!(key, "Environment override");
                *field = value;
            }
        }

        if let Some(value) = lookup("POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse_number("POLL_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("POLL_MODE") {
            self.poll_mode = value
                .parse()
                .map_err(|_| ConfigError::new(format!("Invalid POLL_MODE: {}", value)))?;
        }
        if let Some(value) = lookup("PAGE_SIZE") {
            self.page_size = parse_number("PAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("PROVISION_ATTEMPTS") {
            self.provision_attempts = parse_number("PROVISION_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("PROVISION_BACKOFF_MS") {
            self.provision_backoff_ms = parse_number("PROVISION_BACKOFF_MS", &value)?;
        }
        if let Some(value) = lookup("REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_number("REQUEST_TIMEOUT_MS", &value)?;
        }
        self.validate()
    }

    /// Rejects settings the client cannot run with.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::new("poll_interval_ms must be positive".to_string()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::new("page_size must be positive".to_string()));
        }
        if self.provision_attempts == 0 {
            return Err(ConfigError::new("provision_attempts must be positive".to_string()));
        }
        Ok(self)
    }

    /// Fails unless `field` holds a value; for deployment-specific settings.
    #[track_caller]
    pub fn require(&self, field: &str) -> Result<&str, ConfigError> {
        let value = match field {
            "router_process" => &self.router_process,
            "contract_src_txid" => &self.contract_src_txid,
            "signer_url" => &self.signer_url,
            other => return Err(ConfigError::new(format!("Unknown setting: {}", other))),
        };
        if value.trim().is_empty() {
            return Err(ConfigError::new(format!(
                "{} is not set (config file or {}{})",
                field,
                ENV_PREFIX,
                field.to_uppercase()
            )));
        }
        Ok(value)
    }

    /// Reconciler tick interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay between provisioning attempts.
    pub fn provision_backoff(&self) -> Duration {
        Duration::from_millis(self.provision_backoff_ms)
    }

    /// Overrides the poll mode.
    pub fn with_poll_mode(mut self, mode: PollMode) -> Self {
        self.poll_mode = mode;
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::new(format!("Invalid {}: {}", key, value)))
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(*config.page_size(), 10);
        assert_eq!(*config.provision_attempts(), 5);
        assert_eq!(config.provision_backoff(), Duration::from_secs(3));
        assert_eq!(*config.poll_mode(), PollMode::Incremental);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "compute_url = \"http://localhost:6363\"\npoll_mode = \"snapshot\"").unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.compute_url(), "http://localhost:6363");
        assert_eq!(*config.poll_mode(), PollMode::Snapshot);
        assert_eq!(*config.page_size(), 10);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("ROUTER_PROCESS", "router-1"),
            ("POLL_INTERVAL_MS", "500"),
            ("POLL_MODE", "snapshot"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.router_process(), "router-1");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(*config.poll_mode(), PollMode::Snapshot);
    }

    #[test]
    fn test_require_deployment_settings() {
        let config = ClientConfig::default();
        assert!(config.require("router_process").is_err());

        let config = config
            .with_overrides(|key| (key == "ROUTER_PROCESS").then(|| "router-1".to_string()))
            .unwrap();
        assert_eq!(config.require("router_process").unwrap(), "router-1");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let result = ClientConfig::default().with_overrides(|key| {
            (key == "PAGE_SIZE").then(|| "lots".to_string())
        });
        assert!(result.is_err());

        let result = ClientConfig::default().with_overrides(|key| {
            (key == "POLL_INTERVAL_MS").then(|| "0".to_string())
        });
        assert!(result.is_err());
    }
}
