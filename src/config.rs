use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub account_service: AccountServiceConfig,
    pub transaction_service: TransactionServiceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccountServiceConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL URL for the ledger. `None` runs on the in-memory store.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Bounded wait for each account row lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransactionServiceConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub database_url: Option<String>,
    /// Base URL of the account service, e.g. `http://127.0.0.1:8081`
    pub account_service_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

/// Stale-pending reconciliation (off unless enabled)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReconcilerConfig {
    pub enabled: bool,
    pub scan_interval_ms: u64,
    pub stale_threshold_ms: u64,
    pub batch_size: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scan_interval_ms: 30_000,
            stale_threshold_ms: 60_000,
            batch_size: 100,
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl AccountServiceConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl TransactionServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml` and apply environment overrides
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let mut config = Self::from_file(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// DSNs and the account service URL usually come from the deployment
    /// environment rather than the checked-in yaml.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dsn) = lookup("ACCOUNT_DATABASE_DSN").filter(|v| !v.is_empty()) {
            self.account_service.database_url = Some(dsn);
        }
        if let Some(dsn) = lookup("TRANSACTION_DATABASE_DSN").filter(|v| !v.is_empty()) {
            self.transaction_service.database_url = Some(dsn);
        }
        if let Some(url) = lookup("ACCOUNT_SERVICE_URL").filter(|v| !v.is_empty()) {
            self.transaction_service.account_service_url = url;
        }
    }
}

/// `--env <name>` / `-e <name>`, defaulting to `dev`
pub fn env_from_args(args: &[String]) -> String {
    args.windows(2)
        .find(|w| w[0] == "--env" || w[0] == "-e")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "dev".to_string())
}

/// `--port <n>` overriding the yaml port
pub fn port_from_args(args: &[String]) -> Option<u16> {
    args.windows(2)
        .find(|w| w[0] == "--port")
        .and_then(|w| w[1].parse().ok())
}
