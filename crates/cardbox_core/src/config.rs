//! Application configuration.
//!
//! # Responsibility
//! - Load the TOML configuration file into typed settings.
//! - Supply datastore address, credentials, pool sizing and timeouts.
//!
//! # Invariants
//! - Every field has a default, so an empty file is a valid configuration.
//! - Credentials never appear in `Debug` output or logs.

use crate::db::{PoolSettings, ReadPreference};
use crate::logging::default_log_level;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub datastore: DatastoreConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parses configuration from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads `path` when it exists, otherwise returns validated defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.datastore.validate()
    }
}

/// Datastore connection settings (`[datastore]`).
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatastoreConfig {
    /// Database path or `file:` URI. `{username}` and `{password}`
    /// placeholders are substituted from the credential fields.
    pub address: String,
    pub username: String,
    pub password: String,
    pub min_pool_size: usize,
    pub max_pool_size: usize,
    pub max_conn_idle_time_secs: u64,
    pub connection_timeout_secs: u64,
    pub read_preference: ReadPreference,
    pub connect_retries: u32,
    pub retry_delay_ms: u64,
    /// Whether a failed establishment may be retried after `rearm_after_secs`.
    pub rearm_on_failure: bool,
    pub rearm_after_secs: u64,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            address: "cardbox.db".to_string(),
            username: String::new(),
            password: String::new(),
            min_pool_size: 1,
            max_pool_size: 8,
            max_conn_idle_time_secs: 300,
            connection_timeout_secs: 5,
            read_preference: ReadPreference::SecondaryPreferred,
            connect_retries: 3,
            retry_delay_ms: 500,
            rearm_on_failure: true,
            rearm_after_secs: 30,
        }
    }
}

impl DatastoreConfig {
    /// Returns `address` with credential placeholders substituted.
    pub fn expanded_address(&self) -> String {
        self.address
            .replace("{username}", &self.username)
            .replace("{password}", &self.password)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            min_size: self.min_pool_size,
            max_size: self.max_pool_size,
            max_idle: Duration::from_secs(self.max_conn_idle_time_secs),
            busy_timeout: self.connection_timeout(),
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Window after which a memoized connect failure may be retried.
    pub fn rearm_after(&self) -> Option<Duration> {
        self.rearm_on_failure
            .then(|| Duration::from_secs(self.rearm_after_secs))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "datastore.address cannot be empty".to_string(),
            ));
        }
        if self.max_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "datastore.max_pool_size must be at least 1".to_string(),
            ));
        }
        if self.min_pool_size > self.max_pool_size {
            return Err(ConfigError::Invalid(format!(
                "datastore.min_pool_size ({}) exceeds max_pool_size ({})",
                self.min_pool_size, self.max_pool_size
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for DatastoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let password = if self.password.is_empty() { "" } else { "***" };
        f.debug_struct("DatastoreConfig")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &password)
            .field("min_pool_size", &self.min_pool_size)
            .field("max_pool_size", &self.max_pool_size)
            .field("max_conn_idle_time_secs", &self.max_conn_idle_time_secs)
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .field("read_preference", &self.read_preference)
            .field("connect_retries", &self.connect_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("rearm_on_failure", &self.rearm_on_failure)
            .field("rearm_after_secs", &self.rearm_after_secs)
            .finish()
    }
}

/// Logging settings (`[logging]`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; build-mode default when absent.
    pub level: Option<String>,
    /// Absolute directory for the log file; stderr when absent.
    pub dir: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(default_log_level())
    }
}
