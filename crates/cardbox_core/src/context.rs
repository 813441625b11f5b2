//! Application context built once at startup.
//!
//! # Responsibility
//! - Own the configuration and the shared `ConnectionManager`.
//! - Hand out use-case services that share the same datastore client.
//!
//! # Invariants
//! - Exactly one `ConnectionManager` exists per context.
//! - Constructing a context never touches the datastore; the client is
//!   established lazily on first use.

use crate::config::{AppConfig, ConfigError};
use crate::db::ConnectionManager;
use crate::service::card_service::CardService;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppContext {
    config: Arc<AppConfig>,
    connections: Arc<ConnectionManager>,
}

impl AppContext {
    /// Validates `config` and prepares the lazily-connected datastore.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let connections = Arc::new(ConnectionManager::new(config.datastore.clone()));
        Ok(Self {
            config: Arc::new(config),
            connections,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn card_service(&self) -> CardService {
        CardService::new(Arc::clone(&self.connections))
    }
}
