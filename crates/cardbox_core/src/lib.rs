//! Core domain logic for cardbox.
//! This crate owns the card persistence and use-case layer.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod request;
pub mod retry;
pub mod service;

pub use config::{AppConfig, ConfigError, DatastoreConfig, LoggingConfig};
pub use context::AppContext;
pub use db::{ConnectError, ConnectionManager, DatastoreClient, ReadPreference};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::card::{split_tags, Attachment, Card, CardId, CardStatus, CardValidationError};
pub use query::builder::{CardQuery, FilterField, Pagination, QueryBuilder, SortDirection, SortField};
pub use repo::card_repo::{CardPatch, CardRepository, RepoError, RepoResult, SqliteCardRepository};
pub use request::{CancelHandle, Interrupt, RequestContext};
pub use service::card_service::{
    AddCardRequest, CardService, DeleteCardRequest, GetCardRequest, ListCardsRequest,
    UpdateCardRequest, UploadRequest,
};
pub use service::envelope::{CardListView, CardView, Envelope, Payload};
pub use service::error::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
