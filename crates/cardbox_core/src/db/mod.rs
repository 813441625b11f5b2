//! SQLite-backed document storage for the `cards` collection.
//!
//! # Responsibility
//! - Open and configure writer/reader connections.
//! - Apply schema migrations in deterministic order.
//! - Own the shared datastore client and its one-shot initialization.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write card data before migrations succeed.

use crate::request::Interrupt;
use rusqlite::ErrorCode;
use thiserror::Error;

mod client;
mod manager;
pub mod migrations;
mod open;

pub use client::{DatastoreClient, PoolSettings, ReadPreference};
pub use manager::{ConnectError, ConnectionManager};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("deadline exceeded before the datastore operation completed")]
    DeadlineExceeded,
    #[error("datastore operation cancelled by caller")]
    Cancelled,
}

impl DbError {
    /// Returns whether SQLite aborted a statement through the progress handler.
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == ErrorCode::OperationInterrupted
            }
            Self::DeadlineExceeded | Self::Cancelled => true,
            Self::Sqlite(_) | Self::UnsupportedSchemaVersion { .. } => false,
        }
    }
}

impl From<Interrupt> for DbError {
    fn from(value: Interrupt) -> Self {
        match value {
            Interrupt::DeadlineExceeded => Self::DeadlineExceeded,
            Interrupt::Cancelled => Self::Cancelled,
        }
    }
}
