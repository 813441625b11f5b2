//! Service-level error taxonomy.

use crate::db::ConnectError;
use crate::model::card::CardValidationError;
use crate::repo::card_repo::RepoError;
use crate::request::{Interrupt, RequestContext};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of a use-case. Errors never travel with a success envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Malformed identifier or request shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// No matching non-deleted card.
    #[error("not found: {0}")]
    NotFound(String),
    /// Serialization or datastore failure.
    #[error("internal error: {0}")]
    Internal(String),
    /// Datastore unreachable after exhausting connection retries.
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("cancelled")]
    Cancelled,
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}

impl ServiceError {
    /// Stable status label for transport mapping and logs.
    pub fn status(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
            Self::Unavailable(_) => "unavailable",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Cancelled => "cancelled",
            Self::Unimplemented(_) => "unimplemented",
        }
    }

    /// Maps a repository failure, attributing interrupts to the request.
    pub(crate) fn from_repo(err: &RepoError, ctx: &RequestContext, action: &str) -> Self {
        if err.is_interrupted() {
            return match ctx.interrupt() {
                Some(Interrupt::Cancelled) => Self::Cancelled,
                _ => Self::DeadlineExceeded,
            };
        }
        match err {
            RepoError::NotFound(id) => Self::NotFound(format!("card {id}")),
            RepoError::Validation(err) => Self::InvalidArgument(err.to_string()),
            RepoError::Db(_) | RepoError::InvalidData(_) | RepoError::Encode(_) => {
                Self::Internal(format!("{action} failed"))
            }
        }
    }
}

impl From<CardValidationError> for ServiceError {
    fn from(value: CardValidationError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}

impl From<ConnectError> for ServiceError {
    fn from(value: ConnectError) -> Self {
        Self::Unavailable(value.to_string())
    }
}
