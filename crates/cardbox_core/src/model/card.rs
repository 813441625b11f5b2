//! Card domain model.
//!
//! # Responsibility
//! - Define the card record and its owned attachments.
//! - Provide identifier parsing and tag splitting helpers.
//!
//! # Invariants
//! - `id` never changes after creation.
//! - `deleted` is monotonic: once `true` it is never reset by core.
//! - `tags` never contain empty strings.
//! - `updated_at` is never earlier than `created_at`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Store identifier for a card (`_id` in the document contract).
pub type CardId = Uuid;

/// Delimiter used by request-level tag strings (`"work#urgent"`).
pub const TAG_DELIMITER: char = '#';

/// Lifecycle status persisted in the `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    /// Visible and mutable.
    Active,
    /// Logically removed by a soft delete.
    Removed,
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Removed => "removed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }
}

/// File metadata owned by exactly one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    /// Size in bytes.
    pub size: i64,
    pub content_type: String,
    /// Storage location inside the object store.
    pub location: String,
    pub url: String,
    /// Unix epoch milliseconds. Older documents may omit it.
    #[serde(default)]
    pub created_at: i64,
}

/// Validation failures for card identity and state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardValidationError {
    #[error("invalid card id `{0}`")]
    InvalidId(String),
    #[error("card id must not be nil")]
    NilId,
    #[error("card tags must not contain empty values")]
    EmptyTag,
    #[error("updated_at ({updated_at}) is earlier than created_at ({created_at})")]
    UpdatedBeforeCreated { created_at: i64, updated_at: i64 },
}

/// Canonical card record.
///
/// Serialized field names follow the datastore document contract so that
/// backfill tooling can rely on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(rename = "_id")]
    pub id: CardId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: CardStatus,
    pub attachments: Vec<Attachment>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed on every mutation.
    pub updated_at: i64,
    pub deleted: bool,
}

impl Card {
    /// Creates an active card with a generated id and identical timestamps.
    pub fn new(title: impl Into<String>, content: impl Into<String>, tags: Vec<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, content, tags, now_epoch_ms())
    }

    /// Creates an active card with a caller-provided id and creation time.
    ///
    /// Used by import paths and tests where identity already exists.
    pub fn with_id(
        id: CardId,
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            tags,
            status: CardStatus::Active,
            attachments: Vec::new(),
            created_at,
            updated_at: created_at,
            deleted: false,
        }
    }

    /// Returns whether reads should surface this card.
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    /// Checks write-path invariants before persistence.
    pub fn validate(&self) -> Result<(), CardValidationError> {
        if self.id.is_nil() {
            return Err(CardValidationError::NilId);
        }
        if self.tags.iter().any(String::is_empty) {
            return Err(CardValidationError::EmptyTag);
        }
        if self.updated_at < self.created_at {
            return Err(CardValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }
}

/// Parses a request-supplied card id.
pub fn parse_card_id(raw: &str) -> Result<CardId, CardValidationError> {
    Uuid::parse_str(raw.trim()).map_err(|_| CardValidationError::InvalidId(raw.to_string()))
}

/// Splits a `#`-delimited tag string, dropping empty segments.
///
/// Order and duplicates are preserved: `"a#b##c#"` yields `["a", "b", "c"]`.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(TAG_DELIMITER)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
