//! Card repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide find-one, find-many, count, insert, update and soft-delete
//!   primitives over the `cards` collection.
//! - Keep SQL and column encoding inside the persistence boundary.
//!
//! # Invariants
//! - Every read and conditional write is constrained to `deleted = 0`.
//! - `find_many` skips rows it cannot decode and reports them; a failure of
//!   the row cursor itself aborts the whole call.
//! - Column names only come from `FilterField`/`SortField`, values are bound.

use crate::db::DbError;
use crate::model::card::{Attachment, Card, CardId, CardStatus, CardValidationError};
use crate::query::builder::CardQuery;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use thiserror::Error;
use uuid::Uuid;

const CARD_SELECT_SQL: &str = "SELECT
    _id,
    title,
    content,
    tags,
    status,
    attachments,
    created_at,
    updated_at,
    deleted
FROM cards";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for card persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] CardValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("card not found: {0}")]
    NotFound(CardId),
    #[error("invalid persisted card data: {0}")]
    InvalidData(String),
    #[error("failed to encode card field: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RepoError {
    /// Returns whether the caller's deadline or cancellation stopped the call.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_interrupted())
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }
}

/// A row that could not be decoded during `find_many`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    /// Raw `_id` when it was readable.
    pub id: Option<String>,
    pub reason: String,
}

/// Page of decoded cards plus the rows skipped on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardBatch {
    pub cards: Vec<Card>,
    pub skipped: Vec<DecodeFailure>,
}

/// Repository interface for card CRUD operations.
pub trait CardRepository {
    fn find_one(&self, id: CardId) -> RepoResult<Option<Card>>;
    fn find_many(&self, query: &CardQuery) -> RepoResult<CardBatch>;
    fn count(&self, query: &CardQuery) -> RepoResult<u64>;
    fn insert(&self, card: &Card) -> RepoResult<CardId>;
    /// Applies `patch` and stamps `updated_at`, clamped to `created_at`;
    /// `NotFound` when nothing matched.
    fn update(&self, id: CardId, patch: &CardPatch, updated_at: i64) -> RepoResult<()>;
    /// Flags the card deleted; `NotFound` when absent or already deleted.
    fn soft_delete(&self, id: CardId, updated_at: i64) -> RepoResult<()>;
}

/// SQLite-backed card repository.
pub struct SqliteCardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCardRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CardRepository for SqliteCardRepository<'_> {
    fn find_one(&self, id: CardId) -> RepoResult<Option<Card>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CARD_SELECT_SQL}
             WHERE _id = ?1
               AND deleted = 0;"
        ))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(decode_card_row(row)?));
        }

        Ok(None)
    }

    fn find_many(&self, query: &CardQuery) -> RepoResult<CardBatch> {
        let (where_sql, mut bind_values) = where_clause(query);
        let sort = query.sort();
        let page = query.pagination();
        let sql = format!(
            "{CARD_SELECT_SQL}{where_sql} ORDER BY {} {}, _id ASC LIMIT ? OFFSET ?",
            sort.field.column(),
            sort.direction.keyword()
        );
        bind_values.push(Value::Integer(to_sql_int(page.limit())));
        bind_values.push(Value::Integer(to_sql_int(page.skip())));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut batch = CardBatch::default();

        while let Some(row) = rows.next()? {
            match decode_card_row(row) {
                Ok(card) => batch.cards.push(card),
                Err(err) => batch.skipped.push(DecodeFailure {
                    id: row.get::<_, String>("_id").ok(),
                    reason: err.to_string(),
                }),
            }
        }

        Ok(batch)
    }

    fn count(&self, query: &CardQuery) -> RepoResult<u64> {
        let (where_sql, bind_values) = where_clause(query);
        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM cards{where_sql};"),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        u64::try_from(total).map_err(|_| RepoError::InvalidData(format!("negative count {total}")))
    }

    fn insert(&self, card: &Card) -> RepoResult<CardId> {
        card.validate()?;

        self.conn.execute(
            "INSERT INTO cards (
                _id,
                title,
                content,
                tags,
                status,
                attachments,
                created_at,
                updated_at,
                deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                card.id.to_string(),
                card.title.as_str(),
                card.content.as_str(),
                serde_json::to_string(&card.tags)?,
                card.status.as_str(),
                serde_json::to_string(&card.attachments)?,
                card.created_at,
                card.updated_at,
                card.deleted,
            ],
        )?;

        Ok(card.id)
    }

    fn update(&self, id: CardId, patch: &CardPatch, updated_at: i64) -> RepoResult<()> {
        if patch
            .tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(String::is_empty))
        {
            return Err(CardValidationError::EmptyTag.into());
        }

        let mut assignments = vec!["updated_at = MAX(created_at, ?)"];
        let mut bind_values = vec![Value::Integer(updated_at)];
        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(content) = &patch.content {
            assignments.push("content = ?");
            bind_values.push(Value::Text(content.clone()));
        }
        if let Some(tags) = &patch.tags {
            assignments.push("tags = ?");
            bind_values.push(Value::Text(serde_json::to_string(tags)?));
        }
        bind_values.push(Value::Text(id.to_string()));

        let changed = self.conn.execute(
            &format!(
                "UPDATE cards SET {} WHERE _id = ? AND deleted = 0;",
                assignments.join(", ")
            ),
            params_from_iter(bind_values),
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn soft_delete(&self, id: CardId, updated_at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE cards
             SET
                deleted = 1,
                status = ?2,
                updated_at = MAX(created_at, ?3)
             WHERE _id = ?1
               AND deleted = 0;",
            params![id.to_string(), CardStatus::Removed.as_str(), updated_at],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn where_clause(query: &CardQuery) -> (String, Vec<Value>) {
    let mut sql = String::from(" WHERE deleted = 0");
    let mut bind_values = Vec::new();
    for (field, value) in query.filters() {
        sql.push_str(" AND ");
        sql.push_str(field.column());
        sql.push_str(" = ?");
        bind_values.push(Value::Text(value.to_string()));
    }
    (sql, bind_values)
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn decode_card_row(row: &Row<'_>) -> RepoResult<Card> {
    let id_text: String = row.get("_id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid id value `{id_text}` in cards._id"))
    })?;

    let status_text: String = row.get("status")?;
    let status = CardStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in cards.status"))
    })?;

    let tags_text: String = row.get("tags")?;
    let tags: Vec<String> = serde_json::from_str(&tags_text)
        .map_err(|err| RepoError::InvalidData(format!("invalid cards.tags for {id}: {err}")))?;

    let attachments_text: String = row.get("attachments")?;
    let attachments: Vec<Attachment> = serde_json::from_str(&attachments_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid cards.attachments for {id}: {err}"))
    })?;

    let deleted = match row.get::<_, i64>("deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid deleted value `{other}` in cards.deleted"
            )));
        }
    };

    Ok(Card {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        tags,
        status,
        attachments,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted,
    })
}
