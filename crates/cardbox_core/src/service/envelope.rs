//! Uniform response envelope shared by every card use-case.
//!
//! # Invariants
//! - `message` is derived from `code` through `get_message`.
//! - The payload is one of the known result shapes; anything else cannot be
//!   constructed.

use crate::model::card::{Attachment, Card};
use crate::service::error::ServiceError;
use serde::Serialize;

pub const CODE_SUCCESS: i32 = 0;
pub const CODE_FAILURE: i32 = 1;

/// Fixed code → message table.
pub fn get_message(code: i32) -> &'static str {
    match code {
        CODE_SUCCESS => "success",
        CODE_FAILURE => "failed",
        _ => "unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentView {
    pub id: String,
    pub filename: String,
    pub size: i64,
    pub content_type: String,
    pub location: String,
    pub url: String,
    pub create_time: i64,
}

impl From<&Attachment> for AttachmentView {
    fn from(value: &Attachment) -> Self {
        Self {
            id: value.id.clone(),
            filename: value.filename.clone(),
            size: value.size,
            content_type: value.content_type.clone(),
            location: value.location.clone(),
            url: value.url.clone(),
            create_time: value.created_at,
        }
    }
}

/// Single-card view returned by Get and Add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub card_id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: String,
    /// Unix epoch milliseconds.
    pub create_time: i64,
    /// Unix epoch milliseconds.
    pub update_time: i64,
    pub attachments: Vec<AttachmentView>,
}

impl From<&Card> for CardView {
    fn from(value: &Card) -> Self {
        Self {
            card_id: value.id.to_string(),
            title: value.title.clone(),
            content: value.content.clone(),
            tags: value.tags.clone(),
            status: value.status.as_str().to_string(),
            create_time: value.created_at,
            update_time: value.updated_at,
            attachments: value.attachments.iter().map(AttachmentView::from).collect(),
        }
    }
}

/// Paginated list view returned by List.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardListView {
    pub page_size: u32,
    pub page_num: u32,
    pub total_count: u64,
    pub cards: Vec<CardView>,
}

/// Known payload shapes carried by an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Card(CardView),
    CardList(CardListView),
}

impl From<CardView> for Payload {
    fn from(value: CardView) -> Self {
        Self::Card(value)
    }
}

impl From<CardListView> for Payload {
    fn from(value: CardListView) -> Self {
        Self::CardList(value)
    }
}

/// Success/failure wrapper returned by every use-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
}

impl Envelope {
    pub fn wrap(code: i32, data: Option<Payload>) -> Self {
        Self {
            code,
            message: get_message(code).to_string(),
            data,
        }
    }

    pub fn success(data: impl Into<Payload>) -> Self {
        Self::wrap(CODE_SUCCESS, Some(data.into()))
    }

    /// Success without payload (Update, Delete).
    pub fn empty() -> Self {
        Self::wrap(CODE_SUCCESS, None)
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }

    pub fn card(&self) -> Option<&CardView> {
        match &self.data {
            Some(Payload::Card(card)) => Some(card),
            _ => None,
        }
    }

    pub fn card_list(&self) -> Option<&CardListView> {
        match &self.data {
            Some(Payload::CardList(list)) => Some(list),
            _ => None,
        }
    }

    /// Serializes the envelope to its JSON wire form.
    pub fn encode(&self) -> Result<String, ServiceError> {
        serde_json::to_string(self)
            .map_err(|err| ServiceError::Internal(format!("serialize envelope failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::{get_message, Envelope, CODE_FAILURE, CODE_SUCCESS};

    #[test]
    fn message_table_is_fixed() {
        assert_eq!(get_message(CODE_SUCCESS), "success");
        assert_eq!(get_message(CODE_FAILURE), "failed");
        assert_eq!(get_message(42), "unknown");
    }

    #[test]
    fn empty_envelope_omits_data() {
        let encoded = Envelope::empty().encode().unwrap();
        assert_eq!(encoded, r#"{"code":0,"message":"success"}"#);
    }
}
