//! Card use-case service.
//!
//! # Responsibility
//! - Provide Get/List/Add/Update/Delete entry points for transport layers.
//! - Map storage outcomes onto the service error taxonomy and envelope.
//!
//! # Invariants
//! - Identifiers are validated before any datastore round-trip.
//! - An absent datastore client is `Unavailable`, never a silent no-op.
//! - CRUD calls are not retried; only client establishment retries.
//! - Update always refreshes `updated_at` when the card exists, even when no
//!   optional field is supplied.

use crate::db::{ConnectionManager, DatastoreClient};
use crate::model::card::{now_epoch_ms, parse_card_id, split_tags, Card, CardId};
use crate::query::builder::QueryBuilder;
use crate::repo::card_repo::{CardPatch, CardRepository, RepoError, SqliteCardRepository};
use crate::request::RequestContext;
use crate::service::envelope::{CardListView, CardView, Envelope};
use crate::service::error::{ServiceError, ServiceResult};
use log::{error, info, warn};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCardRequest {
    pub card_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCardsRequest {
    /// Comma-separated `field:value` pairs.
    pub filter: String,
    pub order_by: Option<String>,
    pub page_size: Option<u32>,
    pub page_num: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddCardRequest {
    pub title: String,
    pub content: String,
    /// `#`-delimited tags.
    pub tags: String,
}

/// Partial update. `None` leaves a field untouched; `Some("")` for `tags`
/// clears them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCardRequest {
    pub card_id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCardRequest {
    pub card_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub card_id: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Card use-cases over the shared datastore client.
#[derive(Debug, Clone)]
pub struct CardService {
    connections: Arc<ConnectionManager>,
}

impl CardService {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    /// Returns one non-deleted card.
    ///
    /// # Errors
    /// - `InvalidArgument` for a malformed id.
    /// - `NotFound` when the card is absent or soft-deleted.
    pub fn get_card(
        &self,
        ctx: &RequestContext,
        request: &GetCardRequest,
    ) -> ServiceResult<Envelope> {
        let card_id = self.parse_id(ctx, "card_get", &request.card_id)?;
        let client = self.client(ctx, "card_get")?;

        let found = client
            .with_reader(ctx, |conn| SqliteCardRepository::new(conn).find_one(card_id))
            .map_err(|err| repo_failure(ctx, "card_get", Some(card_id), &err))?;

        let Some(card) = found else {
            warn!(
                "event=card_get module=service status=not_found request_id={} card_id={}",
                ctx.request_id(),
                card_id
            );
            return Err(ServiceError::NotFound(format!("card {card_id}")));
        };

        info!(
            "event=card_get module=service status=ok request_id={} card_id={}",
            ctx.request_id(),
            card_id
        );
        Ok(Envelope::success(CardView::from(&card)))
    }

    /// Lists non-deleted cards with allow-listed filters, sort and paging.
    ///
    /// Rows that fail to decode are logged and skipped; `total_count` still
    /// counts them.
    pub fn list_cards(
        &self,
        ctx: &RequestContext,
        request: &ListCardsRequest,
    ) -> ServiceResult<Envelope> {
        let query = QueryBuilder::new(ctx.request_id())
            .filter(&request.filter)
            .order_by(request.order_by.as_deref())
            .paginate(request.page_size, request.page_num)
            .build();
        let client = self.client(ctx, "card_list")?;

        let (total_count, batch) = client
            .with_reader(ctx, |conn| {
                let repo = SqliteCardRepository::new(conn);
                let total_count = repo.count(&query)?;
                let batch = repo.find_many(&query)?;
                Ok::<_, RepoError>((total_count, batch))
            })
            .map_err(|err| repo_failure(ctx, "card_list", None, &err))?;

        for failure in &batch.skipped {
            error!(
                "event=card_decode module=service status=skipped request_id={} card_id={} error={}",
                ctx.request_id(),
                failure.id.as_deref().unwrap_or("unknown"),
                failure.reason
            );
        }

        let page = query.pagination();
        info!(
            "event=card_list module=service status=ok request_id={} total={} returned={} skipped={} page_size={} page_num={}",
            ctx.request_id(),
            total_count,
            batch.cards.len(),
            batch.skipped.len(),
            page.page_size,
            page.page_num
        );

        Ok(Envelope::success(CardListView {
            page_size: page.page_size,
            page_num: page.page_num,
            total_count,
            cards: batch.cards.iter().map(CardView::from).collect(),
        }))
    }

    /// Creates an active card with fresh id and identical timestamps.
    pub fn add_card(
        &self,
        ctx: &RequestContext,
        request: &AddCardRequest,
    ) -> ServiceResult<Envelope> {
        let card = Card::new(
            request.title.as_str(),
            request.content.as_str(),
            split_tags(&request.tags),
        );
        let client = self.client(ctx, "card_add")?;

        client
            .with_writer(ctx, |conn| SqliteCardRepository::new(conn).insert(&card))
            .map_err(|err| repo_failure(ctx, "card_add", Some(card.id), &err))?;

        info!(
            "event=card_add module=service status=ok request_id={} caller={} card_id={} tags={}",
            ctx.request_id(),
            caller_label(ctx),
            card.id,
            card.tags.len()
        );
        Ok(Envelope::success(CardView::from(&card)))
    }

    /// Applies a partial update to a non-deleted card.
    ///
    /// Lookup and write both run on the writer so the existence check is
    /// never answered by a stale reader.
    pub fn update_card(
        &self,
        ctx: &RequestContext,
        request: &UpdateCardRequest,
    ) -> ServiceResult<Envelope> {
        let card_id = self.parse_id(ctx, "card_update", &request.card_id)?;
        let patch = CardPatch {
            title: request.title.clone(),
            content: request.content.clone(),
            tags: request.tags.as_deref().map(split_tags),
        };
        let client = self.client(ctx, "card_update")?;

        client
            .with_writer(ctx, |conn| {
                let repo = SqliteCardRepository::new(conn);
                if repo.find_one(card_id)?.is_none() {
                    return Err(RepoError::NotFound(card_id));
                }
                repo.update(card_id, &patch, now_epoch_ms())
            })
            .map_err(|err| repo_failure(ctx, "card_update", Some(card_id), &err))?;

        info!(
            "event=card_update module=service status=ok request_id={} caller={} card_id={} title={} content={} tags={}",
            ctx.request_id(),
            caller_label(ctx),
            card_id,
            patch.title.is_some(),
            patch.content.is_some(),
            patch.tags.is_some()
        );
        Ok(Envelope::empty())
    }

    /// Soft-deletes a card. Irreversible; a second delete is `NotFound`.
    pub fn delete_card(
        &self,
        ctx: &RequestContext,
        request: &DeleteCardRequest,
    ) -> ServiceResult<Envelope> {
        let card_id = self.parse_id(ctx, "card_delete", &request.card_id)?;
        let client = self.client(ctx, "card_delete")?;

        client
            .with_writer(ctx, |conn| {
                SqliteCardRepository::new(conn).soft_delete(card_id, now_epoch_ms())
            })
            .map_err(|err| repo_failure(ctx, "card_delete", Some(card_id), &err))?;

        info!(
            "event=card_delete module=service status=ok request_id={} caller={} card_id={}",
            ctx.request_id(),
            caller_label(ctx),
            card_id
        );
        Ok(Envelope::empty())
    }

    /// Attachment upload belongs to the object-storage subsystem.
    pub fn upload(&self, ctx: &RequestContext, request: &UploadRequest) -> ServiceResult<Envelope> {
        warn!(
            "event=card_upload module=service status=unimplemented request_id={} card_id={} filename={:?} bytes={}",
            ctx.request_id(),
            request.card_id,
            request.filename,
            request.data.len()
        );
        Err(ServiceError::Unimplemented("attachment upload"))
    }

    fn parse_id(&self, ctx: &RequestContext, event: &str, raw: &str) -> ServiceResult<CardId> {
        parse_card_id(raw).map_err(|err| {
            warn!(
                "event={} module=service status=invalid_argument request_id={} card_id={:?}",
                event,
                ctx.request_id(),
                raw
            );
            ServiceError::from(err)
        })
    }

    fn client(&self, ctx: &RequestContext, event: &str) -> ServiceResult<Arc<DatastoreClient>> {
        self.connections.get_client().map_err(|err| {
            error!(
                "event={} module=service status=unavailable request_id={} error={}",
                event,
                ctx.request_id(),
                err
            );
            ServiceError::from(err)
        })
    }
}

/// Identity recorded on mutation events.
fn caller_label(ctx: &RequestContext) -> &str {
    ctx.caller().unwrap_or("anonymous")
}

fn repo_failure(
    ctx: &RequestContext,
    event: &str,
    card_id: Option<CardId>,
    err: &RepoError,
) -> ServiceError {
    let mapped = ServiceError::from_repo(err, ctx, event);
    let card_id = card_id.map(|id| id.to_string()).unwrap_or_default();
    match &mapped {
        ServiceError::NotFound(_) => warn!(
            "event={} module=service status=not_found request_id={} card_id={}",
            event,
            ctx.request_id(),
            card_id
        ),
        other => error!(
            "event={} module=service status={} request_id={} card_id={} error={}",
            event,
            other.status(),
            ctx.request_id(),
            card_id,
            err
        ),
    }
    mapped
}
