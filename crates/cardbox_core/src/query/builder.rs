//! Safe filter/sort/pagination builder for card listing.
//!
//! # Responsibility
//! - Parse `field:value` filters and an order-by field against fixed
//!   allow-lists.
//! - Normalize page size/number and derive `skip`.
//!
//! # Invariants
//! - Malformed or unknown input is dropped and logged, never rejected.
//! - Unknown sort fields fall back to `created_at` descending.
//! - Page size is clamped to `MAX_PAGE_SIZE`.

use log::warn;
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_PAGE_NUM: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Fields a caller may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterField {
    Status,
    Title,
}

impl FilterField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "status" => Some(Self::Status),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    /// Document field / column name.
    pub fn column(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Title => "title",
        }
    }
}

/// Fields a caller may sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Title,
}

impl SortField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Descending,
        }
    }
}

/// Effective 1-based pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: u32,
    pub page_num: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_num: DEFAULT_PAGE_NUM,
        }
    }
}

impl Pagination {
    /// Normalizes requested values: absent or zero means default.
    pub fn new(page_size: Option<u32>, page_num: Option<u32>) -> Self {
        let page_size = match page_size {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(value) => value.min(MAX_PAGE_SIZE),
        };
        let page_num = match page_num {
            None | Some(0) => DEFAULT_PAGE_NUM,
            Some(value) => value,
        };
        Self {
            page_size,
            page_num,
        }
    }

    /// `(page_num - 1) * page_size`.
    pub fn skip(self) -> u64 {
        u64::from(self.page_num - 1) * u64::from(self.page_size)
    }

    pub fn limit(self) -> u64 {
        u64::from(self.page_size)
    }
}

/// Fully validated list query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardQuery {
    filters: BTreeMap<FilterField, String>,
    sort: SortSpec,
    pagination: Pagination,
}

impl CardQuery {
    /// Equality constraints in stable field order.
    pub fn filters(&self) -> impl Iterator<Item = (FilterField, &str)> {
        self.filters
            .iter()
            .map(|(field, value)| (*field, value.as_str()))
    }

    pub fn filter_value(&self, field: FilterField) -> Option<&str> {
        self.filters.get(&field).map(String::as_str)
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }
}

/// Builds a `CardQuery` from raw request input.
///
/// Rejections are logged against `request_id`.
#[derive(Debug)]
pub struct QueryBuilder<'a> {
    request_id: &'a str,
    query: CardQuery,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(request_id: &'a str) -> Self {
        Self {
            request_id,
            query: CardQuery::default(),
        }
    }

    /// Applies comma-separated `field:value` pairs.
    ///
    /// Each item is split on its first `:`; items without two non-empty parts
    /// and fields outside the allow-list are dropped. A repeated field keeps
    /// its last value.
    pub fn filter(mut self, raw: &str) -> Self {
        if raw.is_empty() {
            return self;
        }

        for item in raw.split(',') {
            let Some((name, value)) = item
                .split_once(':')
                .filter(|(name, value)| !name.is_empty() && !value.is_empty())
            else {
                warn!(
                    "event=card_list_filter module=query status=dropped reason=malformed request_id={} item={:?}",
                    self.request_id, item
                );
                continue;
            };

            match FilterField::parse(name) {
                Some(field) => {
                    self.query.filters.insert(field, value.to_string());
                }
                None => warn!(
                    "event=card_list_filter module=query status=dropped reason=field_not_allowed request_id={} field={:?}",
                    self.request_id, name
                ),
            }
        }
        self
    }

    /// Sorts ascending by an allow-listed field, else newest first.
    pub fn order_by(mut self, raw: Option<&str>) -> Self {
        self.query.sort = match raw.filter(|name| !name.is_empty()) {
            None => SortSpec::default(),
            Some(name) => match SortField::parse(name) {
                Some(field) => SortSpec {
                    field,
                    direction: SortDirection::Ascending,
                },
                None => {
                    warn!(
                        "event=card_list_sort module=query status=fallback reason=field_not_allowed request_id={} order_by={:?}",
                        self.request_id, name
                    );
                    SortSpec::default()
                }
            },
        };
        self
    }

    pub fn paginate(mut self, page_size: Option<u32>, page_num: Option<u32>) -> Self {
        if page_size.is_some_and(|size| size > MAX_PAGE_SIZE) {
            warn!(
                "event=card_list_page module=query status=clamped request_id={} requested={:?} applied={}",
                self.request_id, page_size, MAX_PAGE_SIZE
            );
        }
        self.query.pagination = Pagination::new(page_size, page_num);
        self
    }

    pub fn build(self) -> CardQuery {
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterField, QueryBuilder, SortDirection, SortField};

    #[test]
    fn filter_value_keeps_text_after_first_colon() {
        let query = QueryBuilder::new("t").filter("title:a:b").build();
        assert_eq!(query.filter_value(FilterField::Title), Some("a:b"));
    }

    #[test]
    fn repeated_filter_field_keeps_last_value() {
        let query = QueryBuilder::new("t")
            .filter("status:active,status:removed")
            .build();
        assert_eq!(query.filter_value(FilterField::Status), Some("removed"));
    }

    #[test]
    fn empty_order_by_uses_default_sort() {
        let query = QueryBuilder::new("t").order_by(Some("")).build();
        assert_eq!(query.sort().field, SortField::CreatedAt);
        assert_eq!(query.sort().direction, SortDirection::Descending);
    }
}
