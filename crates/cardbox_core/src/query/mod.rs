//! List query construction.
//!
//! # Responsibility
//! - Translate untrusted filter/sort/pagination input into a `CardQuery`.
//!
//! # Invariants
//! - Only allow-listed fields reach the storage layer; field names are
//!   compiled-in enums, never request text.
//! - Every list query excludes soft-deleted cards.

pub mod builder;
