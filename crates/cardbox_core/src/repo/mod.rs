//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define CRUD primitives over the `cards` collection.
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - Write paths call `Card::validate()` before persistence.
//! - Reads never surface soft-deleted cards.

pub mod card_repo;
