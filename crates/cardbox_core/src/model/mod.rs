//! Card domain model.
//!
//! # Responsibility
//! - Define the canonical card record persisted in the `cards` collection.
//! - Own tag parsing rules shared by add/update use-cases.
//!
//! # Invariants
//! - Every card is identified by a stable `CardId` assigned on creation.
//! - Deletion is a soft-delete flag, never a physical removal.

pub mod card;
