//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate query building, repository calls and the datastore client
//!   into the card use-cases.
//! - Keep transport layers decoupled from storage details.

pub mod card_service;
pub mod envelope;
pub mod error;
