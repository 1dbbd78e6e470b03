//! Domain model for the legal entity registry.
//!
//! # Responsibility
//! - Define the records exchanged between transport, service and repository.
//! - Own field-format validation that must run before persistence.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Deletion is represented by a `deleted_at` tombstone, not hard delete.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod bank_account;
pub mod context;
pub mod legal_entity;
pub mod validation;

/// Unix epoch milliseconds.
pub type EpochMillis = i64;

/// Current wall-clock time in epoch milliseconds.
///
/// Clamps to zero if the system clock reads before the epoch.
pub fn now_epoch_ms() -> EpochMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}
