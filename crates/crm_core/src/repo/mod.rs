//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//! - Enforce every registry invariant at the store boundary.
//!
//! # Invariants
//! - Repositories hold no in-process mutable state; the store arbitrates
//!   concurrent writes through immediate transactions.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`,
//!   `Canceled`) in addition to store errors.
//! - A connection is borrowed for exactly one call and never kept.

use crate::model::context::Cancellation;

pub mod bank_account_repo;
pub mod error;
pub mod legal_entity_repo;
mod rows;
mod soft_delete;

use error::{RepoError, RepoResult};

/// Fails with `Canceled` once the caller's signal has fired.
///
/// Checked before committing so a canceled call never leaves a partial write.
pub(crate) fn ensure_not_canceled(cancel: &Cancellation) -> RepoResult<()> {
    if cancel.is_cancelled() {
        return Err(RepoError::Canceled);
    }
    Ok(())
}
