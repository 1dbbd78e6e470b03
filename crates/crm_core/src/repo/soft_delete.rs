//! Soft-delete predicate and tombstone writes shared by all repositories.
//!
//! # Invariants
//! - Every read/update/delete query filters with [`NOT_DELETED`].
//! - A tombstone write touches only rows that are still live, so deleting
//!   twice affects zero rows the second time.

use crate::model::EpochMillis;
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Predicate selecting live rows. Interpolate into every query.
pub(crate) const NOT_DELETED: &str = "deleted_at IS NULL";

/// Tables that carry a `deleted_at` tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SoftDeleteTable {
    LegalEntities,
    BankAccounts,
}

impl SoftDeleteTable {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::LegalEntities => "legal_entities",
            Self::BankAccounts => "bank_accounts",
        }
    }
}

/// Stamps `deleted_at` on one live row and returns the affected count.
pub(crate) fn soft_delete_by_id(
    conn: &Connection,
    table: SoftDeleteTable,
    id: Uuid,
    now: EpochMillis,
) -> rusqlite::Result<usize> {
    conn.execute(
        &format!(
            "UPDATE {table}
             SET deleted_at = ?2,
                 updated_at = MAX(?2, created_at)
             WHERE id = ?1
               AND {NOT_DELETED};",
            table = table.name()
        ),
        params![id.to_string(), now],
    )
}

/// Returns whether a live row with `id` exists in `table`.
pub(crate) fn is_live(
    conn: &Connection,
    table: SoftDeleteTable,
    id: Uuid,
) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM {table}
                WHERE id = ?1
                  AND {NOT_DELETED}
            );",
            table = table.name()
        ),
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
