//! Row mapping and shared read queries for the registry tables.
//!
//! # Invariants
//! - Every loader here filters soft-deleted rows.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Accounts for all listed entities are fetched with one query, then grouped.

use crate::model::bank_account::BankAccount;
use crate::model::legal_entity::{LegalEntity, LegalEntityId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::soft_delete::NOT_DELETED;
use rusqlite::{Connection, Row};
use std::collections::HashMap;
use uuid::Uuid;

pub(crate) const ENTITY_SELECT_SQL: &str = "SELECT
    id,
    name,
    created_at,
    updated_at,
    deleted_at
FROM legal_entities";

pub(crate) const ACCOUNT_SELECT_SQL: &str = "SELECT
    id,
    legal_entity_id,
    name,
    bic,
    bank_name,
    bank_address,
    correspondent_account,
    payment_account,
    currency,
    comment,
    is_primary,
    created_at,
    updated_at,
    deleted_at
FROM bank_accounts";

/// Stable listing order shared by every multi-row query.
pub(crate) const LIST_ORDER: &str = "ORDER BY created_at ASC, id ASC";

pub(crate) fn load_live_entity(conn: &Connection, id: Uuid) -> RepoResult<Option<LegalEntity>> {
    let mut stmt = conn.prepare(&format!(
        "{ENTITY_SELECT_SQL}
         WHERE id = ?1
           AND {NOT_DELETED};"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_entity_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_live_entities(conn: &Connection) -> RepoResult<Vec<LegalEntity>> {
    let mut stmt = conn.prepare(&format!(
        "{ENTITY_SELECT_SQL}
         WHERE {NOT_DELETED}
         {LIST_ORDER};"
    ))?;
    let mut rows = stmt.query([])?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        entities.push(parse_entity_row(row)?);
    }
    Ok(entities)
}

pub(crate) fn load_live_account(conn: &Connection, id: Uuid) -> RepoResult<Option<BankAccount>> {
    let mut stmt = conn.prepare(&format!(
        "{ACCOUNT_SELECT_SQL}
         WHERE id = ?1
           AND {NOT_DELETED};"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_account_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_live_accounts(conn: &Connection) -> RepoResult<Vec<BankAccount>> {
    let mut stmt = conn.prepare(&format!(
        "{ACCOUNT_SELECT_SQL}
         WHERE {NOT_DELETED}
         {LIST_ORDER};"
    ))?;
    let mut rows = stmt.query([])?;
    let mut accounts = Vec::new();
    while let Some(row) = rows.next()? {
        accounts.push(parse_account_row(row)?);
    }
    Ok(accounts)
}

/// Fetches live accounts of every live entity in one query, grouped by owner.
///
/// The candidate set is selected in SQL, so the bound-variable limit never
/// caps how many entities a listing can carry.
pub(crate) fn load_accounts_of_live_entities(
    conn: &Connection,
) -> RepoResult<HashMap<LegalEntityId, Vec<BankAccount>>> {
    let mut stmt = conn.prepare(&format!(
        "{ACCOUNT_SELECT_SQL}
         WHERE legal_entity_id IN (
                SELECT id
                FROM legal_entities
                WHERE {NOT_DELETED}
            )
           AND {NOT_DELETED}
         {LIST_ORDER};"
    ))?;
    let mut rows = stmt.query([])?;

    let mut grouped: HashMap<LegalEntityId, Vec<BankAccount>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let account = parse_account_row(row)?;
        grouped
            .entry(account.legal_entity_id)
            .or_default()
            .push(account);
    }
    Ok(grouped)
}

/// Fetches the live accounts of one entity.
pub(crate) fn load_live_accounts_of(
    conn: &Connection,
    entity_id: LegalEntityId,
) -> RepoResult<Vec<BankAccount>> {
    let mut stmt = conn.prepare(&format!(
        "{ACCOUNT_SELECT_SQL}
         WHERE legal_entity_id = ?1
           AND {NOT_DELETED}
         {LIST_ORDER};"
    ))?;
    let mut rows = stmt.query([entity_id.to_string()])?;
    let mut accounts = Vec::new();
    while let Some(row) = rows.next()? {
        accounts.push(parse_account_row(row)?);
    }
    Ok(accounts)
}

/// Loads one live entity with its live accounts attached.
pub(crate) fn load_entity_with_accounts(
    conn: &Connection,
    id: LegalEntityId,
) -> RepoResult<LegalEntity> {
    let mut entity =
        load_live_entity(conn, id)?.ok_or_else(|| RepoError::entity_not_found(id))?;
    entity.bank_accounts = load_live_accounts_of(conn, id)?;
    Ok(entity)
}

/// Returns whether another live entity already uses `name`.
pub(crate) fn active_name_taken(
    conn: &Connection,
    name: &str,
    except: Option<LegalEntityId>,
) -> RepoResult<bool> {
    let taken: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM legal_entities
                WHERE name = ?1
                  AND (?2 IS NULL OR id <> ?2)
                  AND {NOT_DELETED}
            );"
        ),
        rusqlite::params![name, except.map(|id| id.to_string())],
        |row| row.get(0),
    )?;
    Ok(taken == 1)
}

fn parse_entity_row(row: &Row<'_>) -> RepoResult<LegalEntity> {
    let id_text: String = row.get("id")?;
    Ok(LegalEntity {
        id: parse_uuid(&id_text, "legal_entities.id")?,
        name: row.get("name")?,
        bank_accounts: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn parse_account_row(row: &Row<'_>) -> RepoResult<BankAccount> {
    let id_text: String = row.get("id")?;
    let owner_text: String = row.get("legal_entity_id")?;

    let is_primary = match row.get::<_, i64>("is_primary")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_primary value `{other}` in bank_accounts.is_primary"
            )));
        }
    };

    Ok(BankAccount {
        id: parse_uuid(&id_text, "bank_accounts.id")?,
        legal_entity_id: parse_uuid(&owner_text, "bank_accounts.legal_entity_id")?,
        name: row.get("name")?,
        bic: row.get("bic")?,
        bank_name: row.get("bank_name")?,
        bank_address: row.get("bank_address")?,
        correspondent_account: row.get("correspondent_account")?,
        payment_account: row.get("payment_account")?,
        currency: row.get("currency")?,
        comment: row.get("comment")?,
        is_primary,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
