//! Legal entity repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/list/get/rename/soft-delete over `legal_entities`.
//! - Attach each entity's live bank accounts on reads.
//!
//! # Invariants
//! - Names are unique among live rows; a deleted entity's name is reusable.
//! - The uniqueness check and the write share one immediate transaction,
//!   and the partial unique index backs it up at the store.
//! - Zero affected rows on rename/delete is always `NotFound`.

use crate::db::Store;
use crate::model::context::Cancellation;
use crate::model::legal_entity::{
    validate_entity_name, LegalEntity, LegalEntityId, NewLegalEntity,
};
use crate::model::now_epoch_ms;
use crate::repo::error::{is_active_name_violation, RepoError, RepoResult};
use crate::repo::rows::{
    active_name_taken, load_accounts_of_live_entities, load_entity_with_accounts,
    load_live_entities,
};
use crate::repo::ensure_not_canceled;
use crate::repo::soft_delete::{is_live, soft_delete_by_id, SoftDeleteTable, NOT_DELETED};
use rusqlite::{params, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Repository interface for legal entity operations.
pub trait LegalEntityRepository {
    /// Persists a new entity and returns it with id and timestamps populated.
    fn create(&self, cancel: &Cancellation, entity: &NewLegalEntity) -> RepoResult<LegalEntity>;
    /// Lists live entities, each with its live accounts attached.
    fn get_all(&self, cancel: &Cancellation) -> RepoResult<Vec<LegalEntity>>;
    fn get_by_id(&self, cancel: &Cancellation, id: LegalEntityId) -> RepoResult<LegalEntity>;
    /// Renames a live entity and returns the updated record.
    fn update(
        &self,
        cancel: &Cancellation,
        id: LegalEntityId,
        name: &str,
    ) -> RepoResult<LegalEntity>;
    /// Soft-deletes a live entity. Its accounts are left untouched.
    fn delete(&self, cancel: &Cancellation, id: LegalEntityId) -> RepoResult<()>;
}

/// SQLite-backed legal entity repository.
#[derive(Debug, Clone)]
pub struct SqliteLegalEntityRepository {
    store: Store,
}

impl SqliteLegalEntityRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl LegalEntityRepository for SqliteLegalEntityRepository {
    fn create(&self, cancel: &Cancellation, entity: &NewLegalEntity) -> RepoResult<LegalEntity> {
        entity.validate()?;
        let id = entity.id.unwrap_or_else(Uuid::new_v4);

        let conn = self.store.checkout(cancel)?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        if active_name_taken(&tx, &entity.name, None)? {
            return Err(RepoError::Conflict {
                name: entity.name.clone(),
            });
        }

        let now = now_epoch_ms();
        let inserted = tx
            .execute(
                "INSERT INTO legal_entities (
                    id,
                    name,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?3);",
                params![id.to_string(), entity.name.as_str(), now],
            )
            .map_err(RepoError::from);
        match inserted {
            Err(err) if is_active_name_violation(&err) => {
                return Err(RepoError::Conflict {
                    name: entity.name.clone(),
                });
            }
            other => other?,
        };

        ensure_not_canceled(cancel)?;
        tx.commit()?;

        Ok(LegalEntity {
            id,
            name: entity.name.clone(),
            bank_accounts: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    fn get_all(&self, cancel: &Cancellation) -> RepoResult<Vec<LegalEntity>> {
        let conn = self.store.checkout(cancel)?;
        // One read transaction keeps both queries on the same snapshot.
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Deferred)?;

        let mut entities = load_live_entities(&tx)?;
        let mut grouped = load_accounts_of_live_entities(&tx)?;
        for entity in &mut entities {
            entity.bank_accounts = grouped.remove(&entity.id).unwrap_or_default();
        }

        tx.commit()?;
        ensure_not_canceled(cancel)?;
        Ok(entities)
    }

    fn get_by_id(&self, cancel: &Cancellation, id: LegalEntityId) -> RepoResult<LegalEntity> {
        let conn = self.store.checkout(cancel)?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Deferred)?;
        let entity = load_entity_with_accounts(&tx, id)?;
        tx.commit()?;
        ensure_not_canceled(cancel)?;
        Ok(entity)
    }

    fn update(
        &self,
        cancel: &Cancellation,
        id: LegalEntityId,
        name: &str,
    ) -> RepoResult<LegalEntity> {
        validate_entity_name(name)?;

        let conn = self.store.checkout(cancel)?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        if !is_live(&tx, SoftDeleteTable::LegalEntities, id)? {
            return Err(RepoError::entity_not_found(id));
        }
        if active_name_taken(&tx, name, Some(id))? {
            return Err(RepoError::Conflict {
                name: name.to_string(),
            });
        }

        let changed = tx
            .execute(
                &format!(
                    "UPDATE legal_entities
                     SET name = ?2,
                         updated_at = MAX(?3, created_at)
                     WHERE id = ?1
                       AND {NOT_DELETED};"
                ),
                params![id.to_string(), name, now_epoch_ms()],
            )
            .map_err(RepoError::from);
        let changed = match changed {
            Err(err) if is_active_name_violation(&err) => {
                return Err(RepoError::Conflict {
                    name: name.to_string(),
                });
            }
            other => other?,
        };
        if changed == 0 {
            return Err(RepoError::entity_not_found(id));
        }

        let entity = load_entity_with_accounts(&tx, id)?;
        ensure_not_canceled(cancel)?;
        tx.commit()?;
        Ok(entity)
    }

    fn delete(&self, cancel: &Cancellation, id: LegalEntityId) -> RepoResult<()> {
        let conn = self.store.checkout(cancel)?;
        let changed =
            soft_delete_by_id(&conn, SoftDeleteTable::LegalEntities, id, now_epoch_ms())?;
        if changed == 0 {
            return Err(RepoError::entity_not_found(id));
        }
        Ok(())
    }
}
