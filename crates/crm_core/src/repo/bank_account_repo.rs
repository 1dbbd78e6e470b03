//! Bank account repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/list/get/patch/soft-delete over `bank_accounts`.
//! - Own the single-primary-account rule per legal entity.
//! - Compose an entity with its accounts for account-centric callers.
//!
//! # Invariants
//! - Field formats are validated before the first store write.
//! - Promoting an account demotes its live siblings in the same immediate
//!   transaction, before the promoting write, so no reader ever sees two
//!   primaries for one entity.
//! - Accounts can only be created under a live legal entity.

use crate::db::Store;
use crate::model::bank_account::{
    AccountDefaults, BankAccount, BankAccountId, BankAccountPatch, NewBankAccount,
};
use crate::model::context::Cancellation;
use crate::model::legal_entity::{LegalEntity, LegalEntityId};
use crate::model::{now_epoch_ms, EpochMillis};
use crate::repo::ensure_not_canceled;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::rows::{
    bool_to_int, load_entity_with_accounts, load_live_account, load_live_accounts,
};
use crate::repo::soft_delete::{is_live, soft_delete_by_id, SoftDeleteTable, NOT_DELETED};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

/// Repository interface for bank account operations.
pub trait BankAccountRepository {
    /// Persists a new account, demoting siblings when it is primary.
    fn create(&self, cancel: &Cancellation, account: &NewBankAccount) -> RepoResult<BankAccount>;
    /// Lists live accounts across all entities.
    fn get_all(&self, cancel: &Cancellation) -> RepoResult<Vec<BankAccount>>;
    fn get_by_id(&self, cancel: &Cancellation, id: BankAccountId) -> RepoResult<BankAccount>;
    /// Applies present patch fields plus `updated_at`; returns the new state.
    fn update(
        &self,
        cancel: &Cancellation,
        id: BankAccountId,
        patch: &BankAccountPatch,
    ) -> RepoResult<BankAccount>;
    fn delete(&self, cancel: &Cancellation, id: BankAccountId) -> RepoResult<()>;
    /// Loads a live entity with its live accounts.
    ///
    /// Fails `NotFound` for a deleted entity even if its accounts are live.
    fn get_entity_with_accounts(
        &self,
        cancel: &Cancellation,
        entity_id: LegalEntityId,
    ) -> RepoResult<LegalEntity>;
}

/// SQLite-backed bank account repository.
#[derive(Debug, Clone)]
pub struct SqliteBankAccountRepository {
    store: Store,
    defaults: AccountDefaults,
}

impl SqliteBankAccountRepository {
    pub fn new(store: Store) -> Self {
        Self::with_defaults(store, AccountDefaults::default())
    }

    pub fn with_defaults(store: Store, defaults: AccountDefaults) -> Self {
        Self { store, defaults }
    }
}

impl BankAccountRepository for SqliteBankAccountRepository {
    fn create(&self, cancel: &Cancellation, account: &NewBankAccount) -> RepoResult<BankAccount> {
        let account = account.clone().build(&self.defaults, now_epoch_ms())?;

        let conn = self.store.checkout(cancel)?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        if !is_live(&tx, SoftDeleteTable::LegalEntities, account.legal_entity_id)? {
            return Err(RepoError::entity_not_found(account.legal_entity_id));
        }

        if account.is_primary {
            demote_siblings(&tx, account.legal_entity_id, account.id, account.created_at)?;
        }

        tx.execute(
            "INSERT INTO bank_accounts (
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
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                account.id.to_string(),
                account.legal_entity_id.to_string(),
                account.name.as_str(),
                account.bic.as_str(),
                account.bank_name.as_str(),
                account.bank_address.as_str(),
                account.correspondent_account.as_str(),
                account.payment_account.as_str(),
                account.currency.as_str(),
                account.comment.as_str(),
                bool_to_int(account.is_primary),
                account.created_at,
                account.updated_at,
            ],
        )?;

        ensure_not_canceled(cancel)?;
        tx.commit()?;
        Ok(account)
    }

    fn get_all(&self, cancel: &Cancellation) -> RepoResult<Vec<BankAccount>> {
        let conn = self.store.checkout(cancel)?;
        let accounts = load_live_accounts(&conn)?;
        ensure_not_canceled(cancel)?;
        Ok(accounts)
    }

    fn get_by_id(&self, cancel: &Cancellation, id: BankAccountId) -> RepoResult<BankAccount> {
        let conn = self.store.checkout(cancel)?;
        let account =
            load_live_account(&conn, id)?.ok_or_else(|| RepoError::account_not_found(id))?;
        ensure_not_canceled(cancel)?;
        Ok(account)
    }

    fn update(
        &self,
        cancel: &Cancellation,
        id: BankAccountId,
        patch: &BankAccountPatch,
    ) -> RepoResult<BankAccount> {
        patch.validate()?;

        let conn = self.store.checkout(cancel)?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        let current =
            load_live_account(&tx, id)?.ok_or_else(|| RepoError::account_not_found(id))?;

        let mut next = current.clone();
        patch.apply_to(&mut next);
        next.validate()?;
        next.updated_at = now_epoch_ms().max(current.created_at);

        if next.is_primary {
            demote_siblings(&tx, next.legal_entity_id, next.id, next.updated_at)?;
        }

        let changed = tx.execute(
            &format!(
                "UPDATE bank_accounts
                 SET
                    name = ?2,
                    bic = ?3,
                    bank_name = ?4,
                    bank_address = ?5,
                    correspondent_account = ?6,
                    payment_account = ?7,
                    currency = ?8,
                    comment = ?9,
                    is_primary = ?10,
                    updated_at = ?11
                 WHERE id = ?1
                   AND {NOT_DELETED};"
            ),
            params![
                id.to_string(),
                next.name.as_str(),
                next.bic.as_str(),
                next.bank_name.as_str(),
                next.bank_address.as_str(),
                next.correspondent_account.as_str(),
                next.payment_account.as_str(),
                next.currency.as_str(),
                next.comment.as_str(),
                bool_to_int(next.is_primary),
                next.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::account_not_found(id));
        }

        ensure_not_canceled(cancel)?;
        tx.commit()?;
        Ok(next)
    }

    fn delete(&self, cancel: &Cancellation, id: BankAccountId) -> RepoResult<()> {
        let conn = self.store.checkout(cancel)?;
        let changed =
            soft_delete_by_id(&conn, SoftDeleteTable::BankAccounts, id, now_epoch_ms())?;
        if changed == 0 {
            return Err(RepoError::account_not_found(id));
        }
        Ok(())
    }

    fn get_entity_with_accounts(
        &self,
        cancel: &Cancellation,
        entity_id: LegalEntityId,
    ) -> RepoResult<LegalEntity> {
        let conn = self.store.checkout(cancel)?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Deferred)?;
        let entity = load_entity_with_accounts(&tx, entity_id)?;
        tx.commit()?;
        ensure_not_canceled(cancel)?;
        Ok(entity)
    }
}

/// Clears `is_primary` on every live account of `entity_id` except `keep`.
fn demote_siblings(
    conn: &Connection,
    entity_id: LegalEntityId,
    keep: BankAccountId,
    now: EpochMillis,
) -> RepoResult<usize> {
    let demoted = conn.execute(
        &format!(
            "UPDATE bank_accounts
             SET is_primary = 0,
                 updated_at = MAX(?3, created_at)
             WHERE legal_entity_id = ?1
               AND id <> ?2
               AND is_primary = 1
               AND {NOT_DELETED};"
        ),
        params![entity_id.to_string(), keep.to_string(), now],
    )?;
    Ok(demoted)
}
