//! Registry use-case service.
//!
//! # Responsibility
//! - Provide stable entry points for transport callers.
//! - Delegate every operation to the repositories unchanged.
//!
//! # Invariants
//! - No business rule lives here; new invariants belong in the repositories.
//! - Service APIs never expose storage types to callers.

use crate::db::Store;
use crate::model::bank_account::{
    AccountDefaults, BankAccount, BankAccountId, BankAccountPatch, NewBankAccount,
};
use crate::model::context::CallContext;
use crate::model::legal_entity::{LegalEntity, LegalEntityId, NewLegalEntity};
use crate::repo::bank_account_repo::{BankAccountRepository, SqliteBankAccountRepository};
use crate::repo::error::RepoResult;
use crate::repo::legal_entity_repo::{LegalEntityRepository, SqliteLegalEntityRepository};

/// Use-case service over legal entities and their bank accounts.
#[derive(Debug, Clone)]
pub struct RegistryService<E: LegalEntityRepository, A: BankAccountRepository> {
    entities: E,
    accounts: A,
}

/// Service wired to the SQLite repositories.
pub type SqliteRegistryService =
    RegistryService<SqliteLegalEntityRepository, SqliteBankAccountRepository>;

impl SqliteRegistryService {
    /// Builds both repositories on one shared store handle.
    pub fn sqlite(store: Store, defaults: AccountDefaults) -> Self {
        Self::new(
            SqliteLegalEntityRepository::new(store.clone()),
            SqliteBankAccountRepository::with_defaults(store, defaults),
        )
    }
}

impl<E: LegalEntityRepository, A: BankAccountRepository> RegistryService<E, A> {
    pub fn new(entities: E, accounts: A) -> Self {
        Self { entities, accounts }
    }

    pub fn create_legal_entity(
        &self,
        ctx: &CallContext,
        entity: &NewLegalEntity,
    ) -> RepoResult<LegalEntity> {
        self.entities.create(ctx.cancellation(), entity)
    }

    pub fn list_legal_entities(&self, ctx: &CallContext) -> RepoResult<Vec<LegalEntity>> {
        self.entities.get_all(ctx.cancellation())
    }

    pub fn get_legal_entity(
        &self,
        ctx: &CallContext,
        id: LegalEntityId,
    ) -> RepoResult<LegalEntity> {
        self.entities.get_by_id(ctx.cancellation(), id)
    }

    pub fn update_legal_entity_name(
        &self,
        ctx: &CallContext,
        id: LegalEntityId,
        name: &str,
    ) -> RepoResult<LegalEntity> {
        self.entities.update(ctx.cancellation(), id, name)
    }

    pub fn delete_legal_entity(&self, ctx: &CallContext, id: LegalEntityId) -> RepoResult<()> {
        self.entities.delete(ctx.cancellation(), id)
    }

    pub fn create_bank_account(
        &self,
        ctx: &CallContext,
        account: &NewBankAccount,
    ) -> RepoResult<BankAccount> {
        self.accounts.create(ctx.cancellation(), account)
    }

    pub fn list_bank_accounts(&self, ctx: &CallContext) -> RepoResult<Vec<BankAccount>> {
        self.accounts.get_all(ctx.cancellation())
    }

    pub fn get_bank_account(
        &self,
        ctx: &CallContext,
        id: BankAccountId,
    ) -> RepoResult<BankAccount> {
        self.accounts.get_by_id(ctx.cancellation(), id)
    }

    pub fn update_bank_account(
        &self,
        ctx: &CallContext,
        id: BankAccountId,
        patch: &BankAccountPatch,
    ) -> RepoResult<BankAccount> {
        self.accounts.update(ctx.cancellation(), id, patch)
    }

    pub fn delete_bank_account(&self, ctx: &CallContext, id: BankAccountId) -> RepoResult<()> {
        self.accounts.delete(ctx.cancellation(), id)
    }

    pub fn get_legal_entity_with_accounts(
        &self,
        ctx: &CallContext,
        entity_id: LegalEntityId,
    ) -> RepoResult<LegalEntity> {
        self.accounts
            .get_entity_with_accounts(ctx.cancellation(), entity_id)
    }
}
