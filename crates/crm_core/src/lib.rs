//! Core domain logic for the legal entity registry.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{Store, StoreConfig, StoreSource};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::bank_account::{
    AccountDefaults, BankAccount, BankAccountId, BankAccountPatch, NewBankAccount,
};
pub use model::context::{CallContext, Cancellation, Principal};
pub use model::legal_entity::{LegalEntity, LegalEntityId, NewLegalEntity};
pub use model::validation::ValidationError;
pub use model::EpochMillis;
pub use repo::bank_account_repo::{BankAccountRepository, SqliteBankAccountRepository};
pub use repo::error::{ErrorKind, RecordKind, RepoError, RepoResult};
pub use repo::legal_entity_repo::{LegalEntityRepository, SqliteLegalEntityRepository};
pub use service::registry_service::{RegistryService, SqliteRegistryService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
