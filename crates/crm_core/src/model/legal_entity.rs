//! Legal entity domain model.
//!
//! # Responsibility
//! - Define the registered corporate party and its create request.
//! - Validate caller-supplied fields before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another entity.
//! - `name` is unique among entities whose `deleted_at` is `None`.
//! - Timestamps are stamped by the repository, never by callers.

use crate::model::bank_account::BankAccount;
use crate::model::validation::{require_max_len, require_non_empty, ValidationError};
use crate::model::EpochMillis;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a legal entity.
pub type LegalEntityId = Uuid;

/// Upper bound for `LegalEntity::name`, in characters.
pub const LEGAL_ENTITY_NAME_MAX: usize = 50;

/// Registered corporate party owning zero or more bank accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalEntity {
    pub id: LegalEntityId,
    pub name: String,
    /// Non-deleted accounts of this entity, ordered by creation.
    pub bank_accounts: Vec<BankAccount>,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
    /// Soft-delete tombstone. Always `None` on values returned by reads.
    pub deleted_at: Option<EpochMillis>,
}

impl LegalEntity {
    /// Returns whether this entity is visible to normal queries.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns the primary account, if one is designated.
    pub fn primary_account(&self) -> Option<&BankAccount> {
        self.bank_accounts.iter().find(|account| account.is_primary)
    }
}

/// Create request for a legal entity.
///
/// Only the identifier and name are caller-settable; everything else is
/// managed by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLegalEntity {
    /// Caller-provided id for import paths. Generated when `None`.
    pub id: Option<LegalEntityId>,
    pub name: String,
}

impl NewLegalEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_name(&self.name)
    }
}

/// Validates a legal entity name for create and rename paths.
pub fn validate_entity_name(name: &str) -> Result<(), ValidationError> {
    require_non_empty("name", name)?;
    require_max_len("name", name, LEGAL_ENTITY_NAME_MAX)
}
