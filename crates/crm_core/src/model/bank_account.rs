//! Bank account domain model.
//!
//! # Responsibility
//! - Define the payment account record attached to a legal entity.
//! - Provide the create request and the optional-field update record.
//! - Resolve configured defaults for omitted fields.
//!
//! # Invariants
//! - `bic` is exactly 9 digits; `correspondent_account` and
//!   `payment_account` are exactly 20 digits.
//! - `legal_entity_id` is fixed at creation; the patch record cannot carry it.
//! - At most one non-deleted account per legal entity has `is_primary`.
//!   The repository owns that rule; the model only carries the flag.

use crate::model::legal_entity::LegalEntityId;
use crate::model::validation::{
    require_currency, require_digits, require_max_len, require_non_empty, ValidationError,
};
use crate::model::EpochMillis;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a bank account.
pub type BankAccountId = Uuid;

pub const BIC_LEN: usize = 9;
pub const ACCOUNT_NUMBER_LEN: usize = 20;
pub const ACCOUNT_NAME_MAX: usize = 255;
pub const BANK_NAME_MAX: usize = 255;
pub const BANK_ADDRESS_MAX: usize = 500;
pub const COMMENT_MAX: usize = 1000;

/// Values applied when a create request omits optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDefaults {
    pub currency: String,
    pub comment: String,
    pub name: String,
}

impl Default for AccountDefaults {
    fn default() -> Self {
        Self {
            currency: "RUB".to_string(),
            comment: "No comment".to_string(),
            name: "Main account".to_string(),
        }
    }
}

/// Payment account owned by a legal entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: BankAccountId,
    pub legal_entity_id: LegalEntityId,
    /// Human label for the account.
    pub name: String,
    pub bic: String,
    pub bank_name: String,
    pub bank_address: String,
    pub correspondent_account: String,
    pub payment_account: String,
    pub currency: String,
    pub comment: String,
    pub is_primary: bool,
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
    /// Soft-delete tombstone. Always `None` on values returned by reads.
    pub deleted_at: Option<EpochMillis>,
}

impl BankAccount {
    /// Validates every caller-controlled field of a complete record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_account_name(&self.name)?;
        validate_bic(&self.bic)?;
        validate_bank_name(&self.bank_name)?;
        validate_bank_address(&self.bank_address)?;
        validate_correspondent_account(&self.correspondent_account)?;
        validate_payment_account(&self.payment_account)?;
        require_currency(&self.currency)?;
        validate_comment(&self.comment)
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Create request for a bank account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewBankAccount {
    /// Caller-provided id for import paths. Generated when `None`.
    pub id: Option<BankAccountId>,
    pub legal_entity_id: LegalEntityId,
    pub name: Option<String>,
    pub bic: String,
    pub bank_name: String,
    pub bank_address: Option<String>,
    pub correspondent_account: String,
    pub payment_account: String,
    pub currency: Option<String>,
    pub comment: Option<String>,
    pub is_primary: bool,
}

impl NewBankAccount {
    /// Resolves defaults and validates the resulting record.
    ///
    /// The returned account carries `now` in both timestamps and a
    /// generated id when none was supplied.
    pub fn build(
        self,
        defaults: &AccountDefaults,
        now: EpochMillis,
    ) -> Result<BankAccount, ValidationError> {
        let account = BankAccount {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            legal_entity_id: self.legal_entity_id,
            name: self.name.unwrap_or_else(|| defaults.name.clone()),
            bic: self.bic,
            bank_name: self.bank_name,
            bank_address: self.bank_address.unwrap_or_default(),
            correspondent_account: self.correspondent_account,
            payment_account: self.payment_account,
            currency: self.currency.unwrap_or_else(|| defaults.currency.clone()),
            comment: self.comment.unwrap_or_else(|| defaults.comment.clone()),
            is_primary: self.is_primary,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        account.validate()?;
        Ok(account)
    }
}

/// Partial update for a bank account.
///
/// `None` keeps the stored value; `Some` overwrites it, including with an
/// empty string where the field allows one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BankAccountPatch {
    pub name: Option<String>,
    pub bic: Option<String>,
    pub bank_name: Option<String>,
    pub bank_address: Option<String>,
    pub correspondent_account: Option<String>,
    pub payment_account: Option<String>,
    pub currency: Option<String>,
    pub comment: Option<String>,
    pub is_primary: Option<bool>,
}

impl BankAccountPatch {
    /// Validates present fields only.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = self.name.as_deref() {
            validate_account_name(name)?;
        }
        if let Some(bic) = self.bic.as_deref() {
            validate_bic(bic)?;
        }
        if let Some(bank_name) = self.bank_name.as_deref() {
            validate_bank_name(bank_name)?;
        }
        if let Some(bank_address) = self.bank_address.as_deref() {
            validate_bank_address(bank_address)?;
        }
        if let Some(value) = self.correspondent_account.as_deref() {
            validate_correspondent_account(value)?;
        }
        if let Some(value) = self.payment_account.as_deref() {
            validate_payment_account(value)?;
        }
        if let Some(currency) = self.currency.as_deref() {
            require_currency(currency)?;
        }
        if let Some(comment) = self.comment.as_deref() {
            validate_comment(comment)?;
        }
        Ok(())
    }

    /// Overwrites the present fields on `account`.
    ///
    /// Timestamps are left untouched.
    pub fn apply_to(&self, account: &mut BankAccount) {
        if let Some(value) = &self.name {
            account.name.clone_from(value);
        }
        if let Some(value) = &self.bic {
            account.bic.clone_from(value);
        }
        if let Some(value) = &self.bank_name {
            account.bank_name.clone_from(value);
        }
        if let Some(value) = &self.bank_address {
            account.bank_address.clone_from(value);
        }
        if let Some(value) = &self.correspondent_account {
            account.correspondent_account.clone_from(value);
        }
        if let Some(value) = &self.payment_account {
            account.payment_account.clone_from(value);
        }
        if let Some(value) = &self.currency {
            account.currency.clone_from(value);
        }
        if let Some(value) = &self.comment {
            account.comment.clone_from(value);
        }
        if let Some(value) = self.is_primary {
            account.is_primary = value;
        }
    }
}

fn validate_account_name(value: &str) -> Result<(), ValidationError> {
    require_non_empty("name", value)?;
    require_max_len("name", value, ACCOUNT_NAME_MAX)
}

fn validate_bic(value: &str) -> Result<(), ValidationError> {
    require_digits("bic", value, BIC_LEN)
}

fn validate_bank_name(value: &str) -> Result<(), ValidationError> {
    require_non_empty("bank_name", value)?;
    require_max_len("bank_name", value, BANK_NAME_MAX)
}

fn validate_bank_address(value: &str) -> Result<(), ValidationError> {
    require_max_len("bank_address", value, BANK_ADDRESS_MAX)
}

fn validate_correspondent_account(value: &str) -> Result<(), ValidationError> {
    require_digits("correspondent_account", value, ACCOUNT_NUMBER_LEN)
}

fn validate_payment_account(value: &str) -> Result<(), ValidationError> {
    require_digits("payment_account", value, ACCOUNT_NUMBER_LEN)
}

fn validate_comment(value: &str) -> Result<(), ValidationError> {
    require_max_len("comment", value, COMMENT_MAX)
}

#[cfg(test)]
mod tests {
    use super::{AccountDefaults, BankAccountPatch, NewBankAccount};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    fn request() -> NewBankAccount {
        NewBankAccount {
            legal_entity_id: Uuid::new_v4(),
            bic: "044525225".to_string(),
            bank_name: "Sberbank".to_string(),
            correspondent_account: "30101810000000000225".to_string(),
            payment_account: "40702810000000000001".to_string(),
            ..NewBankAccount::default()
        }
    }

    #[test]
    fn build_applies_defaults_for_omitted_fields() {
        let account = request().build(&AccountDefaults::default(), 42).unwrap();
        assert_eq!(account.currency, "RUB");
        assert_eq!(account.comment, "No comment");
        assert_eq!(account.name, "Main account");
        assert_eq!(account.bank_address, "");
        assert_eq!(account.created_at, 42);
        assert_eq!(account.updated_at, 42);
        assert!(account.is_active());
    }

    #[test]
    fn build_keeps_caller_id() {
        let id = Uuid::new_v4();
        let mut req = request();
        req.id = Some(id);
        let account = req.build(&AccountDefaults::default(), 0).unwrap();
        assert_eq!(account.id, id);
    }

    #[test]
    fn build_names_offending_field() {
        let mut req = request();
        req.payment_account = "4070281000000000000".to_string();
        let err = req.build(&AccountDefaults::default(), 0).unwrap_err();
        assert_eq!(err.field(), "payment_account");

        let mut req = request();
        req.bank_name = String::new();
        let err = req.build(&AccountDefaults::default(), 0).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "bank_name" });
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut account = request().build(&AccountDefaults::default(), 0).unwrap();
        let patch = BankAccountPatch {
            comment: Some(String::new()),
            is_primary: Some(true),
            ..BankAccountPatch::default()
        };
        patch.apply_to(&mut account);
        assert_eq!(account.comment, "");
        assert!(account.is_primary);
        assert_eq!(account.bic, "044525225");
    }

    #[test]
    fn patch_validation_skips_absent_fields() {
        assert!(BankAccountPatch::default().validate().is_ok());

        let patch = BankAccountPatch {
            correspondent_account: Some("123".to_string()),
            ..BankAccountPatch::default()
        };
        assert_eq!(
            patch.validate().unwrap_err().field(),
            "correspondent_account"
        );
    }
}
