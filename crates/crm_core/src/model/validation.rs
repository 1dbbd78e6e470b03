//! Field-level validation shared by the registry models.
//!
//! # Responsibility
//! - Check string fields against the formats the store accepts.
//! - Report the offending field by name so callers can surface it.
//!
//! # Invariants
//! - Validation never touches the store; it runs before any write.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid digits regex"));
static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid currency regex"));

/// Malformed input detected before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is empty or whitespace-only.
    Empty { field: &'static str },
    /// Field contains a control character such as NUL.
    ControlCharacter { field: &'static str },
    /// Field exceeds its maximum length in characters.
    TooLong { field: &'static str, max: usize },
    /// Fixed-width numeric field has the wrong number of characters.
    WrongLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Numeric field contains non-digit characters.
    NotDigits { field: &'static str },
    /// Currency is not a three-letter uppercase code.
    InvalidCurrency { value: String },
}

impl ValidationError {
    /// Name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field }
            | Self::ControlCharacter { field }
            | Self::TooLong { field, .. }
            | Self::WrongLength { field, .. }
            | Self::NotDigits { field } => field,
            Self::InvalidCurrency { .. } => "currency",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "`{field}` must not be empty"),
            Self::ControlCharacter { field } => {
                write!(f, "`{field}` must not contain control characters")
            }
            Self::TooLong { field, max } => {
                write!(f, "`{field}` must be at most {max} characters")
            }
            Self::WrongLength {
                field,
                expected,
                actual,
            } => write!(
                f,
                "`{field}` must be exactly {expected} digits, got {actual} characters"
            ),
            Self::NotDigits { field } => write!(f, "`{field}` must contain digits only"),
            Self::InvalidCurrency { value } => write!(
                f,
                "`currency` must be a three-letter uppercase code, got `{value}`"
            ),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

/// Checks a free-text field: no control characters other than line breaks
/// and tabs, and at most `max` characters.
pub(crate) fn require_max_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().any(is_forbidden_control) {
        return Err(ValidationError::ControlCharacter { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

fn is_forbidden_control(ch: char) -> bool {
    ch.is_control() && !matches!(ch, '\n' | '\r' | '\t')
}

/// Checks a fixed-width all-digit field such as a BIC or account number.
pub(crate) fn require_digits(
    field: &'static str,
    value: &str,
    expected: usize,
) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual != expected {
        return Err(ValidationError::WrongLength {
            field,
            expected,
            actual,
        });
    }
    if !DIGITS_RE.is_match(value) {
        return Err(ValidationError::NotDigits { field });
    }
    Ok(())
}

pub(crate) fn require_currency(value: &str) -> Result<(), ValidationError> {
    if !CURRENCY_RE.is_match(value) {
        return Err(ValidationError::InvalidCurrency {
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        require_currency, require_digits, require_max_len, require_non_empty, ValidationError,
    };

    #[test]
    fn digits_reject_wrong_length_before_charset() {
        let err = require_digits("bic", "04452522", 9).unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongLength {
                field: "bic",
                expected: 9,
                actual: 8
            }
        );
    }

    #[test]
    fn digits_reject_letters() {
        let err = require_digits("bic", "04452522X", 9).unwrap_err();
        assert_eq!(err, ValidationError::NotDigits { field: "bic" });
        assert!(require_digits("bic", "044525225", 9).is_ok());
    }

    #[test]
    fn non_empty_treats_whitespace_as_empty() {
        let err = require_non_empty("name", "   ").unwrap_err();
        assert_eq!(err.field(), "name");
    }

    #[test]
    fn max_len_counts_characters_not_bytes() {
        assert!(require_max_len("name", "Ромашка", 7).is_ok());
        assert!(require_max_len("name", "Ромашка", 6).is_err());
    }

    #[test]
    fn max_len_rejects_nul_and_other_control_characters() {
        assert_eq!(
            require_max_len("name", "\0Acme", 50).unwrap_err(),
            ValidationError::ControlCharacter { field: "name" }
        );
        assert!(require_max_len("comment", "pay\u{7}roll", 1000).is_err());
        assert!(require_max_len("bank_address", "Moscow,\nVavilova 19\t", 500).is_ok());
    }

    #[test]
    fn currency_requires_three_uppercase_letters() {
        assert!(require_currency("RUB").is_ok());
        assert!(require_currency("rub").is_err());
        assert!(require_currency("RUBL").is_err());
        assert_eq!(require_currency("US").unwrap_err().field(), "currency");
    }
}
