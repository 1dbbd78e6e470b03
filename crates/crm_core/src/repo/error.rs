//! Repository error taxonomy.
//!
//! # Responsibility
//! - Give every failure a kind the transport layer can map to a status.
//! - Classify raw SQLite failures into cancellation, conflict or store errors.

use crate::db::{is_interrupted, DbError};
use crate::model::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Which record a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    LegalEntity,
    BankAccount,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LegalEntity => write!(f, "legal entity"),
            Self::BankAccount => write!(f, "bank account"),
        }
    }
}

/// Coarse error kind for transport-level mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Canceled,
    Store,
}

#[derive(Debug)]
pub enum RepoError {
    /// Malformed input, detected before any write.
    Validation(ValidationError),
    /// Another non-deleted legal entity already uses this name.
    Conflict { name: String },
    /// Target row is absent or soft-deleted.
    NotFound { kind: RecordKind, id: Uuid },
    /// Caller cancellation or deadline fired during a store round trip.
    Canceled,
    /// Any other store failure, propagated as-is.
    Db(DbError),
    /// Persisted row cannot be mapped back to a domain value.
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Canceled => ErrorKind::Canceled,
            Self::Db(_) | Self::InvalidData(_) => ErrorKind::Store,
        }
    }

    pub(crate) fn entity_not_found(id: Uuid) -> Self {
        Self::NotFound {
            kind: RecordKind::LegalEntity,
            id,
        }
    }

    pub(crate) fn account_not_found(id: Uuid) -> Self {
        Self::NotFound {
            kind: RecordKind::BankAccount,
            id,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict { name } => {
                write!(f, "legal entity with name `{name}` already exists")
            }
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Canceled => write!(f, "operation canceled"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Conflict { .. } | Self::NotFound { .. } | Self::Canceled => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_canceled() {
            return Self::Canceled;
        }
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if is_interrupted(&value) {
            return Self::Canceled;
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns whether `err` is a violation of the active-name unique index.
pub(crate) fn is_active_name_violation(err: &RepoError) -> bool {
    let RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(inner, message))) = err else {
        return false;
    };
    inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        && message
            .as_deref()
            .is_some_and(|text| text.contains("legal_entities.name"))
}
