//! Tenant-scoped repository ports and their SQLite implementations.
//!
//! # Responsibility
//! - Define one storage-agnostic contract per entity family.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Every read and mutation of a tenant-owned record filters by
//!   `organization_id`. Relation-scoped rows (participants, meeting records,
//!   plan meals) are addressed by natural key once the parent is verified.
//! - Absence on reads is `Ok(None)`; absence of a mutation target is
//!   `RepoError::NotFound`.
//! - Write paths validate model inputs before SQL mutations.
//! - Constraint failures surface as typed variants, never as message text.

pub mod consultation_repo;
pub mod nutrition_plan_repo;
pub mod organization_repo;
pub mod patient_repo;
pub mod program_repo;
pub mod task_repo;

use crate::db::DbError;
use crate::model::ModelValidationError;
use rusqlite::{ffi, Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// SQL expression for "now" in epoch milliseconds.
pub(crate) const NOW_MS_SQL: &str = "(strftime('%s', 'now') * 1000)";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every port.
#[derive(Debug)]
pub enum RepoError {
    /// Connection, bootstrap or query failure.
    Db(DbError),
    /// Input rejected before reaching storage.
    Validation(ModelValidationError),
    /// Mutation target does not exist within the caller's organization.
    NotFound(Uuid),
    /// A unique constraint or index rejected the write.
    UniqueViolation(String),
    /// A referenced row is missing, belongs to another organization, or
    /// still has dependents.
    ForeignKeyViolation(String),
    /// Persisted row cannot be converted into a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::UniqueViolation(message) => write!(f, "unique constraint violated: {message}"),
            Self::ForeignKeyViolation(message) => {
                write!(f, "foreign key constraint violated: {message}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound(_)
            | Self::UniqueViolation(_)
            | Self::ForeignKeyViolation(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            let detail = || message.clone().unwrap_or_else(|| value.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::UniqueViolation(detail());
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return Self::ForeignKeyViolation(detail());
                }
                _ => {}
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Starts a write transaction that takes the database write lock up front.
///
/// Read-modify-write sequences run inside it so concurrent writers are
/// serialized by SQLite instead of racing between their read and write.
pub(crate) fn begin_write(conn: &mut Connection) -> RepoResult<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(value: Option<String>, column: &str) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
