//! Entity store: keyed-record persistence over the scheduler tables.
//!
//! # Responsibility
//! - Provide create/get/list/lookup/update/delete for every entity type.
//! - Provide scoped multi-table write transactions.
//! - Announce committed table changes to registered listeners.
//!
//! # Invariants
//! - Writes validate their payload before any SQL runs.
//! - A transaction may only touch the tables it declared.
//! - Listeners hear about a table only after the transaction that changed it
//!   committed; rolled-back work is never announced.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use crate::model::RecordId;
use crate::schema::{IndexedField, Table};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod entity;
mod sqlite;

pub use entity::Entity;
pub use sqlite::{ChangeListener, ChangeSet, EntityStore, ListenerState, StoreReader, StoreTx};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by entity store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap failure.
    Db(DbError),
    /// Write payload failed validation.
    Validation(ValidationError),
    /// No row with this id.
    NotFound { table: Table, id: RecordId },
    /// Transaction touched a table it did not declare.
    TableNotInScope(Table),
    /// Lookup by a field that is not indexed on the requested table.
    FieldNotIndexed { table: Table, field: IndexedField },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be decoded into its record type.
    InvalidData(String),
}

impl StoreError {
    /// Whether the failure came from the database engine itself (locked
    /// database, I/O) rather than from the data or the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Db(DbError::Sqlite(_)))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => write!(f, "{table} row not found: {id}"),
            Self::TableNotInScope(table) => {
                write!(f, "table `{table}` is not part of the current transaction")
            }
            Self::FieldNotIndexed { table, field } => {
                write!(f, "`{field}` is not an indexed field of `{table}`")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "entity store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "entity store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "entity store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::TableNotInScope(_) => None,
            Self::FieldNotIndexed { .. } => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
