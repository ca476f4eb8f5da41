//! Operation-boundary error taxonomy.
//!
//! # Invariants
//! - Every scheduler operation either fully applies or returns one of these
//!   errors with no partial write visible.
//! - Only a [`SchedulerError::StoreFailure`] raised by the database engine is
//!   worth retrying; the core never retries on its own.

use crate::model::validation::ValidationError;
use crate::model::RecordId;
use crate::schema::Table;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug)]
pub enum SchedulerError {
    /// Required input is empty or malformed. Nothing was written.
    Validation(ValidationError),
    /// Target row does not exist. Nothing was written.
    NotFound { table: Table, id: RecordId },
    /// A write would reference a row that does not exist.
    IntegrityViolation { missing: Table, id: RecordId },
    /// Persistence failed or the transaction aborted.
    StoreFailure(StoreError),
}

impl SchedulerError {
    /// Whether the caller may retry the same call unchanged.
    ///
    /// Undecodable rows, schema mismatches and misuse of the store fail the
    /// same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreFailure(err) if err.is_transient())
    }

    /// Stable code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::IntegrityViolation { .. } => "integrity_violation",
            Self::StoreFailure(_) => "store_failure",
        }
    }
}

impl Display for SchedulerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid input: {err}"),
            Self::NotFound { table, id } => write!(f, "{table} row not found: {id}"),
            Self::IntegrityViolation { missing, id } => {
                write!(f, "referenced {missing} row does not exist: {id}")
            }
            Self::StoreFailure(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl Error for SchedulerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StoreFailure(err) => Some(err),
            Self::NotFound { .. } | Self::IntegrityViolation { .. } => None,
        }
    }
}

impl From<ValidationError> for SchedulerError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for SchedulerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(err) => Self::Validation(err),
            StoreError::NotFound { table, id } => Self::NotFound { table, id },
            other => Self::StoreFailure(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SchedulerError;
    use crate::db::DbError;
    use crate::model::validation::ValidationError;
    use crate::schema::{IndexedField, Table};
    use crate::store::StoreError;

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        let not_found: SchedulerError = StoreError::NotFound {
            table: Table::Hosts,
            id: 9,
        }
        .into();
        assert!(matches!(
            not_found,
            SchedulerError::NotFound {
                table: Table::Hosts,
                id: 9
            }
        ));

        let invalid: SchedulerError = StoreError::Validation(ValidationError::Empty("name")).into();
        assert_eq!(invalid.code(), "validation_error");

        let busy: SchedulerError =
            StoreError::Db(DbError::Sqlite(rusqlite::Error::InvalidQuery)).into();
        assert_eq!(busy.code(), "store_failure");
        assert!(busy.is_retryable());
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn permanent_store_failures_are_not_retryable() {
        let permanent = [
            StoreError::InvalidData("invalid date `Mon Jan 01 2024`".to_string()),
            StoreError::TableNotInScope(Table::Meetings),
            StoreError::FieldNotIndexed {
                table: Table::Meetings,
                field: IndexedField::ResponseMeeting,
            },
            StoreError::Db(DbError::UnsupportedSchemaVersion {
                db_version: 9,
                latest_supported: 3,
            }),
        ];
        for err in permanent {
            let failure: SchedulerError = err.into();
            assert_eq!(failure.code(), "store_failure");
            assert!(!failure.is_retryable(), "{failure} must not be retryable");
        }
    }
}
