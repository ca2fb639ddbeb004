//! Classification of Diesel and pool failures shared by every adapter.
//!
//! Each adapter maps a [`StoreFailure`] onto its own port error, so the
//! storage-specific inspection (constraint names, SQLSTATE text) lives here.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Unique index guarding live branch codes.
pub(crate) const BRANCH_CODE_INDEX: &str = "branches_code_live_key";
/// Unique index on `(branch_id, counter_number)`.
pub(crate) const COUNTER_NUMBER_INDEX: &str = "counters_branch_number_key";
/// Unique index on `device_id`.
pub(crate) const COUNTER_DEVICE_INDEX: &str = "counters_device_id_key";

/// Storage failure reduced to what the ports distinguish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreFailure {
    Connection(String),
    Query(String),
    /// A unique index rejected the write.
    UniqueViolation { constraint: Option<String> },
    /// The queried relation does not exist in this database.
    MissingRelation(String),
}

impl StoreFailure {
    pub(crate) fn violates(&self, index: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint: Some(name) } if name == index)
    }
}

impl From<PoolError> for StoreFailure {
    fn from(error: PoolError) -> Self {
        Self::Connection(error.into_message())
    }
}

fn is_missing_relation(message: &str) -> bool {
    message.starts_with("relation ") && message.ends_with("does not exist")
}

impl From<DieselError> for StoreFailure {
    fn from(error: DieselError) -> Self {
        match error {
            DieselError::DatabaseError(kind, info) => {
                debug!(?kind, message = info.message(), "diesel operation failed");
                match kind {
                    DatabaseErrorKind::UniqueViolation => Self::UniqueViolation {
                        constraint: info.constraint_name().map(str::to_owned),
                    },
                    DatabaseErrorKind::ClosedConnection => {
                        Self::Connection("database connection error".to_owned())
                    }
                    _ if is_missing_relation(info.message()) => {
                        Self::MissingRelation(info.message().to_owned())
                    }
                    _ => Self::Query("database error".to_owned()),
                }
            }
            DieselError::QueryBuilderError(_) => Self::Query("database query error".to_owned()),
            DieselError::DeserializationError(err) => {
                debug!(error = %err, "row deserialisation failed");
                Self::Query("unreadable row".to_owned())
            }
            other => {
                debug!(error = %other, "diesel operation failed");
                Self::Query("database error".to_owned())
            }
        }
    }
}
