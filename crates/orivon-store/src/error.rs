//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// The variants are distinguishable on purpose: the adapter recovers from
/// `UnknownColumn` and `UnknownTable`, callers recover from
/// `UniqueViolation`, and `Unavailable` must never be read as "absent".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The table has no column with this name.
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn {
        /// Physical table name.
        table: String,
        /// Physical column name reported by the store.
        column: String,
    },
    /// No table with this name exists.
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    /// The write violates a uniqueness constraint.
    #[error("unique constraint violated on '{table}': {detail}")]
    UniqueViolation {
        /// Physical table name.
        table: String,
        /// Store-provided detail.
        detail: String,
    },
    /// The store could not be reached; retryable by the caller.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store refused the request for a reason other than schema drift.
    #[error("store rejected request (status {status}): {message}")]
    Rejected {
        /// HTTP-like status code.
        status: u16,
        /// Store-provided message.
        message: String,
    },
    /// A mandatory field could not be written under any candidate column.
    #[error("no column accepts mandatory field '{field}' of {entity}")]
    SchemaMismatch {
        /// Logical entity name.
        entity: &'static str,
        /// Logical field name.
        field: String,
    },
    /// Parse error while converting a row to a typed record.
    #[error("parse error: {0}")]
    Parse(#[from] crate::typed::ParseError),
    /// Snapshot or payload (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// True for failures the caller may retry (transport or backend outage).
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
