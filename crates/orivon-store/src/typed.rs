//! Typed record parsing from logical rows.

use crate::row::Row;
use thiserror::Error;

/// Error that can occur when parsing a row into a typed record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A field the record cannot do without is absent.
    #[error("{entity} row is missing '{field}'")]
    MissingField {
        /// Logical entity name.
        entity: &'static str,
        /// Logical field name.
        field: &'static str,
    },
    /// A field holds a value the record does not accept.
    #[error("{entity} row has invalid '{field}': {value}")]
    InvalidValue {
        /// Logical entity name.
        entity: &'static str,
        /// Logical field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Conversion from a logical row (as returned by the adapter) to a record.
pub trait FromRow: Sized {
    /// Parses the record, failing only on fields it cannot do without.
    fn from_row(row: &Row) -> Result<Self, ParseError>;
}
