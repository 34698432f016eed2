//! Storage backend trait.

use crate::error::StoreError;
use crate::filter::Filter;
use crate::row::Row;
use std::sync::Arc;

/// A remote tabular store addressed by physical table and column names.
///
/// Implementations must report schema drift with
/// [`StoreError::UnknownColumn`] / [`StoreError::UnknownTable`], uniqueness
/// conflicts with [`StoreError::UniqueViolation`], and transport problems
/// with [`StoreError::Unavailable`]. Timeouts belong to the implementation.
pub trait TabularStore {
    /// Returns every row of `table` matching `filter`.
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError>;

    /// Inserts one row and returns it as stored.
    fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Inserts one row, merging into the existing row whose `on_conflict`
    /// column has the same value.
    fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row, StoreError>;

    /// Applies `changes` to every row matching `filter` and returns the updated rows.
    fn update(&self, table: &str, filter: &Filter, changes: Row) -> Result<Vec<Row>, StoreError>;
}

impl<T: TabularStore + ?Sized> TabularStore for Arc<T> {
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        (**self).select(table, filter)
    }

    fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        (**self).insert(table, row)
    }

    fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row, StoreError> {
        (**self).upsert(table, row, on_conflict)
    }

    fn update(&self, table: &str, filter: &Filter, changes: Row) -> Result<Vec<Row>, StoreError> {
        (**self).update(table, filter, changes)
    }
}
