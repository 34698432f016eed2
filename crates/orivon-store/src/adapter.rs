//! Schema-tolerant adapter.
//!
//! Reads walk every candidate table and every combination of candidate
//! filter columns until one yields rows; unknown tables and columns are
//! skipped, transport failures propagate. Writes start with the full field
//! set; when the store rejects a column, the offending field moves to its
//! next candidate column, and once candidates run out an optional field is
//! stripped while a mandatory one fails the write.

use crate::error::StoreError;
use crate::filter::Filter;
use crate::row::Row;
use crate::schema::{EntityKind, EntitySchema};
use crate::traits::TabularStore;
use crate::typed::FromRow;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Logical-schema access to a tabular store.
#[derive(Clone)]
pub struct RecordAdapter {
    store: Arc<dyn TabularStore + Send + Sync>,
}

impl std::fmt::Debug for RecordAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordAdapter").finish_non_exhaustive()
    }
}

impl RecordAdapter {
    /// Wraps a backend.
    pub fn new<S>(store: S) -> Self
    where
        S: TabularStore + Send + Sync + 'static,
    {
        Self {
            store: Arc::new(store),
        }
    }

    /// Wraps an already shared backend.
    pub fn from_shared(store: Arc<dyn TabularStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// First row matching a logical filter, or `None` when no candidate layout has one.
    pub fn find(&self, kind: EntityKind, filter: &Filter) -> Result<Option<Row>, StoreError> {
        Ok(self.find_all(kind, filter)?.into_iter().next())
    }

    /// All rows matching a logical filter, from the first candidate layout that has any.
    pub fn find_all(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        let schema = kind.schema();
        let candidates: Vec<Vec<String>> = filter
            .clauses()
            .iter()
            .map(|(name, _)| schema.columns_of(name))
            .collect();

        'tables: for table in schema.tables {
            let mut dead: HashSet<String> = HashSet::new();
            for choice in combinations(&candidates) {
                let columns: Vec<&str> = choice
                    .iter()
                    .enumerate()
                    .map(|(i, &c)| candidates[i][c].as_str())
                    .collect();
                if columns.iter().any(|c| dead.contains(*c)) {
                    continue;
                }
                let physical = physical_filter(filter, &columns);
                match self.store.select(table, &physical) {
                    Ok(rows) if !rows.is_empty() => {
                        return Ok(rows.into_iter().map(|r| schema.to_logical(r)).collect());
                    }
                    Ok(_) => continue,
                    Err(StoreError::UnknownColumn { column, .. }) => {
                        debug!(table = *table, column = %column, "skipping unknown filter column");
                        dead.insert(column);
                    }
                    Err(StoreError::UnknownTable(_)) => {
                        debug!(table = *table, "skipping unknown table");
                        continue 'tables;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(Vec::new())
    }

    /// Typed form of [`find`](Self::find).
    pub fn find_as<T: FromRow>(
        &self,
        kind: EntityKind,
        filter: &Filter,
    ) -> Result<Option<T>, StoreError> {
        match self.find(kind, filter)? {
            Some(row) => Ok(Some(T::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Typed form of [`find_all`](Self::find_all); rows that do not parse are skipped.
    pub fn find_all_as<T: FromRow>(
        &self,
        kind: EntityKind,
        filter: &Filter,
    ) -> Result<Vec<T>, StoreError> {
        let mut records = Vec::new();
        for row in self.find_all(kind, filter)? {
            match T::from_row(&row) {
                Ok(record) => records.push(record),
                Err(e) => warn!(entity = kind.schema().entity, error = %e, "skipping malformed row"),
            }
        }
        Ok(records)
    }

    /// Inserts a logical row.
    pub fn insert(&self, kind: EntityKind, payload: Row) -> Result<Row, StoreError> {
        self.write(kind, payload, |store, table, plan| {
            store.insert(table, plan.physical())
        })
    }

    /// Inserts a logical row, merging on the `conflict_key` field.
    pub fn upsert(
        &self,
        kind: EntityKind,
        payload: Row,
        conflict_key: &str,
    ) -> Result<Row, StoreError> {
        let schema = kind.schema();
        self.write(kind, payload, |store, table, plan| {
            let column = plan
                .column_of(conflict_key)
                .map(str::to_string)
                .or_else(|| schema.columns_of(conflict_key).into_iter().next())
                .unwrap_or_else(|| conflict_key.to_string());
            store.upsert(table, plan.physical(), &column)
        })
    }

    /// Applies logical `fields` to the first row matching the logical `key`.
    ///
    /// Returns `None` when no candidate layout holds a matching row.
    pub fn update(
        &self,
        kind: EntityKind,
        key: &Filter,
        fields: Row,
    ) -> Result<Option<Row>, StoreError> {
        if fields.is_empty() {
            return self.find(kind, key);
        }
        let schema = kind.schema();
        let candidates: Vec<Vec<String>> = key
            .clauses()
            .iter()
            .map(|(name, _)| schema.columns_of(name))
            .collect();

        'tables: for table in schema.tables {
            let mut dead: HashSet<String> = HashSet::new();
            let mut plan = WritePlan::new(schema, fields.clone());
            for choice in combinations(&candidates) {
                let columns: Vec<&str> = choice
                    .iter()
                    .enumerate()
                    .map(|(i, &c)| candidates[i][c].as_str())
                    .collect();
                if columns.iter().any(|c| dead.contains(*c)) {
                    continue;
                }
                let physical_key = physical_filter(key, &columns);
                loop {
                    match self.store.update(table, &physical_key, plan.physical()) {
                        Ok(rows) => match rows.into_iter().next() {
                            Some(row) => return Ok(Some(schema.to_logical(row))),
                            None => break,
                        },
                        Err(StoreError::UnknownTable(_)) => {
                            debug!(table = *table, "skipping unknown table");
                            continue 'tables;
                        }
                        Err(StoreError::UnknownColumn { table: t, column }) => {
                            if columns.contains(&column.as_str()) {
                                debug!(table = *table, column = %column, "skipping unknown key column");
                                dead.insert(column);
                                break;
                            }
                            plan.drop_or_advance(t, column.clone())?;
                            if plan.is_empty() {
                                return Err(StoreError::SchemaMismatch {
                                    entity: schema.entity,
                                    field: column,
                                });
                            }
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(None)
    }

    fn write<F>(&self, kind: EntityKind, payload: Row, op: F) -> Result<Row, StoreError>
    where
        F: Fn(&dyn TabularStore, &str, &WritePlan) -> Result<Row, StoreError>,
    {
        let schema = kind.schema();
        let mut last = StoreError::UnknownTable(schema.tables.join(","));
        for table in schema.tables {
            let mut plan = WritePlan::new(schema, payload.clone());
            loop {
                match op(self.store.as_ref(), table, &plan) {
                    Ok(row) => return Ok(schema.to_logical(row)),
                    Err(StoreError::UnknownTable(t)) => {
                        debug!(table = %t, "skipping unknown table");
                        last = StoreError::UnknownTable(t);
                        break;
                    }
                    Err(StoreError::UnknownColumn { table: t, column }) => {
                        plan.drop_or_advance(t, column)?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Err(last)
    }
}

/// Field set of one write, with the candidate column currently in use per field.
struct WritePlan {
    schema: &'static EntitySchema,
    fields: Vec<PlannedField>,
}

struct PlannedField {
    name: String,
    value: Value,
    columns: Vec<String>,
    index: usize,
}

impl WritePlan {
    fn new(schema: &'static EntitySchema, payload: Row) -> Self {
        let fields = payload
            .into_iter()
            .map(|(name, value)| PlannedField {
                columns: schema.columns_of(&name),
                name,
                value,
                index: 0,
            })
            .collect();
        Self { schema, fields }
    }

    fn physical(&self) -> Row {
        self.fields
            .iter()
            .map(|f| (f.columns[f.index].clone(), f.value.clone()))
            .collect()
    }

    fn column_of(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.columns[f.index].as_str())
    }

    fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reacts to a rejected column: next candidate, else strip, else fail.
    fn drop_or_advance(&mut self, table: String, column: String) -> Result<(), StoreError> {
        let Some(pos) = self
            .fields
            .iter()
            .position(|f| f.columns[f.index] == column)
        else {
            return Err(StoreError::UnknownColumn { table, column });
        };
        let entity = self.schema.entity;
        let field = &mut self.fields[pos];
        if field.index + 1 < field.columns.len() {
            field.index += 1;
            debug!(
                entity,
                field = %field.name,
                rejected = %column,
                next = %field.columns[field.index],
                "retrying write with next candidate column"
            );
            return Ok(());
        }
        if self.schema.is_mandatory(&field.name) {
            return Err(StoreError::SchemaMismatch {
                entity,
                field: field.name.clone(),
            });
        }
        warn!(entity, field = %field.name, table = %table, "stripping field unsupported by schema");
        self.fields.remove(pos);
        Ok(())
    }
}

fn physical_filter(logical: &Filter, columns: &[&str]) -> Filter {
    logical
        .clauses()
        .iter()
        .zip(columns)
        .fold(Filter::new(), |f, ((_, value), column)| {
            f.eq(*column, value.clone())
        })
}

/// Every index vector over the given candidate lists, first candidates first.
fn combinations(candidates: &[Vec<String>]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for list in candidates {
        let mut next = Vec::with_capacity(out.len() * list.len());
        for prefix in &out {
            for i in 0..list.len() {
                let mut choice = prefix.clone();
                choice.push(i);
                next.push(choice);
            }
        }
        out = next;
    }
    out
}
