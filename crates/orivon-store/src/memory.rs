//! In-memory backend.
//!
//! Tables have a fixed column set so that schema drift can be reproduced:
//! filtering or writing an unknown column fails with
//! [`StoreError::UnknownColumn`] exactly like the remote store does. The
//! backend also supports outage and per-table write failure injection.

use crate::error::StoreError;
use crate::filter::Filter;
use crate::row::{loosely_equal, Row};
use crate::traits::TabularStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Key generation for a column left empty on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Generated {
    /// Increasing integers starting at 1.
    Serial {
        /// Generated column.
        column: String,
    },
    /// Random UUID strings.
    Uuid {
        /// Generated column.
        column: String,
    },
}

impl Generated {
    fn column(&self) -> &str {
        match self {
            Generated::Serial { column } | Generated::Uuid { column } => column,
        }
    }
}

/// Definition of one physical table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    /// Known columns.
    pub columns: Vec<String>,
    /// Columns with a uniqueness constraint.
    #[serde(default)]
    pub unique: Vec<String>,
    /// Key generation, if any.
    #[serde(default)]
    pub generated: Option<Generated>,
}

impl TableDef {
    /// A table with the given columns and no constraints.
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Adds uniqueness constraints.
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Generates serial integers for `column`.
    pub fn serial(mut self, column: &str) -> Self {
        self.generated = Some(Generated::Serial {
            column: column.to_string(),
        });
        self
    }

    /// Generates UUID strings for `column`.
    pub fn uuid(mut self, column: &str) -> Self {
        self.generated = Some(Generated::Uuid {
            column: column.to_string(),
        });
        self
    }

    fn has(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Contents of one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    /// Table definition.
    pub def: TableDef,
    /// Rows in insertion order.
    #[serde(default)]
    pub rows: Vec<Row>,
    /// Last serial handed out.
    #[serde(default)]
    pub last_serial: i64,
}

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tables by physical name.
    pub tables: BTreeMap<String, TableState>,
}

/// Reference [`TabularStore`] holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Snapshot>,
    unavailable: AtomicBool,
    failing_writes: Mutex<HashSet<String>>,
}

impl MemoryStore {
    /// An empty store without tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with the given tables, all empty.
    pub fn with_layout(layout: Vec<(&str, TableDef)>) -> Self {
        let store = Self::new();
        for (name, def) in layout {
            store.create_table(name, def);
        }
        store
    }

    /// A store restored from a snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Snapshot {
        self.state().clone()
    }

    /// Creates (or replaces) a table.
    pub fn create_table(&self, name: &str, def: TableDef) {
        self.state().tables.insert(
            name.to_string(),
            TableState {
                def,
                ..TableState::default()
            },
        );
    }

    /// Every row of a table, or an empty list for an unknown table.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Makes every call fail with [`StoreError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes writes to `table` fail with [`StoreError::Unavailable`].
    pub fn fail_writes_to(&self, table: &str) {
        self.failing().insert(table.to_string());
    }

    /// Clears every injected write failure.
    pub fn restore_writes(&self) {
        self.failing().clear();
    }

    fn state(&self) -> MutexGuard<'_, Snapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn failing(&self) -> MutexGuard<'_, HashSet<String>> {
        self.failing_writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    fn check_writable(&self, table: &str) -> Result<(), StoreError> {
        self.check_available()?;
        if self.failing().contains(table) {
            return Err(StoreError::Unavailable(format!(
                "writes to '{table}' are failing"
            )));
        }
        Ok(())
    }
}

fn table_mut<'a>(state: &'a mut Snapshot, table: &str) -> Result<&'a mut TableState, StoreError> {
    state
        .tables
        .get_mut(table)
        .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
}

fn check_columns<'a>(
    table: &str,
    def: &TableDef,
    columns: impl IntoIterator<Item = &'a String>,
) -> Result<(), StoreError> {
    for column in columns {
        if !def.has(column) {
            return Err(StoreError::UnknownColumn {
                table: table.to_string(),
                column: column.clone(),
            });
        }
    }
    Ok(())
}

/// Fails if `row` collides on a unique column with any row except `skip`.
fn check_unique(
    table: &str,
    state: &TableState,
    row: &Row,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    for column in &state.def.unique {
        let Some(value) = row.get(column).filter(|v| !v.is_null()) else {
            continue;
        };
        let clash = state.rows.iter().enumerate().any(|(i, existing)| {
            Some(i) != skip
                && existing
                    .get(column)
                    .map(|v| loosely_equal(v, value))
                    .unwrap_or(false)
        });
        if clash {
            return Err(StoreError::UniqueViolation {
                table: table.to_string(),
                detail: format!("duplicate key value for '{column}'"),
            });
        }
    }
    Ok(())
}

fn insert_row(table: &str, state: &mut TableState, row: Row) -> Result<Row, StoreError> {
    let mut full: Row = state
        .def
        .columns
        .iter()
        .map(|c| (c.clone(), Value::Null))
        .collect();
    full.extend(row);
    if let Some(generated) = state.def.generated.clone() {
        let column = generated.column().to_string();
        if full.get(&column).map(Value::is_null).unwrap_or(true) {
            let value = match generated {
                Generated::Serial { .. } => {
                    state.last_serial += 1;
                    Value::from(state.last_serial)
                }
                Generated::Uuid { .. } => Value::from(uuid::Uuid::new_v4().to_string()),
            };
            full.insert(column, value);
        }
    }
    check_unique(table, state, &full, None)?;
    state.rows.push(full.clone());
    Ok(full)
}

impl TabularStore for MemoryStore {
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        self.check_available()?;
        let mut state = self.state();
        let t = table_mut(&mut state, table)?;
        check_columns(table, &t.def, filter.clauses().iter().map(|(c, _)| c))?;
        Ok(t.rows.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        self.check_writable(table)?;
        let mut state = self.state();
        let t = table_mut(&mut state, table)?;
        check_columns(table, &t.def, row.keys())?;
        insert_row(table, t, row)
    }

    fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row, StoreError> {
        self.check_writable(table)?;
        let mut state = self.state();
        let t = table_mut(&mut state, table)?;
        check_columns(table, &t.def, row.keys())?;
        check_columns(table, &t.def, [&on_conflict.to_string()])?;

        let existing = row.get(on_conflict).filter(|v| !v.is_null()).and_then(|key| {
            t.rows.iter().position(|r| {
                r.get(on_conflict)
                    .map(|v| loosely_equal(v, key))
                    .unwrap_or(false)
            })
        });
        match existing {
            Some(index) => {
                let mut merged = t.rows[index].clone();
                merged.extend(row);
                check_unique(table, t, &merged, Some(index))?;
                t.rows[index] = merged.clone();
                Ok(merged)
            }
            None => insert_row(table, t, row),
        }
    }

    fn update(&self, table: &str, filter: &Filter, changes: Row) -> Result<Vec<Row>, StoreError> {
        self.check_writable(table)?;
        let mut state = self.state();
        let t = table_mut(&mut state, table)?;
        check_columns(table, &t.def, filter.clauses().iter().map(|(c, _)| c))?;
        check_columns(table, &t.def, changes.keys())?;

        let matching: Vec<usize> = t
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r))
            .map(|(i, _)| i)
            .collect();
        let mut updated = Vec::with_capacity(matching.len());
        for index in matching {
            let mut merged = t.rows[index].clone();
            merged.extend(changes.clone());
            check_unique(table, t, &merged, Some(index))?;
            t.rows[index] = merged.clone();
            updated.push(merged);
        }
        Ok(updated)
    }
}
