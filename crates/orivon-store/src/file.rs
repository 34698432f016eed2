//! JSON snapshot file backend.
//!
//! Holds a [`MemoryStore`] and rewrites the snapshot file after every
//! successful write. Used by the command-line front end.

use crate::error::StoreError;
use crate::filter::Filter;
use crate::layout;
use crate::memory::{MemoryStore, Snapshot};
use crate::row::Row;
use crate::traits::TabularStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// [`TabularStore`] persisted as a single JSON document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Opens a snapshot, creating it with the current layout if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let store = Self {
                inner: MemoryStore::with_layout(layout::current()),
                path,
            };
            store.persist()?;
            return Ok(store);
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        debug!(path = %path.display(), tables = snapshot.tables.len(), "opened snapshot");
        Ok(Self {
            inner: MemoryStore::from_snapshot(snapshot),
            path,
        })
    }

    /// Writes `snapshot` to `path`, replacing any existing file, and opens it.
    pub fn create(path: impl AsRef<Path>, snapshot: Snapshot) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            inner: MemoryStore::from_snapshot(snapshot),
        };
        store.persist()?;
        Ok(store)
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory view.
    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    fn persist(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.inner.snapshot())?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", self.path.display())))
    }
}

impl TabularStore for FileStore {
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        self.inner.select(table, filter)
    }

    fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let stored = self.inner.insert(table, row)?;
        self.persist()?;
        Ok(stored)
    }

    fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row, StoreError> {
        let stored = self.inner.upsert(table, row, on_conflict)?;
        self.persist()?;
        Ok(stored)
    }

    fn update(&self, table: &str, filter: &Filter, changes: Row) -> Result<Vec<Row>, StoreError> {
        let updated = self.inner.update(table, filter, changes)?;
        if !updated.is_empty() {
            self.persist()?;
        }
        Ok(updated)
    }
}
