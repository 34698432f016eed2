//! Schema-tolerant record storage for the Orivon core.
//!
//! This crate provides:
//! - `TabularStore`, the backend trait for filtered reads, inserts, upserts
//!   and updates by equality predicates
//! - `RecordAdapter`, which hides physical schema drift (candidate tables,
//!   candidate columns, optional fields) behind logical entity schemas
//! - Typed row parsing helpers
//! - Backends: in-memory (reference), JSON snapshot file, PostgREST over HTTP
//!
//! Components above this crate only ever see logical field names.

#![deny(missing_docs)]

/// Schema-tolerant adapter over a tabular store.
pub mod adapter;
/// Error types for store operations.
pub mod error;
/// JSON snapshot file backend.
pub mod file;
/// Equality predicates.
pub mod filter;
/// Physical table layouts for the in-memory backend.
pub mod layout;
/// In-memory backend.
pub mod memory;
/// PostgREST (Supabase) HTTP backend.
pub mod postgrest;
/// Row accessors with type coercion.
pub mod row;
/// Logical entity schemas and their candidate names.
pub mod schema;
/// Storage backend trait.
pub mod traits;
/// Typed row parsing.
pub mod typed;

pub use adapter::RecordAdapter;
pub use error::StoreError;
pub use file::FileStore;
pub use filter::Filter;
pub use memory::{Generated, MemoryStore, Snapshot, TableDef, TableState};
pub use postgrest::{PostgrestConfig, PostgrestStore};
pub use row::Row;
pub use schema::{EntityKind, EntitySchema, FieldSpec};
pub use traits::TabularStore;
pub use typed::{FromRow, ParseError};
