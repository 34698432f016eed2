//! Equality predicates.

use crate::row::{loosely_equal, Row};
use serde_json::Value;

/// Conjunction of equality clauses, the only filter shape the remote store offers.
///
/// The same type is used with logical field names (callers of the adapter)
/// and with physical column names (backends).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// An empty filter matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an `name = value` clause.
    pub fn eq(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((name.into(), value.into()));
        self
    }

    /// The clauses in insertion order.
    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    /// True when the filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns true if every clause matches the row.
    ///
    /// A missing field never matches.
    pub fn matches(&self, row: &Row) -> bool {
        self.clauses.iter().all(|(name, value)| {
            row.get(name)
                .map(|actual| loosely_equal(actual, value))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_clauses_must_match() {
        let row = json!({"user_id": "u1", "status": "completed", "score": 80})
            .as_object()
            .cloned()
            .unwrap();
        assert!(Filter::new().matches(&row));
        assert!(Filter::new().eq("user_id", "u1").eq("score", "80").matches(&row));
        assert!(!Filter::new().eq("user_id", "u1").eq("status", "started").matches(&row));
        assert!(!Filter::new().eq("certification_id", "c1").matches(&row));
    }
}
