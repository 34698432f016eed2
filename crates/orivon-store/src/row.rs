//! Row accessors.
//!
//! Physical rows come back with inconsistent types across schema versions:
//! scores as numbers or numeric strings, flags as booleans or `0`/`1`,
//! ids as integers or uuids. These helpers coerce on read and never fail.

use serde_json::{Map, Value};

/// A record: column or logical field name to JSON value.
pub type Row = Map<String, Value>;

/// Reads a field as text. Numbers and booleans are rendered; null is absent.
pub fn text(row: &Row, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads a field as non-empty text; empty strings count as absent.
pub fn non_empty_text(row: &Row, field: &str) -> Option<String> {
    text(row, field).filter(|s| !s.trim().is_empty())
}

/// Reads a field as a float, parsing numeric strings.
pub fn number(row: &Row, field: &str) -> Option<f64> {
    match row.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

/// Reads a field as an integer, truncating fractional values.
pub fn integer(row: &Row, field: &str) -> Option<i64> {
    if let Some(Value::Number(n)) = row.get(field) {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
    }
    number(row, field).map(|f| f.trunc() as i64)
}

/// Reads a field as a boolean, accepting `true`/`false`, `1`/`0` and their string forms.
pub fn boolean(row: &Row, field: &str) -> Option<bool> {
    match row.get(field)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Some(true),
            "false" | "f" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Equality as a remote store compares filter values: `42` matches `"42"`.
pub fn loosely_equal(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    match (left, right) {
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            s == &n.to_string()
        }
        (Value::String(s), Value::Bool(b)) | (Value::Bool(b), Value::String(s)) => {
            s == &b.to_string()
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

/// Renders a value the way it appears in a query string.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
