//! PostgREST (Supabase) HTTP backend.
//!
//! Rows travel as JSON arrays; filters are rendered as `column=eq.value`
//! query parameters. Error bodies carry a PostgREST or Postgres code that
//! [`classify`] maps onto [`StoreError`] so the adapter can tell schema
//! drift apart from outages.

use crate::error::StoreError;
use crate::filter::Filter;
use crate::row::{render, Row};
use crate::traits::TabularStore;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`PostgrestStore`].
#[derive(Debug)]
pub struct PostgrestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Service or anon key, sent as `apikey` and bearer token.
    pub api_key: SecretString,
    /// Connect, read and write timeout.
    pub timeout: Duration,
}

/// [`TabularStore`] speaking the PostgREST protocol.
#[derive(Debug)]
pub struct PostgrestStore {
    agent: ureq::Agent,
    config: PostgrestConfig,
}

impl PostgrestStore {
    /// Builds a client; no request is made until the first call.
    pub fn new(config: PostgrestConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .timeout_read(config.timeout)
            .timeout_write(config.timeout)
            .build();
        Self { agent, config }
    }

    fn request(&self, method: &str, table: &str) -> ureq::Request {
        let url = format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            table
        );
        let key = self.config.api_key.expose_secret();
        self.agent
            .request(method, &url)
            .set("apikey", key)
            .set("Authorization", &format!("Bearer {key}"))
            .set("Accept", "application/json")
    }

    fn send(
        &self,
        table: &str,
        request: ureq::Request,
        body: Option<Value>,
    ) -> Result<Vec<Row>, StoreError> {
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        match result {
            Ok(response) => {
                let text = response
                    .into_string()
                    .map_err(|e| StoreError::Unavailable(format!("reading response: {e}")))?;
                if text.trim().is_empty() {
                    return Ok(Vec::new());
                }
                Ok(serde_json::from_str(&text)?)
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                let err = classify(status, &body, table);
                debug!(table, status, error = %err, "store request failed");
                Err(err)
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(StoreError::Unavailable(transport.to_string()))
            }
        }
    }

    fn first(table: &str, rows: Vec<Row>) -> Result<Row, StoreError> {
        rows.into_iter().next().ok_or_else(|| {
            StoreError::Serialization(format!("'{table}' returned no representation"))
        })
    }
}

fn with_filter(mut request: ureq::Request, filter: &Filter) -> ureq::Request {
    for (column, value) in filter.clauses() {
        request = request.query(column, &format!("eq.{}", render(value)));
    }
    request
}

impl TabularStore for PostgrestStore {
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        let request = with_filter(self.request("GET", table).query("select", "*"), filter);
        self.send(table, request, None)
    }

    fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let request = self
            .request("POST", table)
            .set("Prefer", "return=representation");
        let rows = self.send(table, request, Some(Value::Array(vec![Value::Object(row)])))?;
        Self::first(table, rows)
    }

    fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row, StoreError> {
        let request = self
            .request("POST", table)
            .query("on_conflict", on_conflict)
            .set("Prefer", "return=representation,resolution=merge-duplicates");
        let rows = self.send(table, request, Some(Value::Array(vec![Value::Object(row)])))?;
        Self::first(table, rows)
    }

    fn update(&self, table: &str, filter: &Filter, changes: Row) -> Result<Vec<Row>, StoreError> {
        let request = with_filter(
            self.request("PATCH", table)
                .set("Prefer", "return=representation"),
            filter,
        );
        self.send(table, request, Some(Value::Object(changes)))
    }
}

/// Maps an error response onto a [`StoreError`].
pub fn classify(status: u16, body: &str, table: &str) -> StoreError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let code = parsed.get("code").and_then(Value::as_str).unwrap_or("");
    let message = parsed
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(body)
        .to_string();

    match code {
        "PGRST204" | "42703" => StoreError::UnknownColumn {
            table: table.to_string(),
            column: column_in(&message).unwrap_or_default(),
        },
        "PGRST205" | "42P01" => StoreError::UnknownTable(table.to_string()),
        "23505" => StoreError::UniqueViolation {
            table: table.to_string(),
            detail: message,
        },
        _ if status >= 500 => StoreError::Unavailable(format!("status {status}: {message}")),
        _ => StoreError::Rejected { status, message },
    }
}

/// Column name quoted in a drift message.
///
/// Understands `Could not find the 'col' column of 'tbl' ...`,
/// `column "col" does not exist` and `column tbl.col does not exist`.
fn column_in(message: &str) -> Option<String> {
    for quote in ['\'', '"'] {
        let mut parts = message.split(quote);
        if let (Some(_), Some(inner)) = (parts.next(), parts.next()) {
            if !inner.is_empty() && message.matches(quote).count() >= 2 {
                return Some(inner.to_string());
            }
        }
    }
    let rest = message.strip_prefix("column ")?;
    let name = rest.split_whitespace().next()?;
    Some(name.rsplit('.').next().unwrap_or(name).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_codes() {
        assert_eq!(
            classify(
                400,
                r#"{"code":"PGRST204","message":"Could not find the 'displayName' column of 'users' in the schema cache"}"#,
                "users"
            ),
            StoreError::UnknownColumn {
                table: "users".into(),
                column: "displayName".into()
            }
        );
        assert_eq!(
            classify(
                400,
                r#"{"code":"42703","message":"column attempts.certification_id does not exist"}"#,
                "attempts"
            ),
            StoreError::UnknownColumn {
                table: "attempts".into(),
                column: "certification_id".into()
            }
        );
        assert_eq!(
            classify(404, r#"{"code":"PGRST205","message":"Could not find the table"}"#, "User"),
            StoreError::UnknownTable("User".into())
        );
    }

    #[test]
    fn conflicts_outages_and_rejections() {
        assert!(matches!(
            classify(409, r#"{"code":"23505","message":"duplicate key"}"#, "users"),
            StoreError::UniqueViolation { .. }
        ));
        assert!(matches!(
            classify(503, "upstream down", "users"),
            StoreError::Unavailable(_)
        ));
        assert_eq!(
            classify(401, r#"{"code":"PGRST301","message":"JWT expired"}"#, "users"),
            StoreError::Rejected {
                status: 401,
                message: "JWT expired".into()
            }
        );
    }

    #[test]
    fn quoted_column_forms() {
        assert_eq!(
            column_in(r#"column "exma_id" does not exist"#).as_deref(),
            Some("exma_id")
        );
        assert_eq!(column_in("column score does not exist").as_deref(), Some("score"));
        assert_eq!(column_in("something else"), None);
    }
}
