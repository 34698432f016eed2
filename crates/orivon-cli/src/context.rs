//! Process wiring: configuration, store backend and core components.

use orivon_canonical::OrderRef;
use orivon_core::{
    AttemptEngine, AvailabilityResolver, ConfigError, CoreConfig, CoreError, CredentialValidator,
    IdentityResolver, OrderRequest, PaymentProcessor, PurchaseLedger, RazorpayClient,
    SessionAuthority, User,
};
use orivon_store::{FileStore, PostgrestConfig, PostgrestStore, RecordAdapter, StoreError};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The store could not be opened.
    #[error("store: {0}")]
    Store(#[from] StoreError),
    /// A core operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// A JSON argument or output could not be processed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Arguments are inconsistent.
    #[error("{0}")]
    Usage(String),
}

/// Stands in for the payment processor when no keys are configured.
///
/// Free certifications never reach it, so the CLI stays usable offline.
struct UnconfiguredProcessor;

impl PaymentProcessor for UnconfiguredProcessor {
    fn create_order(&self, _request: &OrderRequest) -> Result<OrderRef, CoreError> {
        Err(CoreError::Unavailable(
            "payment processor credentials are not configured".into(),
        ))
    }
}

/// Components built once per invocation.
pub struct Context {
    /// Sign-in and token authentication.
    pub sessions: SessionAuthority,
    /// Orders and payment verification.
    pub ledger: PurchaseLedger,
    /// Attempt lifecycle.
    pub attempts: AttemptEngine,
    /// Certificate availability.
    pub availability: AvailabilityResolver,
}

impl Context {
    /// Loads configuration and opens the selected store.
    pub fn open(config_path: &Path, snapshot: Option<&Path>) -> Result<Self, CliError> {
        let config = CoreConfig::load_optional(config_path)?.with_env(|k| std::env::var(k).ok())?;
        let store = match snapshot {
            Some(path) => {
                debug!(path = %path.display(), "using snapshot store");
                RecordAdapter::new(FileStore::open(path)?)
            }
            None => RecordAdapter::new(PostgrestStore::new(remote_store(&config)?)),
        };

        let processor: Arc<dyn PaymentProcessor> =
            match RazorpayClient::from_settings(&config.payments) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    debug!(reason = %e, "payment processor disabled");
                    Arc::new(UnconfiguredProcessor)
                }
            };

        Ok(Self {
            sessions: SessionAuthority::new(
                IdentityResolver::new(store.clone(), &config),
                CredentialValidator::new(&config),
            ),
            ledger: PurchaseLedger::new(store.clone(), processor, &config),
            attempts: AttemptEngine::new(store.clone()),
            availability: AvailabilityResolver::new(store),
        })
    }

    /// Resolves the caller behind a session token.
    pub fn caller(&self, token: &str) -> Result<User, CliError> {
        Ok(self.sessions.authenticate(token)?)
    }
}

fn remote_store(config: &CoreConfig) -> Result<PostgrestConfig, CliError> {
    let (Some(url), Some(key)) = (&config.store.url, &config.store.key) else {
        return Err(CliError::Usage(
            "no store configured: pass --store <snapshot.json> or set SUPABASE_URL and SUPABASE_KEY"
                .into(),
        ));
    };
    Ok(PostgrestConfig {
        base_url: url.clone(),
        api_key: SecretString::from(key.expose_secret().to_string()),
        timeout: config.store.timeout,
    })
}

/// Parses an optional JSON argument; absent means `null`.
pub fn json_arg(flag: &str, value: Option<&str>) -> Result<Value, CliError> {
    match value {
        None => Ok(Value::Null),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| CliError::Usage(format!("--{flag} is not valid JSON: {e}"))),
    }
}
