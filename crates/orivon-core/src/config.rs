//! Process configuration.
//!
//! Built once at start-up from an optional TOML file plus environment
//! overrides, then passed by reference into each component constructor.

use jsonwebtoken::Algorithm;
use orivon_canonical::Currency;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_SECRET: &str = "secret";
const DEFAULT_EXPIRES_MINUTES: i64 = 43_200;
/// One hundred years.
const MAX_EXPIRES_MINUTES: i64 = 100 * 365 * 24 * 60;
const DEFAULT_PAYMENT_API: &str = "https://api.razorpay.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for this schema.
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of its allowed range.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Setting name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Remote store connection.
#[derive(Debug)]
pub struct StoreSettings {
    /// PostgREST project URL.
    pub url: Option<String>,
    /// API key.
    pub key: Option<SecretString>,
    /// Request timeout.
    pub timeout: Duration,
}

/// Session credential signing.
#[derive(Debug)]
pub struct CredentialSettings {
    /// Shared HMAC secret.
    pub secret: SecretString,
    /// HMAC algorithm.
    pub algorithm: Algorithm,
    /// Lifetime of issued credentials.
    pub expires_minutes: i64,
}

/// Payment processor access.
#[derive(Debug)]
pub struct PaymentSettings {
    /// Public key id, also handed to the checkout client.
    pub key_id: Option<String>,
    /// Secret used for API auth and signature verification.
    pub key_secret: Option<SecretString>,
    /// Currency of every order.
    pub currency: Currency,
    /// Processor API base URL.
    pub api_base: String,
    /// Request timeout.
    pub timeout: Duration,
}

/// Identity policy.
#[derive(Debug, Default)]
pub struct IdentitySettings {
    /// Lower-cased emails that receive the admin role.
    pub admin_emails: Vec<String>,
}

/// Read-only configuration shared by every component.
#[derive(Debug)]
pub struct CoreConfig {
    /// Remote store.
    pub store: StoreSettings,
    /// Session credentials.
    pub credentials: CredentialSettings,
    /// Payment processor.
    pub payments: PaymentSettings,
    /// Identity policy.
    pub identity: IdentitySettings,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            store: StoreSettings {
                url: None,
                key: None,
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
            credentials: CredentialSettings {
                secret: SecretString::from(DEFAULT_SECRET.to_string()),
                algorithm: Algorithm::HS256,
                expires_minutes: DEFAULT_EXPIRES_MINUTES,
            },
            payments: PaymentSettings {
                key_id: None,
                key_secret: None,
                currency: Currency::default(),
                api_base: DEFAULT_PAYMENT_API.to_string(),
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
            identity: IdentitySettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    store: RawStore,
    credentials: RawCredentials,
    payments: RawPayments,
    identity: RawIdentity,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawStore {
    url: Option<String>,
    key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCredentials {
    secret: Option<String>,
    algorithm: Option<String>,
    expires_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPayments {
    key_id: Option<String>,
    key_secret: Option<String>,
    currency: Option<String>,
    api_base: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawIdentity {
    admin_emails: Vec<String>,
}

impl CoreConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let mut config = Self::default();

        config.store.url = raw.store.url;
        config.store.key = raw.store.key.map(SecretString::from);
        if let Some(secs) = raw.store.timeout_secs {
            config.store.timeout = timeout("store.timeout_secs", secs)?;
        }

        if let Some(secret) = raw.credentials.secret {
            config.credentials.secret = SecretString::from(secret);
        }
        if let Some(alg) = raw.credentials.algorithm {
            config.credentials.algorithm = hmac_algorithm(&alg)?;
        }
        if let Some(minutes) = raw.credentials.expires_minutes {
            config.credentials.expires_minutes = expiry(minutes)?;
        }

        config.payments.key_id = raw.payments.key_id;
        config.payments.key_secret = raw.payments.key_secret.map(SecretString::from);
        if let Some(currency) = raw.payments.currency {
            config.payments.currency =
                Currency::parse(currency).map_err(|e| ConfigError::Invalid {
                    field: "payments.currency",
                    reason: e.to_string(),
                })?;
        }
        if let Some(base) = raw.payments.api_base {
            config.payments.api_base = base;
        }
        if let Some(secs) = raw.payments.timeout_secs {
            config.payments.timeout = timeout("payments.timeout_secs", secs)?;
        }

        config.identity.admin_emails = normalize_emails(raw.identity.admin_emails);
        Ok(config)
    }

    /// Reads a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reads a TOML file if it exists, otherwise starts from defaults.
    pub fn load_optional(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies overrides from the historical environment variable names.
    ///
    /// `lookup` returns the value of a variable, if set; pass
    /// `|k| std::env::var(k).ok()` for the process environment.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SUPABASE_URL") {
            self.store.url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_KEY") {
            self.store.key = Some(SecretString::from(key));
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.credentials.secret = SecretString::from(secret);
        }
        if let Some(alg) = lookup("JWT_ALGORITHM") {
            self.credentials.algorithm = hmac_algorithm(&alg)?;
        }
        if let Some(minutes) = lookup("JWT_EXPIRES_MINUTES") {
            let parsed = minutes.trim().parse::<i64>().map_err(|_| ConfigError::Invalid {
                field: "JWT_EXPIRES_MINUTES",
                reason: format!("'{minutes}' is not an integer"),
            })?;
            self.credentials.expires_minutes = expiry(parsed)?;
        }
        if let Some(key_id) = lookup("RAZORPAY_KEY_ID") {
            self.payments.key_id = Some(key_id);
        }
        if let Some(secret) = lookup("RAZORPAY_KEY_SECRET") {
            self.payments.key_secret = Some(SecretString::from(secret));
        }
        if let Some(list) = lookup("ADMIN_EMAILS") {
            self.identity.admin_emails =
                normalize_emails(list.split(',').map(str::to_string).collect());
        }
        Ok(self)
    }
}

fn hmac_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    let invalid = || ConfigError::Invalid {
        field: "credentials.algorithm",
        reason: format!("'{name}' is not an HMAC algorithm"),
    };
    match Algorithm::from_str(name.trim()).map_err(|_| invalid())? {
        alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => Ok(alg),
        _ => Err(invalid()),
    }
}

fn expiry(minutes: i64) -> Result<i64, ConfigError> {
    if minutes <= 0 {
        return Err(ConfigError::Invalid {
            field: "credentials.expires_minutes",
            reason: "must be positive".to_string(),
        });
    }
    if minutes > MAX_EXPIRES_MINUTES {
        return Err(ConfigError::Invalid {
            field: "credentials.expires_minutes",
            reason: format!("must be at most {MAX_EXPIRES_MINUTES}"),
        });
    }
    Ok(minutes)
}

fn timeout(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn normalize_emails(emails: Vec<String>) -> Vec<String> {
    emails
        .into_iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
