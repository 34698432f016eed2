//! Credential Validator.
//!
//! Session credentials are HMAC-signed JWTs carrying `user_id` (or `sub`),
//! `email` and the role at issuance. Verification checks signature and
//! expiry only; role freshness is the caller's concern.

use crate::config::CoreConfig;
use crate::errors::CoreError;
use crate::records::User;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use orivon_canonical::{Email, UserId};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Identity claims embedded in a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Subject, accepted as an alias of `user_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Email at issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Role at issuance; may be stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Issued at, seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    /// Identity key from `user_id`, else `sub`.
    pub fn subject(&self) -> Option<UserId> {
        self.user_id
            .as_deref()
            .or(self.sub.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| UserId::new(s.to_string()))
    }

    /// Normalized email, if present and well-formed.
    pub fn email(&self) -> Option<Email> {
        self.email.as_deref().and_then(|e| Email::parse(e).ok())
    }
}

/// Issues and verifies session credentials.
#[derive(Clone)]
pub struct CredentialValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    expires_minutes: i64,
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("algorithm", &self.algorithm)
            .field("expires_minutes", &self.expires_minutes)
            .finish_non_exhaustive()
    }
}

impl CredentialValidator {
    /// Creates a validator from the credential settings.
    pub fn new(config: &CoreConfig) -> Self {
        let secret = config.credentials.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm: config.credentials.algorithm,
            expires_minutes: config.credentials.expires_minutes,
        }
    }

    /// Signs a credential for `user`, valid from now.
    pub fn issue(&self, user: &User) -> Result<String, CoreError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Signs a credential for `user` as if issued at `issued_at` (seconds).
    pub fn issue_at(&self, user: &User, issued_at: i64) -> Result<String, CoreError> {
        let exp = self
            .expires_minutes
            .checked_mul(60)
            .and_then(|lifetime| issued_at.checked_add(lifetime))
            .ok_or_else(|| CoreError::InvalidCredential("credential expiry out of range".into()))?;
        let claims = Claims {
            user_id: Some(user.id.to_string()),
            sub: None,
            email: Some(user.email.to_string()),
            role: Some(user.role.as_str().to_string()),
            iat: Some(issued_at),
            exp,
        };
        self.sign(&claims)
    }

    /// Signs arbitrary claims with the configured key.
    pub fn sign(&self, claims: &Claims) -> Result<String, CoreError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding)
            .map_err(|e| CoreError::InvalidCredential(format!("cannot sign credential: {e}")))
    }

    /// Checks signature and expiry and returns the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, CoreError> {
        let validation = Validation::new(self.algorithm);
        let data = decode::<Claims>(token.trim(), &self.decoding, &validation)
            .map_err(|e| CoreError::InvalidCredential(e.to_string()))?;
        let claims = data.claims;
        if claims.subject().is_none() && claims.email().is_none() {
            return Err(CoreError::InvalidCredential(
                "credential carries no identity".into(),
            ));
        }
        Ok(claims)
    }
}
