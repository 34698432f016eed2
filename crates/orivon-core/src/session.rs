//! Request authorization glue: sign-in and credential-to-user resolution.

use crate::credential::CredentialValidator;
use crate::errors::CoreError;
use crate::identity::IdentityResolver;
use crate::records::User;
use orivon_canonical::Email;
use serde::Serialize;
use tracing::debug;

/// A freshly issued credential and the user it names.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Signed session credential.
    pub access_token: String,
    /// The signed-in user.
    pub user: User,
}

/// Combines credential verification with live identity lookups.
#[derive(Debug, Clone)]
pub struct SessionAuthority {
    identity: IdentityResolver,
    credentials: CredentialValidator,
}

impl SessionAuthority {
    /// Creates an authority over the given components.
    pub fn new(identity: IdentityResolver, credentials: CredentialValidator) -> Self {
        Self {
            identity,
            credentials,
        }
    }

    /// Signs in an externally verified email, creating or promoting the user.
    pub fn sign_in(&self, email: &str, display_name: Option<&str>) -> Result<Session, CoreError> {
        let email = Email::parse(email)?;
        let user = self.identity.resolve_or_create(&email, display_name)?;
        let user = self.identity.promote(&user)?;
        let access_token = self.credentials.issue(&user)?;
        Ok(Session { access_token, user })
    }

    /// Resolves a credential to the live user record.
    ///
    /// The id claim is tried first, then the email claim. A credential naming
    /// no existing user is invalid; a store outage is `Unavailable`.
    pub fn authenticate(&self, token: &str) -> Result<User, CoreError> {
        let claims = self.credentials.verify(token)?;
        if let Some(id) = claims.subject() {
            if let Some(user) = self.identity.lookup_by_id(&id)? {
                return Ok(user);
            }
            debug!(user_id = %id, "credential subject not found, trying email");
        }
        if let Some(email) = claims.email() {
            if let Some(user) = self.identity.lookup_by_email(&email)? {
                return Ok(user);
            }
        }
        Err(CoreError::InvalidCredential("user not found".into()))
    }

    /// Fails with `Forbidden` unless `user` is an admin.
    pub fn require_admin(&self, user: &User) -> Result<(), CoreError> {
        if user.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Forbidden("admin privileges required".into()))
        }
    }

    /// The identity component.
    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }
}
