//! Identity Resolver.
//!
//! Turns a verified email claim into the canonical user record, creating it
//! on first sight. Uniqueness per email is enforced by the store, not here.

use crate::config::CoreConfig;
use crate::errors::CoreError;
use crate::records::{Role, User};
use orivon_canonical::{Email, Timestamp, UserId};
use orivon_store::{EntityKind, Filter, RecordAdapter, Row, StoreError};
use serde_json::Value;
use tracing::{debug, info};

/// Resolves identity claims to user records.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    store: RecordAdapter,
    admin_emails: Vec<String>,
}

impl IdentityResolver {
    /// Creates a resolver using the configured admin allow-list.
    pub fn new(store: RecordAdapter, config: &CoreConfig) -> Self {
        Self {
            store,
            admin_emails: config.identity.admin_emails.clone(),
        }
    }

    /// Role an email receives on creation.
    pub fn role_for(&self, email: &Email) -> Role {
        if self.admin_emails.iter().any(|e| e == email.as_str()) {
            Role::Admin
        } else {
            Role::Student
        }
    }

    /// Returns the user for `email`, creating one on first sight.
    ///
    /// An existing record is returned as stored, except that a supplied
    /// display name is passed through without being written.
    pub fn resolve_or_create(
        &self,
        email: &Email,
        display_name: Option<&str>,
    ) -> Result<User, CoreError> {
        let supplied = display_name.map(str::trim).filter(|n| !n.is_empty());

        if let Some(mut user) = self.lookup_by_email(email)? {
            if let Some(name) = supplied {
                user.display_name = name.to_string();
            }
            return Ok(user);
        }

        let role = self.role_for(email);
        let mut payload = Row::new();
        payload.insert("email".into(), Value::from(email.as_str()));
        payload.insert(
            "display_name".into(),
            Value::from(supplied.unwrap_or(email.local_part())),
        );
        payload.insert("role".into(), Value::from(role.as_str()));
        payload.insert("created_at".into(), Value::from(Timestamp::now().as_str()));

        match self.store.upsert(EntityKind::User, payload, "email") {
            Ok(row) => {
                let user = self.parse(&row)?;
                info!(user_id = %user.id, role = role.as_str(), "created user");
                Ok(user)
            }
            Err(StoreError::UniqueViolation { .. }) => {
                debug!(email = %email, "concurrent first sign-in, re-fetching");
                self.lookup_by_email(email)?
                    .ok_or_else(|| CoreError::not_found("user", email))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Finds a user by identity key across every historical id column.
    pub fn lookup_by_id(&self, id: &UserId) -> Result<Option<User>, CoreError> {
        self.lookup(Filter::new().eq("id", id.as_str()))
    }

    /// Finds a user by normalized email.
    pub fn lookup_by_email(&self, email: &Email) -> Result<Option<User>, CoreError> {
        self.lookup(Filter::new().eq("email", email.as_str()))
    }

    /// Grants the admin role to an allow-listed user who does not have it yet.
    pub fn promote(&self, user: &User) -> Result<User, CoreError> {
        if user.is_admin() || self.role_for(&user.email) != Role::Admin {
            return Ok(user.clone());
        }
        let mut changes = Row::new();
        changes.insert("role".into(), Value::from(Role::Admin.as_str()));
        let updated = self.update(user, changes)?;
        info!(user_id = %updated.id, "promoted user to admin");
        Ok(updated)
    }

    /// Stores a new display name.
    pub fn rename(&self, user: &User, display_name: &str) -> Result<User, CoreError> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(CoreError::BadRequest("display name is empty".into()));
        }
        let mut changes = Row::new();
        changes.insert("display_name".into(), Value::from(name));
        self.update(user, changes)
    }

    fn update(&self, user: &User, changes: Row) -> Result<User, CoreError> {
        let row = self
            .store
            .update(
                EntityKind::User,
                &Filter::new().eq("email", user.email.as_str()),
                changes,
            )?
            .ok_or_else(|| CoreError::not_found("user", &user.id))?;
        self.parse(&row)
    }

    fn lookup(&self, filter: Filter) -> Result<Option<User>, CoreError> {
        match self.store.find(EntityKind::User, &filter)? {
            Some(row) => Ok(Some(self.parse(&row)?)),
            None => Ok(None),
        }
    }

    fn parse(&self, row: &Row) -> Result<User, CoreError> {
        use orivon_store::FromRow;
        User::from_row(row).map_err(|e| CoreError::Store(e.into()))
    }
}
