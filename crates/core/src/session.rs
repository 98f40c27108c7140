//! Session store
//!
//! Single source of truth for the four session fields. Every read goes to the
//! backing [`Storage`] so several handles over the same storage stay in sync.
//! The store never talks to the network and never navigates.

use crate::role::Role;
use crate::storage::{Storage, StorageError};
use crate::token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One of the persisted session fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    AccessToken,
    RefreshToken,
    UserId,
    Role,
}

impl SessionField {
    pub const ALL: [Self; 4] = [
        Self::AccessToken,
        Self::RefreshToken,
        Self::UserId,
        Self::Role,
    ];

    /// Storage key for this field
    pub const fn key(self) -> &'static str {
        match self {
            Self::AccessToken => "token",
            Self::RefreshToken => "refreshToken",
            Self::UserId => "userId",
            Self::Role => "userRole",
        }
    }
}

/// Point-in-time view of the session
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<Role>,
}

impl Session {
    /// A session without an access token is not authenticated, whatever else it holds
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .finish()
    }
}

/// Handle over the session fields held in a [`Storage`] backend
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Store backed by a fresh in-memory storage
    pub fn in_memory() -> Self {
        Self::new(Arc::new(crate::storage::MemoryStorage::new()))
    }

    /// Read a raw field value
    ///
    /// Backend failures are logged and reported as absent.
    pub fn get(&self, field: SessionField) -> Option<String> {
        match self.storage.get_item(field.key()) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = field.key(), error = %e, "Failed to read session field");
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.get(SessionField::AccessToken)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get(SessionField::RefreshToken)
    }

    pub fn user_id(&self) -> Option<String> {
        self.get(SessionField::UserId)
    }

    /// Stored role, if it is one of the known roles
    pub fn role(&self) -> Option<Role> {
        self.get(SessionField::Role)?.parse().ok()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn snapshot(&self) -> Session {
        Session {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
            user_id: self.user_id(),
            role: self.role(),
        }
    }

    /// Write a freshly confirmed session
    ///
    /// Optional fields that are not supplied are removed so a new login never
    /// inherits leftovers from a previous one. All or nothing: if any write
    /// fails the store is cleared, so it never mixes fields of two sessions.
    pub fn set(
        &self,
        access_token: &str,
        role: Role,
        refresh_token: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<(), StorageError> {
        let written = self
            .storage
            .set_item(SessionField::AccessToken.key(), access_token)
            .and_then(|()| self.storage.set_item(SessionField::Role.key(), role.as_str()))
            .and_then(|()| self.put_optional(SessionField::RefreshToken, refresh_token))
            .and_then(|()| self.put_optional(SessionField::UserId, user_id));

        if let Err(e) = written {
            tracing::warn!(error = %e, "Failed to write session, discarding partial state");
            if let Err(clear_error) = self.clear() {
                tracing::warn!(error = %clear_error, "Failed to discard partial session");
            }
            return Err(e);
        }

        tracing::debug!(role = %role, user_id = ?user_id, "Session established");
        Ok(())
    }

    /// Replace the tokens after a successful refresh; role and user id are untouched
    pub fn update_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StorageError> {
        self.storage
            .set_item(SessionField::AccessToken.key(), access_token)?;
        if let Some(refresh_token) = refresh_token {
            self.storage
                .set_item(SessionField::RefreshToken.key(), refresh_token)?;
        }
        Ok(())
    }

    /// Remove every session field
    ///
    /// Idempotent. Every key is attempted even if an earlier removal fails;
    /// the first failure is returned.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut first_error = None;
        for field in SessionField::ALL {
            if let Err(e) = self.storage.remove_item(field.key()) {
                tracing::warn!(key = field.key(), error = %e, "Failed to clear session field");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::debug!("Session cleared");
                Ok(())
            }
        }
    }

    /// Whether `token` is expired (fail-closed)
    pub fn is_expired(&self, token: &str) -> bool {
        token::is_expired(token)
    }

    pub fn is_expired_at(&self, token: &str, now: chrono::DateTime<chrono::Utc>) -> bool {
        token::is_expired_at(token, now)
    }

    fn put_optional(&self, field: SessionField, value: Option<&str>) -> Result<(), StorageError> {
        match value {
            Some(value) => self.storage.set_item(field.key(), value),
            None => self.storage.remove_item(field.key()),
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.snapshot())
            .finish()
    }
}
