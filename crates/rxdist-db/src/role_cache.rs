//! # Persistent Role Cache
//!
//! Last known resolved role per user, kept so the UI can render the right
//! navigation before the network answers. It is a bootstrap hint and never
//! authoritative: a completed live resolution always supersedes it.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  key:   "user_role_<userId>"                                           │
//! │  value: {"role":"VENTAS","savedAt":"2026-03-01T12:00:00Z"}             │
//! │                                                                         │
//! │  get()   absent / unreadable / corrupt ──► None (corrupt rows removed) │
//! │  set()   Role::Unassigned ──► clear()                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of the operations return errors. Storage failures are logged and
//! behave like a cache miss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use rxdist_core::{Role, UserId};

use crate::storage::SecureStorage;

/// Default key prefix for cached roles.
pub const DEFAULT_KEY_PREFIX: &str = "user_role_";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedRole {
    role: Role,
    saved_at: DateTime<Utc>,
}

/// Per-user role hint on top of a [`SecureStorage`] backend.
#[derive(Clone)]
pub struct PersistentRoleCache {
    storage: Arc<dyn SecureStorage>,
    prefix: String,
}

impl PersistentRoleCache {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self::with_prefix(storage, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(storage: Arc<dyn SecureStorage>, prefix: impl Into<String>) -> Self {
        PersistentRoleCache {
            storage,
            prefix: prefix.into(),
        }
    }

    fn key(&self, user_id: &UserId) -> String {
        format!("{}{}", self.prefix, user_id)
    }

    /// Reads the cached role. Empty on absence, failure or corruption.
    pub async fn get(&self, user_id: &UserId) -> Option<Role> {
        let key = self.key(user_id);

        let raw = match self.storage.get_item(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Role cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<CachedRole>(&raw) {
            Ok(cached) if cached.role.is_assigned() => {
                debug!(user_id = %user_id, role = %cached.role, "Role cache hit");
                Some(cached.role)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Discarding corrupt role cache entry");
                if let Err(e) = self.storage.delete_item(&key).await {
                    warn!(user_id = %user_id, error = %e, "Failed to remove corrupt entry");
                }
                None
            }
        }
    }

    /// Stores the role. An unassigned role clears the entry instead.
    pub async fn set(&self, user_id: &UserId, role: Role) {
        if !role.is_assigned() {
            self.clear(user_id).await;
            return;
        }

        let record = CachedRole {
            role,
            saved_at: Utc::now(),
        };
        let value = match serde_json::to_string(&record) {
            Ok(value) => value,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to encode role cache entry");
                return;
            }
        };

        if let Err(e) = self.storage.set_item(&self.key(user_id), &value).await {
            warn!(user_id = %user_id, error = %e, "Role cache write failed");
        }
    }

    pub async fn clear(&self, user_id: &UserId) {
        if let Err(e) = self.storage.delete_item(&self.key(user_id)).await {
            warn!(user_id = %user_id, error = %e, "Role cache clear failed");
        }
    }
}

impl std::fmt::Debug for PersistentRoleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentRoleCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
