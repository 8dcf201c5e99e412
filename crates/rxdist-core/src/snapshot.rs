//! # Role Snapshot
//!
//! The single source of truth for authorization. A snapshot is never
//! mutated after construction: the store replaces it wholesale on every
//! commit, so subscribers detect change by comparing `Arc` identity.
//!
//! ## Snapshot States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Snapshot Lifecycle                               │
//! │                                                                         │
//! │   initial()  {role:"", user:none, ready:false}   process boot           │
//! │       │                                                                 │
//! │       ├── no session ──────► signed_out() {role:"", user:none, ready}   │
//! │       │                                                                 │
//! │       └── session u1 ──────► pending(u1)  {role:"", user:u1, !ready}    │
//! │                                  │                                      │
//! │                                  ├─ cache hit ─► hydrated(u1, r)        │
//! │                                  │                                      │
//! │                                  └─ resolved ──► resolved(u1, r)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::Role;
use crate::types::UserId;

/// Where the snapshot's role came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    /// No role is known.
    None,
    /// Bootstrap hint read from the persistent role cache.
    Cache,
    /// Completed live resolution.
    Resolved,
}

/// Point-in-time authorization state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSnapshot {
    pub role: Role,
    pub user_id: Option<UserId>,
    pub is_ready: bool,
    pub source: RoleSource,
    pub updated_at: DateTime<Utc>,
}

impl RoleSnapshot {
    /// Boot state: nothing known, nothing ready.
    pub fn initial() -> Self {
        RoleSnapshot {
            role: Role::Unassigned,
            user_id: None,
            is_ready: false,
            source: RoleSource::None,
            updated_at: Utc::now(),
        }
    }

    /// No authenticated identity. Ready, so screens render "signed out".
    pub fn signed_out() -> Self {
        RoleSnapshot {
            is_ready: true,
            ..Self::initial()
        }
    }

    /// A new identity whose role is not known yet.
    pub fn pending(user_id: UserId) -> Self {
        RoleSnapshot {
            user_id: Some(user_id),
            ..Self::initial()
        }
    }

    /// Bootstrap from the persistent cache, superseded by the next live
    /// resolution.
    pub fn hydrated(user_id: UserId, role: Role) -> Self {
        RoleSnapshot {
            role,
            user_id: Some(user_id),
            is_ready: true,
            source: RoleSource::Cache,
            updated_at: Utc::now(),
        }
    }

    /// Result of a completed live resolution.
    pub fn resolved(user_id: UserId, role: Role) -> Self {
        RoleSnapshot {
            role,
            user_id: Some(user_id),
            is_ready: true,
            source: RoleSource::Resolved,
            updated_at: Utc::now(),
        }
    }

    /// Returns true if this snapshot tracks the given user.
    pub fn is_for(&self, user_id: &UserId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }

    /// The role to hand back to a caller whose own result was discarded:
    /// ours if we track the latest session's user, otherwise empty.
    pub fn role_for(&self, latest: Option<&UserId>) -> Role {
        match latest {
            Some(user_id) if self.is_for(user_id) => self.role,
            _ => Role::Unassigned,
        }
    }
}

impl Default for RoleSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
