//! # Identity Types
//!
//! Values owned by the external identity provider, plus the reasons a
//! role refresh can be requested for.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// User Id
// =============================================================================

/// Opaque user identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a provider id, rejecting empty values.
    pub fn new(id: impl Into<String>) -> CoreResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::EmptyUserId);
        }
        Ok(UserId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Session
// =============================================================================

/// The provider's view of who is signed in. This core only observes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Option<UserId>,
}

impl Session {
    /// No authenticated identity.
    pub fn anonymous() -> Self {
        Session { user_id: None }
    }

    pub fn signed_in(user_id: UserId) -> Self {
        Session {
            user_id: Some(user_id),
        }
    }
}

// =============================================================================
// Auth Events
// =============================================================================

/// Session lifecycle events raised by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl std::fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEvent::SignedIn => write!(f, "SIGNED_IN"),
            AuthEvent::SignedOut => write!(f, "SIGNED_OUT"),
            AuthEvent::TokenRefreshed => write!(f, "TOKEN_REFRESHED"),
            AuthEvent::UserUpdated => write!(f, "USER_UPDATED"),
        }
    }
}

impl FromStr for AuthEvent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIGNED_IN" => Ok(AuthEvent::SignedIn),
            "SIGNED_OUT" => Ok(AuthEvent::SignedOut),
            "TOKEN_REFRESHED" => Ok(AuthEvent::TokenRefreshed),
            "USER_UPDATED" => Ok(AuthEvent::UserUpdated),
            other => Err(CoreError::UnknownAuthEvent(other.to_string())),
        }
    }
}

// =============================================================================
// Refresh Reason
// =============================================================================

/// Why a role refresh was requested.
///
/// ```text
/// ┌──────────────────┬───────────────────┬──────────────────────────────┐
/// │ Reason           │ Throttled         │ In-flight resolution         │
/// ├──────────────────┼───────────────────┼──────────────────────────────┤
/// │ Boot             │ no                │ joined                       │
/// │ Foreground       │ yes               │ joined                       │
/// │ Manual           │ no                │ joined                       │
/// │ Resync           │ no                │ superseded                   │
/// │ Auth(event)      │ no                │ superseded                   │
/// └──────────────────┴───────────────────┴──────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// Process start.
    Boot,
    /// App returned to the foreground or a screen gained focus.
    Foreground,
    /// Explicit user action (pull to refresh, retry button).
    Manual,
    /// The auth event stream lagged; state must be re-derived.
    Resync,
    /// The identity provider reported a lifecycle event.
    Auth(AuthEvent),
}

impl RefreshReason {
    /// Reasons that invalidate an in-flight resolution instead of joining it.
    pub fn supersedes_in_flight(&self) -> bool {
        matches!(self, RefreshReason::Resync | RefreshReason::Auth(_))
    }

    /// Reasons subject to the refresh throttle window.
    pub fn is_throttled(&self) -> bool {
        matches!(self, RefreshReason::Foreground)
    }
}

impl std::fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshReason::Boot => write!(f, "boot"),
            RefreshReason::Foreground => write!(f, "foreground"),
            RefreshReason::Manual => write!(f, "manual"),
            RefreshReason::Resync => write!(f, "resync"),
            RefreshReason::Auth(event) => write!(f, "auth:{}", event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_rejects_blank() {
        assert_eq!(UserId::new("  "), Err(CoreError::EmptyUserId));
        assert_eq!(UserId::new("u1").unwrap().as_str(), "u1");
    }

    #[test]
    fn test_auth_event_round_trips_provider_names() {
        for name in ["SIGNED_IN", "SIGNED_OUT", "TOKEN_REFRESHED", "USER_UPDATED"] {
            let event: AuthEvent = name.parse().unwrap();
            assert_eq!(event.to_string(), name);
        }
        assert!("PASSWORD_RECOVERY".parse::<AuthEvent>().is_err());
    }

    #[test]
    fn test_refresh_reason_policies() {
        assert!(RefreshReason::Auth(AuthEvent::SignedIn).supersedes_in_flight());
        assert!(RefreshReason::Resync.supersedes_in_flight());
        assert!(!RefreshReason::Manual.supersedes_in_flight());
        assert!(RefreshReason::Foreground.is_throttled());
        assert!(!RefreshReason::Boot.is_throttled());
        assert_eq!(
            RefreshReason::Auth(AuthEvent::TokenRefreshed).to_string(),
            "auth:TOKEN_REFRESHED"
        );
    }
}
