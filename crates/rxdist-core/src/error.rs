//! # Domain Errors
//!
//! Errors raised while building domain values from untrusted input
//! (backend role strings, provider event names, user ids).

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// Only strict parsing produces these. The lenient paths used at the
/// resolver boundary (`Role::normalize`) never fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A role string did not match any known role or alias.
    #[error("Unknown role: '{0}'")]
    UnknownRole(String),

    /// The identity provider reported an event name we do not handle.
    ///
    /// ## When This Occurs
    /// - Provider SDK upgrades that add events (e.g. `PASSWORD_RECOVERY`)
    /// - Misconfigured bridge code forwarding arbitrary strings
    #[error("Unknown auth event: '{0}'")]
    UnknownAuthEvent(String),

    /// A user id was empty or whitespace only.
    #[error("User id must not be empty")]
    EmptyUserId,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::UnknownRole("root".into()).to_string(),
            "Unknown role: 'root'"
        );
        assert_eq!(
            CoreError::EmptyUserId.to_string(),
            "User id must not be empty"
        );
    }
}
