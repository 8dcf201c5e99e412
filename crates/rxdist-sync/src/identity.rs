//! # Identity Provider Seam
//!
//! The external identity provider owns the session. This engine only reads
//! it, listens to its auth-state stream and asks it to sign out.

use async_trait::async_trait;
use tokio::sync::broadcast;

use rxdist_core::{AuthEvent, Session};

use crate::error::SyncResult;

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Reads the provider's current session.
    async fn current_session(&self) -> SyncResult<Session>;

    /// Subscribes to auth-state events. The session itself is always read
    /// through [`current_session`](Self::current_session).
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Ends the current session on the provider side.
    async fn sign_out(&self) -> SyncResult<()>;
}
