//! # Auth State
//!
//! The authorization accessor screens read: `{role, user_id, is_ready}` plus
//! `refresh()` and `sign_out()`.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use rxdist_core::{RefreshReason, Role, RoleSnapshot, UserId};
use rxdist_sync::{IdentityProvider, RoleStore};

use crate::error::AppResult;

/// Authorization accessor over the shared [`RoleStore`].
#[derive(Clone)]
pub struct AuthState {
    store: RoleStore,
    identity: Arc<dyn IdentityProvider>,
}

impl AuthState {
    pub fn new(store: RoleStore, identity: Arc<dyn IdentityProvider>) -> Self {
        AuthState { store, identity }
    }

    pub fn role(&self) -> Role {
        self.store.snapshot().role
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.store.snapshot().user_id.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.store.snapshot().is_ready
    }

    pub fn snapshot(&self) -> Arc<RoleSnapshot> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RoleSnapshot>> {
        self.store.subscribe()
    }

    /// Whether the settled role passes `gate`. Always false while loading.
    pub fn can_access(&self, gate: &[Role]) -> bool {
        let snapshot = self.store.snapshot();
        snapshot.is_ready && snapshot.role.allows(gate)
    }

    pub async fn refresh(&self, reason: RefreshReason) -> Role {
        self.store.refresh(reason).await
    }

    /// Signs out with the provider and clears local authorization state.
    ///
    /// Local state is cleared even when the provider call fails; the error
    /// is still returned.
    pub async fn sign_out(&self) -> AppResult<()> {
        let result = self.identity.sign_out().await;
        if let Err(e) = &result {
            warn!(error = %e, "Provider sign-out failed, clearing local state anyway");
        }

        self.store.apply_sign_out().await;
        info!("Signed out");

        result.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxdist_db::{MemoryStorage, PersistentRoleCache};
    use rxdist_sync::testing::{FakeIdentity, ScriptedStrategy};
    use rxdist_sync::{RoleResolver, RoleStrategy, DEFAULT_REFRESH_THROTTLE};

    fn auth_state(
        identity: Arc<FakeIdentity>,
        raw_role: &str,
    ) -> (AuthState, PersistentRoleCache) {
        let strategy: Arc<dyn RoleStrategy> =
            Arc::new(ScriptedStrategy::answering("rpc", raw_role));
        let cache = PersistentRoleCache::new(Arc::new(MemoryStorage::new()));
        let store = RoleStore::new(
            identity.clone(),
            RoleResolver::new(vec![strategy]).unwrap(),
            cache.clone(),
            DEFAULT_REFRESH_THROTTLE,
        );
        (AuthState::new(store, identity), cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_accessors_follow_store() {
        let identity = Arc::new(FakeIdentity::signed_in("u1"));
        let (auth, _) = auth_state(identity, "BODEGA");
        assert!(!auth.is_ready());
        assert!(!auth.can_access(&[Role::Bodega]));

        assert_eq!(auth.refresh(RefreshReason::Boot).await, Role::Bodega);
        assert!(auth.is_ready());
        assert_eq!(auth.role(), Role::Bodega);
        assert_eq!(auth.user_id().map(|u| u.to_string()).as_deref(), Some("u1"));
        assert!(auth.can_access(&[Role::Bodega, Role::Compras]));
        assert!(!auth.can_access(&[Role::Ventas]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_clears_without_waiting_for_event() {
        let identity = Arc::new(FakeIdentity::signed_in("u1"));
        let (auth, cache) = auth_state(identity.clone(), "VENTAS");
        auth.refresh(RefreshReason::Boot).await;

        auth.sign_out().await.unwrap();

        assert_eq!(identity.sign_out_calls(), 1);
        let snapshot = auth.snapshot();
        assert!(snapshot.is_ready);
        assert!(snapshot.user_id.is_none());
        assert_eq!(snapshot.role, Role::Unassigned);
        assert_eq!(cache.get(&UserId::new("u1").unwrap()).await, None);
    }
}
