//! # Cached Resource
//!
//! Binds a [`DashboardCacheLoader`] to the role store: the active role is
//! the cache key, so data loaded for one role is never shown under another.
//!
//! ```text
//!   user changed       ──► loader.clear() + loader.reset()
//!   snapshot not ready ──► loader.reset()          (screen shows loading)
//!   role fails gate    ──► loader.reset() + UNAUTHORIZED
//!   role passes gate   ──► loader.load(role, || fetch(role), options)
//! ```
//!
//! [`follow`](CachedResource::follow) races every reload against the next
//! snapshot change, so a switch of identity is applied while a fetch for
//! the previous one is still running.

use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use rxdist_core::{Role, UserId};
use rxdist_sync::{DashboardCacheLoader, LoadOptions, LoadOutcome, LoadView};

use crate::error::{AppError, AppResult};
use crate::state::AuthState;

/// Type-erased business fetcher, called with the role it loads for.
pub type ResourceFetch<T> =
    Arc<dyn Fn(Role) -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Cached-load accessor: `{data, is_loading, is_background_refreshing,
/// error}` through [`view`](Self::view), plus [`reload`](Self::reload).
pub struct CachedResource<T> {
    auth: AuthState,
    loader: DashboardCacheLoader<Role, T>,
    gate: Arc<[Role]>,
    fetch: ResourceFetch<T>,
}

impl<T> Clone for CachedResource<T> {
    fn clone(&self) -> Self {
        CachedResource {
            auth: self.auth.clone(),
            loader: self.loader.clone(),
            gate: self.gate.clone(),
            fetch: self.fetch.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> CachedResource<T> {
    /// `gate` lists the roles allowed to load this resource
    /// ([`Role::ASSIGNABLE`] for any signed-in role).
    pub fn new<F, Fut>(
        auth: AuthState,
        loader: DashboardCacheLoader<Role, T>,
        gate: &[Role],
        fetch: F,
    ) -> Self
    where
        F: Fn(Role) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, String>> + Send + 'static,
    {
        let fetch: ResourceFetch<T> = Arc::new(move |role| fetch(role).boxed());
        CachedResource {
            auth,
            loader,
            gate: gate.into(),
            fetch,
        }
    }

    pub fn view(&self) -> Arc<LoadView<Role, T>> {
        self.loader.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<LoadView<Role, T>>> {
        self.loader.subscribe()
    }

    pub fn loader(&self) -> &DashboardCacheLoader<Role, T> {
        &self.loader
    }

    /// Loads under the current role.
    pub async fn reload(&self, options: LoadOptions) -> AppResult<LoadOutcome<T>> {
        let snapshot = self.auth.snapshot();
        if !snapshot.is_ready {
            return Err(AppError::authorization_pending());
        }

        let role = snapshot.role;
        if !role.allows(&self.gate) {
            self.loader.reset();
            return Err(if role.is_assigned() {
                AppError::unauthorized(format!("Role {} cannot open this screen", role))
            } else {
                AppError::unauthorized("No role assigned")
            });
        }

        let fetch = self.fetch.clone();
        let outcome = self.loader.load(role, move || fetch(role), options).await?;
        Ok(outcome)
    }

    /// Reloads whenever the role snapshot changes. Abort the returned task
    /// to stop following.
    pub fn follow(&self) -> JoinHandle<()> {
        let resource = self.clone();
        let mut snapshots = self.auth.subscribe();

        tokio::spawn(async move {
            let mut user: Option<UserId> = None;
            loop {
                let snapshot = snapshots.borrow_and_update().clone();

                if snapshot.user_id != user {
                    debug!("Identity changed, dropping cached data");
                    resource.loader.clear();
                    resource.loader.reset();
                    user = snapshot.user_id.clone();
                }

                if !snapshot.is_ready {
                    resource.loader.reset();
                } else {
                    tokio::select! {
                        result = resource.reload(LoadOptions::default()) => {
                            if let Err(e) = result {
                                debug!(role = %snapshot.role, error = %e, "Follow reload did not load data");
                            }
                        }
                        changed = snapshots.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            debug!(role = %snapshot.role, "Snapshot changed during reload");
                            continue;
                        }
                    }
                }

                if snapshots.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use rxdist_core::{AuthEvent, RefreshReason};
    use rxdist_db::{MemoryStorage, PersistentRoleCache};
    use rxdist_sync::testing::{FakeIdentity, ScriptedStrategy};
    use rxdist_sync::{RoleResolver, RoleStore, RoleStrategy, DEFAULT_CACHE_TTL, DEFAULT_REFRESH_THROTTLE};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    struct Fixture {
        identity: Arc<FakeIdentity>,
        store: RoleStore,
        resource: CachedResource<String>,
        fetched: Arc<Mutex<Vec<Role>>>,
    }

    fn fixture(strategy: ScriptedStrategy, gate: &[Role], fetch_delay: Duration) -> Fixture {
        let identity = Arc::new(FakeIdentity::signed_in("u1"));
        let strategy: Arc<dyn RoleStrategy> = Arc::new(strategy);
        let store = RoleStore::new(
            identity.clone(),
            RoleResolver::new(vec![strategy]).unwrap(),
            PersistentRoleCache::new(Arc::new(MemoryStorage::new())),
            DEFAULT_REFRESH_THROTTLE,
        );
        let auth = AuthState::new(store.clone(), identity.clone());

        let fetched = Arc::new(Mutex::new(Vec::new()));
        let log = fetched.clone();
        let resource = CachedResource::new(
            auth,
            DashboardCacheLoader::new(DEFAULT_CACHE_TTL),
            gate,
            move |role| {
                log.lock().unwrap().push(role);
                async move {
                    if !fetch_delay.is_zero() {
                        sleep(fetch_delay).await;
                    }
                    Ok(format!("{} dashboard", role))
                }
            },
        );

        Fixture {
            identity,
            store,
            resource,
            fetched,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_waits_for_authorization() {
        let f = fixture(
            ScriptedStrategy::answering("rpc", "ADMIN"),
            &Role::ASSIGNABLE,
            Duration::ZERO,
        );

        let err = f.resource.reload(LoadOptions::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthorizationPending);
        assert!(f.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_keys_by_role() {
        let f = fixture(
            ScriptedStrategy::answering("rpc", "ADMIN"),
            &Role::ASSIGNABLE,
            Duration::ZERO,
        );
        f.store.refresh(RefreshReason::Boot).await;

        let outcome = f.resource.reload(LoadOptions::default()).await.unwrap();
        assert_eq!(outcome.payload().map(|p| p.as_str()), Some("ADMIN dashboard"));

        f.resource.reload(LoadOptions::default()).await.unwrap();
        assert_eq!(*f.fetched.lock().unwrap(), vec![Role::Admin]);

        let view = f.resource.view();
        assert_eq!(view.key, Some(Role::Admin));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_rejects_other_roles() {
        let f = fixture(
            ScriptedStrategy::answering("rpc", "VENTAS"),
            &[Role::Bodega],
            Duration::ZERO,
        );
        f.store.refresh(RefreshReason::Boot).await;

        let err = f.resource.reload(LoadOptions::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(f.resource.view().key.is_none());
        assert!(f.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_reloads_on_role_change() {
        let f = fixture(
            ScriptedStrategy::answering("rpc", "VENTAS").then_answer(Duration::ZERO, "ADMIN"),
            &Role::ASSIGNABLE,
            Duration::ZERO,
        );
        let task = f.resource.follow();

        f.store.refresh(RefreshReason::Boot).await;
        sleep(Duration::from_millis(10)).await;
        assert_eq!(f.resource.view().key, Some(Role::Admin));

        f.identity.set_user(Some("u2"));
        f.store.handle_auth_event(AuthEvent::SignedIn).await;
        sleep(Duration::from_millis(10)).await;

        let view = f.resource.view();
        assert_eq!(view.key, Some(Role::Ventas));
        assert_eq!(view.data.as_deref().map(|s| s.as_str()), Some("VENTAS dashboard"));
        assert_eq!(*f.fetched.lock().unwrap(), vec![Role::Admin, Role::Ventas]);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_switch_during_reload_hides_previous_data() {
        let f = fixture(
            ScriptedStrategy::answering("rpc", "ADMIN").with_delay(Duration::from_millis(20)),
            &Role::ASSIGNABLE,
            Duration::from_millis(200),
        );
        let task = f.resource.follow();

        f.store.refresh(RefreshReason::Boot).await;
        sleep(Duration::from_millis(300)).await;
        assert_eq!(
            f.resource.view().data.as_deref().map(|s| s.as_str()),
            Some("ADMIN dashboard")
        );

        // Once the entry expires, the next reload fetches behind visible data.
        sleep(DEFAULT_CACHE_TTL + Duration::from_secs(1)).await;
        f.store.refresh(RefreshReason::Manual).await;
        sleep(Duration::from_millis(50)).await;
        assert!(f.resource.view().is_background_refreshing);

        f.identity.set_user(Some("u2"));
        f.store.handle_auth_event(AuthEvent::SignedIn).await;
        sleep(Duration::from_millis(5)).await;

        assert!(!f.store.snapshot().is_ready);
        let view = f.resource.view();
        assert!(view.key.is_none());
        assert!(view.data.is_none());

        sleep(Duration::from_millis(300)).await;
        let view = f.resource.view();
        assert_eq!(view.key, Some(Role::Admin));
        assert_eq!(view.data.as_deref().map(|s| s.as_str()), Some("ADMIN dashboard"));
        assert_eq!(f.fetched.lock().unwrap().len(), 3);

        task.abort();
    }
}
