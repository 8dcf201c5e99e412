//! # Role Store
//!
//! The process-wide authorization state. Every write to the role snapshot
//! goes through one commit procedure that is ordered by refresh tickets.
//!
//! ## Refresh State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        One Logical Refresh                              │
//! │                                                                         │
//! │  refresh(reason)                                                       │
//! │     │                                                                   │
//! │     ├── in flight & !supersedes ───► join ─────────► shared result     │
//! │     ▼                                                                   │
//! │  DISPATCHED (ticket n)                                                  │
//! │     │  read session                                                     │
//! │     │    ├── none ─────────────────────────────────► COMMITTED (empty)  │
//! │     │    ├── same user, throttled & fresh ─────────► current role      │
//! │     │    └── new user ──► commit pending(user)                          │
//! │     ▼                                                                   │
//! │  RESOLVING                                                              │
//! │     │  RoleResolver::resolve(user)                                      │
//! │     │    alongside: hydrate from PersistentRoleCache (if no role yet)   │
//! │     │  re-read session                                                  │
//! │     ├── ok, same user, ticket n latest ────────────► COMMITTED          │
//! │     ├── ok, user changed or ticket n superseded ───► DISCARDED_STALE    │
//! │     ├── err, session gone ─────────────────────────► COMMITTED (empty)  │
//! │     └── err, session present ──────────────────────► DEFERRED_ON_ERROR  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! The resolution runs on its own task, wrapped in a shared future, so
//! callers that join it all observe the same role and a dropped caller
//! never cancels it. Commits take a short `parking_lot` lock, compare the
//! ticket against [`TicketCounter::latest`], and publish with
//! `watch::Sender::send_replace`. The lock is never held across an await.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use rxdist_core::{
    AuthEvent, RefreshReason, RefreshTicket, Role, RoleSnapshot, RoleSource, TicketCounter,
    UserId,
};
use rxdist_db::PersistentRoleCache;

use crate::identity::IdentityProvider;
use crate::resolver::RoleResolver;

/// Default minimum spacing between throttled refreshes.
pub const DEFAULT_REFRESH_THROTTLE: Duration = Duration::from_secs(5);

/// How the most recently finished refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A resolved role was committed.
    Committed,
    /// No session: the empty snapshot was committed.
    NoSession,
    /// The result arrived for a superseded ticket or a departed user.
    DiscardedStale,
    /// Resolution or session read failed; state was left untouched.
    DeferredOnError,
}

type SharedRole = Shared<BoxFuture<'static, Role>>;

struct InFlight {
    ticket: RefreshTicket,
    result: SharedRole,
}

#[derive(Default)]
struct State {
    flight: Option<InFlight>,
    last_resolved: Option<Instant>,
    last_outcome: Option<RefreshOutcome>,
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    resolver: RoleResolver,
    cache: PersistentRoleCache,
    throttle: Duration,
    tickets: TicketCounter,
    snapshot_tx: watch::Sender<Arc<RoleSnapshot>>,
    state: Mutex<State>,
}

/// Shared handle to the authorization state. Cheap to clone.
#[derive(Clone)]
pub struct RoleStore {
    inner: Arc<Inner>,
}

impl RoleStore {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        resolver: RoleResolver,
        cache: PersistentRoleCache,
        throttle: Duration,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(RoleSnapshot::initial()));
        RoleStore {
            inner: Arc::new(Inner {
                identity,
                resolver,
                cache,
                throttle,
                tickets: TicketCounter::new(),
                snapshot_tx,
                state: Mutex::new(State::default()),
            }),
        }
    }

    // =========================================================================
    // Read Side
    // =========================================================================

    /// Current snapshot. Compare with `Arc::ptr_eq` to detect change.
    pub fn snapshot(&self) -> Arc<RoleSnapshot> {
        self.inner.snapshot()
    }

    /// Subscribes to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RoleSnapshot>> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn last_outcome(&self) -> Option<RefreshOutcome> {
        self.inner.state.lock().last_outcome
    }

    pub fn is_resolving(&self) -> bool {
        self.inner.state.lock().flight.is_some()
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Refreshes the role and returns the role that applies afterwards.
    ///
    /// Joins an in-flight resolution unless `reason` supersedes it.
    pub async fn refresh(&self, reason: RefreshReason) -> Role {
        self.start(reason).await
    }

    /// Starts or joins a refresh without waiting for it.
    pub fn trigger(&self, reason: RefreshReason) {
        let _ = self.start(reason);
    }

    fn start(&self, reason: RefreshReason) -> SharedRole {
        let mut state = self.inner.state.lock();

        if let Some(flight) = &state.flight {
            if !reason.supersedes_in_flight() {
                debug!(ticket = %flight.ticket, reason = %reason, "Joining in-flight refresh");
                return flight.result.clone();
            }
        }

        self.dispatch(&mut state, reason)
    }

    fn dispatch(&self, state: &mut State, reason: RefreshReason) -> SharedRole {
        let ticket = self.inner.tickets.next();
        debug!(ticket = %ticket, reason = %reason, "Refresh dispatched");

        let task = tokio::spawn(self.inner.clone().run(ticket, reason));
        let inner = self.inner.clone();
        let result = async move {
            match task.await {
                Ok(role) => role,
                Err(e) => {
                    warn!(ticket = %ticket, error = %e, "Refresh task aborted");
                    inner.snapshot().role
                }
            }
        }
        .boxed()
        .shared();

        state.flight = Some(InFlight {
            ticket,
            result: result.clone(),
        });
        result
    }

    // =========================================================================
    // Auth Events
    // =========================================================================

    /// Applies one auth-state event.
    pub async fn handle_auth_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedOut => self.apply_sign_out().await,
            other => {
                info!(event = %other, "Auth event, refreshing role");
                self.trigger(RefreshReason::Auth(other));
            }
        }
    }

    /// Commits the empty snapshot, supersedes any in-flight resolution and
    /// forgets the departing user's cached role.
    pub async fn apply_sign_out(&self) {
        let departing = {
            let mut state = self.inner.state.lock();
            let ticket = self.inner.tickets.next();
            state.flight = None;
            state.last_resolved = None;
            state.last_outcome = Some(RefreshOutcome::NoSession);

            let departing = self.inner.snapshot().user_id.clone();
            self.inner
                .snapshot_tx
                .send_replace(Arc::new(RoleSnapshot::signed_out()));
            debug!(ticket = %ticket, "Signed out, snapshot cleared");
            departing
        };

        if let Some(user_id) = departing {
            info!(user_id = %user_id, "Clearing cached role for departing user");
            self.inner.cache.clear(&user_id).await;
        }
    }
}

impl std::fmt::Debug for RoleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleStore")
            .field("snapshot", &self.snapshot())
            .field("latest_ticket", &self.inner.tickets.latest())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Refresh Procedure
// =============================================================================

impl Inner {
    fn snapshot(&self) -> Arc<RoleSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    async fn run(self: Arc<Self>, ticket: RefreshTicket, reason: RefreshReason) -> Role {
        let role = self.resolve_for(ticket, reason).await;

        let mut state = self.state.lock();
        if state.flight.as_ref().map(|f| f.ticket) == Some(ticket) {
            state.flight = None;
        }
        role
    }

    async fn resolve_for(&self, ticket: RefreshTicket, reason: RefreshReason) -> Role {
        let session = match self.identity.current_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(ticket = %ticket, error = %e, "Session read failed, keeping current role");
                self.record(RefreshOutcome::DeferredOnError);
                return self.snapshot().role;
            }
        };

        let Some(user_id) = session.user_id else {
            self.commit(ticket, RoleSnapshot::signed_out(), RefreshOutcome::NoSession);
            return Role::Unassigned;
        };

        if reason.is_throttled() && self.recently_resolved(&user_id) {
            debug!(ticket = %ticket, reason = %reason, user_id = %user_id, "Refresh throttled");
            return self.snapshot().role;
        }

        if !self.snapshot().is_for(&user_id) {
            debug!(ticket = %ticket, user_id = %user_id, "Identity changed, clearing role");
            if !self.commit_pending(ticket, &user_id) {
                return self.snapshot().role_for(Some(&user_id));
            }
        }

        let resolving = self.resolver.resolve(&user_id);
        let resolved = if self.snapshot().role.is_assigned() {
            resolving.await
        } else {
            let ((), resolved) = futures_util::join!(self.hydrate(ticket, &user_id), resolving);
            resolved
        };
        let latest_user = self
            .identity
            .current_session()
            .await
            .map(|session| session.user_id);

        match (resolved, latest_user) {
            (Ok(role), Ok(Some(latest))) if latest == user_id => {
                let committed = self.commit(
                    ticket,
                    RoleSnapshot::resolved(user_id.clone(), role),
                    RefreshOutcome::Committed,
                );
                if !committed {
                    return self.snapshot().role_for(Some(&user_id));
                }
                self.persist(&user_id, role).await;
                role
            }
            (Ok(role), Ok(latest)) => {
                debug!(
                    ticket = %ticket,
                    user_id = %user_id,
                    role = %role,
                    "Discarded stale: user changed during resolution"
                );
                self.record(RefreshOutcome::DiscardedStale);
                self.snapshot().role_for(latest.as_ref())
            }
            (Err(e), Ok(None)) => {
                debug!(ticket = %ticket, error = %e, "Resolution failed after sign-out");
                self.commit(ticket, RoleSnapshot::signed_out(), RefreshOutcome::NoSession);
                Role::Unassigned
            }
            (Err(e), Ok(Some(latest))) => {
                warn!(
                    ticket = %ticket,
                    user_id = %user_id,
                    error = %e,
                    "Deferred on error, keeping last known role"
                );
                self.record(RefreshOutcome::DeferredOnError);
                self.snapshot().role_for(Some(&latest))
            }
            (_, Err(e)) => {
                warn!(ticket = %ticket, error = %e, "Session re-read failed, keeping current role");
                self.record(RefreshOutcome::DeferredOnError);
                self.snapshot().role_for(Some(&user_id))
            }
        }
    }

    fn commit_pending(&self, ticket: RefreshTicket, user_id: &UserId) -> bool {
        let mut state = self.state.lock();
        if !self.tickets.is_latest(ticket) {
            return false;
        }
        state.last_resolved = None;
        self.snapshot_tx
            .send_replace(Arc::new(RoleSnapshot::pending(user_id.clone())));
        true
    }

    /// True when `user_id` holds a resolved role younger than the throttle.
    fn recently_resolved(&self, user_id: &UserId) -> bool {
        let state = self.state.lock();
        let snapshot = self.snapshot();
        snapshot.is_ready
            && snapshot.source == RoleSource::Resolved
            && snapshot.is_for(user_id)
            && state
                .last_resolved
                .is_some_and(|at| at.elapsed() < self.throttle)
    }

    /// Shows the cached role while the resolver runs. Skipped if the
    /// session moved on during the storage read.
    async fn hydrate(&self, ticket: RefreshTicket, user_id: &UserId) {
        let Some(role) = self.cache.get(user_id).await else {
            return;
        };

        match self.identity.current_session().await {
            Ok(session) if session.user_id.as_ref() == Some(user_id) => {}
            _ => {
                debug!(ticket = %ticket, user_id = %user_id, "Session moved on, skipping hydrate");
                return;
            }
        }

        let _state = self.state.lock();
        let snapshot = self.snapshot();
        if self.tickets.is_latest(ticket) && snapshot.is_for(user_id) && !snapshot.role.is_assigned() {
            debug!(ticket = %ticket, user_id = %user_id, role = %role, "Hydrated from cache");
            self.snapshot_tx
                .send_replace(Arc::new(RoleSnapshot::hydrated(user_id.clone(), role)));
        }
    }

    /// The single write path for finished refreshes.
    fn commit(
        &self,
        ticket: RefreshTicket,
        next: RoleSnapshot,
        outcome: RefreshOutcome,
    ) -> bool {
        let mut state = self.state.lock();

        if !self.tickets.is_latest(ticket) {
            debug!(
                ticket = %ticket,
                latest = %self.tickets.latest(),
                "Discarded stale: superseded by a newer refresh"
            );
            state.last_outcome = Some(RefreshOutcome::DiscardedStale);
            return false;
        }

        state.last_resolved = match next.source {
            RoleSource::Resolved => Some(Instant::now()),
            _ => None,
        };
        state.last_outcome = Some(outcome);

        debug!(
            ticket = %ticket,
            user_id = ?next.user_id.as_ref().map(|u| u.as_str()),
            role = %next.role,
            "Committed"
        );
        self.snapshot_tx.send_replace(Arc::new(next));
        true
    }

    fn record(&self, outcome: RefreshOutcome) {
        self.state.lock().last_outcome = Some(outcome);
    }

    /// Writes the committed role through to durable storage, undoing the
    /// write if the user left while it was in progress.
    async fn persist(&self, user_id: &UserId, role: Role) {
        self.cache.set(user_id, role).await;
        if !self.snapshot().is_for(user_id) {
            debug!(user_id = %user_id, "User left during persist, clearing cached role");
            self.cache.clear(user_id).await;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::RoleStrategy;
    use crate::testing::{FakeIdentity, ScriptedStrategy};
    use rxdist_db::{DbResult, MemoryStorage, SecureStorage};
    use tokio::time::sleep;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    struct Fixture {
        store: RoleStore,
        identity: Arc<FakeIdentity>,
        strategy: Arc<ScriptedStrategy>,
        cache: PersistentRoleCache,
    }

    fn fixture(identity: FakeIdentity, strategy: ScriptedStrategy) -> Fixture {
        let identity = Arc::new(identity);
        let strategy = Arc::new(strategy);
        let cache = PersistentRoleCache::new(Arc::new(MemoryStorage::new()));
        let resolver = RoleResolver::new(vec![strategy.clone() as Arc<dyn RoleStrategy>]).unwrap();
        let store = RoleStore::new(
            identity.clone(),
            resolver,
            cache.clone(),
            DEFAULT_REFRESH_THROTTLE,
        );
        Fixture {
            store,
            identity,
            strategy,
            cache,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_session_commits_ready_empty_snapshot() {
        let f = fixture(FakeIdentity::anonymous(), ScriptedStrategy::answering("rpc", "ADMIN"));

        assert_eq!(f.store.refresh(RefreshReason::Boot).await, Role::Unassigned);

        let snap = f.store.snapshot();
        assert!(snap.is_ready);
        assert!(snap.user_id.is_none());
        assert_eq!(snap.role, Role::Unassigned);
        assert_eq!(f.strategy.calls(), 0);
        assert_eq!(f.store.last_outcome(), Some(RefreshOutcome::NoSession));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_share_one_resolution() {
        let f = fixture(
            FakeIdentity::signed_in("u1"),
            ScriptedStrategy::answering("rpc", "ADMIN").with_delay(ms(50)),
        );

        let first = tokio::spawn({
            let store = f.store.clone();
            async move { store.refresh(RefreshReason::Manual).await }
        });
        sleep(ms(10)).await;
        let second = tokio::spawn({
            let store = f.store.clone();
            async move { store.refresh(RefreshReason::Manual).await }
        });

        assert_eq!(first.await.unwrap(), Role::Admin);
        assert_eq!(second.await.unwrap(), Role::Admin);
        assert_eq!(f.strategy.calls(), 1);
        assert!(!f.store.is_resolving());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_dispatched_wins() {
        let f = fixture(
            FakeIdentity::signed_in("u1"),
            ScriptedStrategy::answering("rpc", "COMPRAS")
                .then_answer(ms(100), "VENTAS")
                .then_answer(ms(20), "ADMIN"),
        );

        let slow = tokio::spawn({
            let store = f.store.clone();
            async move { store.refresh(RefreshReason::Manual).await }
        });
        sleep(ms(1)).await;

        let fast = f.store.refresh(RefreshReason::Auth(AuthEvent::TokenRefreshed)).await;
        assert_eq!(fast, Role::Admin);

        assert_eq!(slow.await.unwrap(), Role::Admin);
        let snap = f.store.snapshot();
        assert_eq!(snap.role, Role::Admin);
        assert_eq!(snap.source, RoleSource::Resolved);
        assert_eq!(f.strategy.calls(), 2);
        assert_eq!(f.cache.get(&user("u1")).await, Some(Role::Admin));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_switch_shows_empty_role_until_new_user_resolves() {
        let f = fixture(
            FakeIdentity::signed_in("u1"),
            ScriptedStrategy::answering("rpc", "ADMIN")
                .then_answer(ms(0), "VENTAS")
                .then_answer(ms(100), "VENTAS")
                .then_answer(ms(30), "ADMIN"),
        );
        assert_eq!(f.store.refresh(RefreshReason::Boot).await, Role::Ventas);

        // A slow refresh for u1 is in flight when the session switches to u2.
        let stale = tokio::spawn({
            let store = f.store.clone();
            async move { store.refresh(RefreshReason::Manual).await }
        });
        sleep(ms(10)).await;
        f.identity.set_user(Some("u2"));
        f.store.handle_auth_event(AuthEvent::SignedIn).await;
        sleep(ms(5)).await;

        let snap = f.store.snapshot();
        assert!(snap.is_for(&user("u2")));
        assert_eq!(snap.role, Role::Unassigned);
        assert!(!snap.is_ready);

        sleep(ms(30)).await;
        let snap = f.store.snapshot();
        assert!(snap.is_for(&user("u2")));
        assert_eq!(snap.role, Role::Admin);

        // u1's result arrives last and must not leak into u2's snapshot.
        assert_eq!(stale.await.unwrap(), Role::Admin);
        let snap = f.store.snapshot();
        assert!(snap.is_for(&user("u2")));
        assert_eq!(snap.role, Role::Admin);
        assert_eq!(f.cache.get(&user("u1")).await, Some(Role::Ventas));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_clears_cache_and_snapshot() {
        let f = fixture(FakeIdentity::signed_in("u1"), ScriptedStrategy::answering("rpc", "VENTAS"));
        assert_eq!(f.store.refresh(RefreshReason::Boot).await, Role::Ventas);
        assert_eq!(f.cache.get(&user("u1")).await, Some(Role::Ventas));

        f.identity.set_user(None);
        f.store.handle_auth_event(AuthEvent::SignedOut).await;

        let snap = f.store.snapshot();
        assert_eq!(snap.role, Role::Unassigned);
        assert!(snap.user_id.is_none());
        assert!(snap.is_ready);
        assert_eq!(f.cache.get(&user("u1")).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_supersedes_in_flight_resolution() {
        let f = fixture(
            FakeIdentity::signed_in("u1"),
            ScriptedStrategy::answering("rpc", "BODEGA").with_delay(ms(50)),
        );

        let pending = tokio::spawn({
            let store = f.store.clone();
            async move { store.refresh(RefreshReason::Boot).await }
        });
        sleep(ms(10)).await;
        f.store.apply_sign_out().await;

        pending.await.unwrap();
        let snap = f.store.snapshot();
        assert!(snap.user_id.is_none());
        assert_eq!(snap.role, Role::Unassigned);
        assert_eq!(f.cache.get(&user("u1")).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_known_role() {
        let f = fixture(
            FakeIdentity::signed_in("u1"),
            ScriptedStrategy::failing("rpc", "503").then_answer(ms(0), "COBRANZA"),
        );
        assert_eq!(f.store.refresh(RefreshReason::Boot).await, Role::Cobranza);

        assert_eq!(f.store.refresh(RefreshReason::Manual).await, Role::Cobranza);
        let snap = f.store.snapshot();
        assert_eq!(snap.role, Role::Cobranza);
        assert!(snap.is_ready);
        assert_eq!(f.store.last_outcome(), Some(RefreshOutcome::DeferredOnError));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_without_known_role_stays_not_ready() {
        let f = fixture(FakeIdentity::signed_in("u1"), ScriptedStrategy::failing("rpc", "503"));

        assert_eq!(f.store.refresh(RefreshReason::Boot).await, Role::Unassigned);
        let snap = f.store.snapshot();
        assert!(snap.is_for(&user("u1")));
        assert!(!snap.is_ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_session_ended_clears_to_empty() {
        let f = fixture(
            FakeIdentity::signed_in("u1"),
            ScriptedStrategy::failing("rpc", "401").with_delay(ms(20)),
        );

        let pending = tokio::spawn({
            let store = f.store.clone();
            async move { store.refresh(RefreshReason::Boot).await }
        });
        sleep(ms(5)).await;
        f.identity.set_user(None);

        assert_eq!(pending.await.unwrap(), Role::Unassigned);
        let snap = f.store.snapshot();
        assert!(snap.is_ready);
        assert!(snap.user_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_read_failure_defers() {
        let f = fixture(FakeIdentity::signed_in("u1"), ScriptedStrategy::answering("rpc", "ADMIN"));
        assert_eq!(f.store.refresh(RefreshReason::Boot).await, Role::Admin);

        f.identity.set_unavailable(true);
        assert_eq!(f.store.refresh(RefreshReason::Manual).await, Role::Admin);
        assert_eq!(f.store.last_outcome(), Some(RefreshOutcome::DeferredOnError));
        assert_eq!(f.strategy.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hydrates_from_cache_before_resolution() {
        let f = fixture(
            FakeIdentity::signed_in("u1"),
            ScriptedStrategy::answering("rpc", "ADMIN").with_delay(ms(50)),
        );
        f.cache.set(&user("u1"), Role::Bodega).await;

        let pending = tokio::spawn({
            let store = f.store.clone();
            async move { store.refresh(RefreshReason::Boot).await }
        });
        sleep(ms(10)).await;

        let snap = f.store.snapshot();
        assert_eq!(snap.role, Role::Bodega);
        assert_eq!(snap.source, RoleSource::Cache);
        assert!(snap.is_ready);

        assert_eq!(pending.await.unwrap(), Role::Admin);
        assert_eq!(f.store.snapshot().source, RoleSource::Resolved);
        assert_eq!(f.cache.get(&user("u1")).await, Some(Role::Admin));
    }

    struct SlowReads {
        inner: MemoryStorage,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl SecureStorage for SlowReads {
        async fn get_item(&self, key: &str) -> DbResult<Option<String>> {
            sleep(self.delay).await;
            self.inner.get_item(key).await
        }

        async fn set_item(&self, key: &str, value: &str) -> DbResult<()> {
            self.inner.set_item(key, value).await
        }

        async fn delete_item(&self, key: &str) -> DbResult<()> {
            self.inner.delete_item(key).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hydrate_runs_alongside_resolver_and_rechecks_session() {
        let identity = Arc::new(FakeIdentity::signed_in("u1"));
        let strategy = Arc::new(ScriptedStrategy::answering("rpc", "ADMIN").with_delay(ms(100)));
        let cache = PersistentRoleCache::new(Arc::new(SlowReads {
            inner: MemoryStorage::new(),
            delay: ms(50),
        }));
        cache.set(&user("u1"), Role::Bodega).await;
        let store = RoleStore::new(
            identity.clone(),
            RoleResolver::new(vec![strategy.clone() as Arc<dyn RoleStrategy>]).unwrap(),
            cache,
            DEFAULT_REFRESH_THROTTLE,
        );

        store.trigger(RefreshReason::Boot);
        sleep(ms(10)).await;
        // The resolver started without waiting for the storage read.
        assert_eq!(strategy.calls(), 1);
        identity.set_user(Some("u2"));

        sleep(ms(50)).await;
        let snap = store.snapshot();
        assert!(snap.is_for(&user("u1")));
        assert!(!snap.is_ready);
        assert_eq!(snap.role, Role::Unassigned);

        sleep(ms(100)).await;
        let snap = store.snapshot();
        assert!(!snap.is_ready);
        assert_eq!(snap.role, Role::Unassigned);
        assert_eq!(store.last_outcome(), Some(RefreshOutcome::DiscardedStale));
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreground_refresh_is_throttled() {
        let f = fixture(FakeIdentity::signed_in("u1"), ScriptedStrategy::answering("rpc", "VENTAS"));
        f.store.refresh(RefreshReason::Boot).await;

        sleep(Duration::from_secs(2)).await;
        assert_eq!(f.store.refresh(RefreshReason::Foreground).await, Role::Ventas);
        assert_eq!(f.strategy.calls(), 1);

        f.store.refresh(RefreshReason::Manual).await;
        assert_eq!(f.strategy.calls(), 2);

        sleep(Duration::from_secs(6)).await;
        f.store.refresh(RefreshReason::Foreground).await;
        assert_eq!(f.strategy.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_only_covers_the_session_user() {
        let f = fixture(
            FakeIdentity::signed_in("u1"),
            ScriptedStrategy::answering("rpc", "VENTAS").then_answer(ms(0), "ADMIN"),
        );
        assert_eq!(f.store.refresh(RefreshReason::Boot).await, Role::Admin);

        // Session switches without an event reaching the store.
        f.identity.set_user(Some("u2"));
        sleep(Duration::from_secs(1)).await;

        assert_eq!(f.store.refresh(RefreshReason::Foreground).await, Role::Ventas);
        let snap = f.store.snapshot();
        assert!(snap.is_for(&user("u2")));
        assert!(snap.is_ready);
        assert_eq!(f.strategy.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_events_bypass_throttle() {
        let f = fixture(FakeIdentity::signed_in("u1"), ScriptedStrategy::answering("rpc", "VENTAS"));
        f.store.refresh(RefreshReason::Boot).await;

        f.store.handle_auth_event(AuthEvent::TokenRefreshed).await;
        sleep(ms(1)).await;
        assert_eq!(f.strategy.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_each_commit() {
        let f = fixture(FakeIdentity::signed_in("u1"), ScriptedStrategy::answering("rpc", "ADMIN"));
        let mut rx = f.store.subscribe();
        let before = rx.borrow_and_update().clone();

        f.store.refresh(RefreshReason::Boot).await;

        assert!(rx.has_changed().unwrap());
        let after = rx.borrow_and_update().clone();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.role, Role::Admin);
    }
}
