//! # Dashboard Cache Loader
//!
//! A stale-while-revalidate loader keyed by the active role. Screens hand
//! it a key and an opaque fetcher; it decides whether to serve a cached
//! payload, fetch, or both, and guarantees the visible view never mixes two
//! keys or shows an out-of-order response.
//!
//! ## Load Decision
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       load(key, fetcher, opts)                          │
//! │                                                                         │
//! │  key != active ──► clear visible slot (synchronously)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  force? ──yes──► drop entry ─────────────────────────┐                 │
//! │       │ no                                            │                 │
//! │       ▼                                               │                 │
//! │  entry younger than TTL? ──no─────────────────────────┤                 │
//! │       │ yes                                           │                 │
//! │       ▼                                               ▼                 │
//! │  show cached ──► skip_cache on visible key? ──yes──► fetch (seq n)     │
//! │       │ no                                            │                 │
//! │       ▼                                               ▼                 │
//! │  return Cached                          seq n latest & key active?     │
//! │                                            ├── no  ──► Superseded       │
//! │                                            ├── ok  ──► write + show     │
//! │                                            └── err ──► keep data/error  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A revalidation of visible data runs on a spawned task: `load` returns
//! `Cached` at once and the fresh payload arrives through the view.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

/// Default cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

// =============================================================================
// Types
// =============================================================================

/// One cached payload.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub stored_at: Instant,
    pub payload: Arc<T>,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// What screens render.
#[derive(Debug)]
pub struct LoadView<K, T> {
    /// Key the view belongs to. `None` before the first load or after a reset.
    pub key: Option<K>,
    pub data: Option<Arc<T>>,
    /// A fetch is running and there is nothing to show yet.
    pub is_loading: bool,
    /// A fetch is running behind visible data.
    pub is_background_refreshing: bool,
    /// Last fetch error for this key, kept until the next success.
    pub error: Option<String>,
}

impl<K: Clone, T> Clone for LoadView<K, T> {
    fn clone(&self) -> Self {
        LoadView {
            key: self.key.clone(),
            data: self.data.clone(),
            is_loading: self.is_loading,
            is_background_refreshing: self.is_background_refreshing,
            error: self.error.clone(),
        }
    }
}

impl<K, T> LoadView<K, T> {
    pub fn idle() -> Self {
        LoadView {
            key: None,
            data: None,
            is_loading: false,
            is_background_refreshing: false,
            error: None,
        }
    }

    fn empty(key: K) -> Self {
        LoadView {
            key: Some(key),
            ..Self::idle()
        }
    }

    fn showing(key: K, data: Arc<T>) -> Self {
        LoadView {
            key: Some(key),
            data: Some(data),
            ..Self::idle()
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Ignore and drop any cached entry.
    pub force: bool,
    /// Revalidate in the background even when the cached entry is fresh.
    pub skip_cache: bool,
}

impl LoadOptions {
    pub fn forced() -> Self {
        LoadOptions {
            force: true,
            skip_cache: false,
        }
    }

    pub fn revalidate() -> Self {
        LoadOptions {
            force: false,
            skip_cache: true,
        }
    }
}

/// Result of a successful `load`.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    /// Fetched now and shown.
    Fresh(Arc<T>),
    /// Served from cache without fetching.
    Cached(Arc<T>),
    /// A newer load for the key, or a key change, won the race.
    Superseded,
}

impl<T> LoadOutcome<T> {
    pub fn payload(&self) -> Option<&Arc<T>> {
        match self {
            LoadOutcome::Fresh(payload) | LoadOutcome::Cached(payload) => Some(payload),
            LoadOutcome::Superseded => None,
        }
    }
}

// =============================================================================
// Loader
// =============================================================================

struct LoaderState<K, T> {
    active: Option<K>,
    entries: HashMap<K, CacheEntry<T>>,
    sequences: HashMap<K, u64>,
}

struct LoaderInner<K, T> {
    ttl: Duration,
    state: Mutex<LoaderState<K, T>>,
    view_tx: watch::Sender<Arc<LoadView<K, T>>>,
}

/// Role-keyed stale-while-revalidate loader. Cheap to clone.
pub struct DashboardCacheLoader<K, T> {
    inner: Arc<LoaderInner<K, T>>,
}

impl<K, T> Clone for DashboardCacheLoader<K, T> {
    fn clone(&self) -> Self {
        DashboardCacheLoader {
            inner: self.inner.clone(),
        }
    }
}

impl<K, T> DashboardCacheLoader<K, T>
where
    K: Clone + Eq + Hash + Display + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        let (view_tx, _) = watch::channel(Arc::new(LoadView::idle()));
        DashboardCacheLoader {
            inner: Arc::new(LoaderInner {
                ttl,
                state: Mutex::new(LoaderState {
                    active: None,
                    entries: HashMap::new(),
                    sequences: HashMap::new(),
                }),
                view_tx,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn view(&self) -> Arc<LoadView<K, T>> {
        self.inner.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<LoadView<K, T>>> {
        self.inner.view_tx.subscribe()
    }

    fn publish(&self, view: LoadView<K, T>) {
        self.inner.view_tx.send_replace(Arc::new(view));
    }

    /// Loads `key`, serving from cache when allowed.
    ///
    /// Fetch failures are returned as [`SyncError::FetchFailed`] and also
    /// recorded in the view. A background revalidation returns `Cached`
    /// at once; its result only reaches the view.
    pub async fn load<F, Fut, E>(
        &self,
        key: K,
        fetcher: F,
        opts: LoadOptions,
    ) -> SyncResult<LoadOutcome<T>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let mut revalidating = None;
        let seq = {
            let mut state = self.inner.state.lock();

            let key_changed = state.active.as_ref() != Some(&key);
            if key_changed {
                debug!(key = %key, "Active key changed, clearing visible data");
                state.active = Some(key.clone());
                self.publish(LoadView::empty(key.clone()));
            }

            if opts.force {
                state.entries.remove(&key);
            } else if let Some(payload) = state
                .entries
                .get(&key)
                .filter(|entry| entry.is_fresh(self.inner.ttl))
                .map(|entry| entry.payload.clone())
            {
                let was_visible = !key_changed && self.view().has_data();
                if !(opts.skip_cache && was_visible) {
                    debug!(key = %key, "Serving cached payload");
                    self.publish(LoadView::showing(key, payload.clone()));
                    return Ok(LoadOutcome::Cached(payload));
                }
                debug!(key = %key, "Revalidating visible payload in background");
                self.publish(LoadView::showing(key.clone(), payload.clone()));
                revalidating = Some(payload);
            }

            let seq = state.sequences.entry(key.clone()).or_insert(0);
            *seq += 1;
            let seq = *seq;

            let mut view = (*self.view()).clone();
            let visible = view.has_data();
            view.is_loading = !visible;
            view.is_background_refreshing = visible;
            self.publish(view);

            debug!(key = %key, seq, "Fetch dispatched");
            seq
        };

        if let Some(payload) = revalidating {
            let loader = self.clone();
            tokio::spawn(async move {
                let result = fetcher().await;
                let _ = loader.settle(key, seq, result);
            });
            return Ok(LoadOutcome::Cached(payload));
        }

        let result = fetcher().await;
        self.settle(key, seq, result)
    }

    /// Applies a fetch result if `seq` is still the latest for an active key.
    fn settle<E: Display>(
        &self,
        key: K,
        seq: u64,
        result: Result<T, E>,
    ) -> SyncResult<LoadOutcome<T>> {
        let mut state = self.inner.state.lock();
        let latest = state.sequences.get(&key).copied() == Some(seq);
        if !latest || state.active.as_ref() != Some(&key) {
            debug!(key = %key, seq, "Discarded superseded response");
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(value) => {
                let payload = Arc::new(value);
                state.entries.insert(
                    key.clone(),
                    CacheEntry {
                        stored_at: Instant::now(),
                        payload: payload.clone(),
                    },
                );
                debug!(key = %key, seq, "Fetch committed");
                self.publish(LoadView::showing(key, payload.clone()));
                Ok(LoadOutcome::Fresh(payload))
            }
            Err(e) => {
                let message = e.to_string();
                warn!(key = %key, seq, error = %message, "Fetch failed");
                let mut view = (*self.view()).clone();
                view.is_loading = false;
                view.is_background_refreshing = false;
                view.error = Some(message.clone());
                self.publish(view);
                Err(SyncError::FetchFailed(message))
            }
        }
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Fresh cached payload for `key`, without touching the view.
    pub fn cached(&self, key: &K) -> Option<Arc<T>> {
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.inner.ttl))
            .map(|entry| entry.payload.clone())
    }

    /// Drops the cached entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.inner.state.lock().entries.remove(key).is_some()
    }

    /// Drops every cached entry. The visible view is left alone.
    pub fn clear(&self) {
        self.inner.state.lock().entries.clear();
    }

    /// Drops entries older than the TTL and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.inner.ttl;
        let mut state = self.inner.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_fresh(ttl));
        before - state.entries.len()
    }

    /// Deactivates the current key and shows the idle view. In-flight
    /// fetches are discarded when they arrive.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.active = None;
        self.publish(LoadView::idle());
    }
}

impl<K, T> std::fmt::Debug for DashboardCacheLoader<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardCacheLoader")
            .field("ttl", &self.inner.ttl)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
