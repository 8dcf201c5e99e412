//! # Rxdist Mobile Runtime
//!
//! Native core behind the distributor's mobile app. The UI bridge calls
//! [`AppRuntime::bootstrap`] once at launch, then hands screens the
//! accessors it exposes.
//!
//! ## Module Organization
//! ```text
//! rxdist_mobile/
//! ├── lib.rs          ◄─── You are here (tracing, bootstrap, shutdown)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── auth.rs     ◄─── AuthState: role, readiness, sign-out
//! │   └── resource.rs ◄─── CachedResource: role-keyed cached loads
//! └── error.rs        ◄─── AppError handed across the bridge as JSON
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Runtime Startup                                   │
//! │                                                                         │
//! │  1. init_tracing()          RUST_LOG or the default filter              │
//! │  2. SyncConfig::validate()  strategies, TTL, cache key prefix           │
//! │  3. Database::new()         SQLite key/value store + migrations         │
//! │  4. RoleStore::new()        resolver chain + persistent role cache      │
//! │  5. AuthSessionWatcher      identity events → store                     │
//! │  6. trigger(Boot)           first resolution, hydrating from cache      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod state;

use std::future::Future;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rxdist_core::{RefreshReason, Role};
use rxdist_db::{Database, DbConfig, PersistentRoleCache, SecureStorage};
use rxdist_sync::{
    AuthSessionWatcher, AuthWatcherHandle, DashboardCacheLoader, IdentityProvider, RoleResolver,
    RoleStore, RoleStrategy, SyncConfig,
};

pub use error::{AppError, AppResult, ErrorCode};
pub use state::{AuthState, CachedResource, ResourceFetch};

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=rxdist_sync=trace` - Trace the role store and loaders only
/// - Default: INFO, DEBUG for the rxdist crates
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rxdist_sync=debug,rxdist_db=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything the UI bridge holds for the lifetime of the app.
pub struct AppRuntime {
    config: SyncConfig,
    database: Option<Database>,
    store: RoleStore,
    auth: AuthState,
    watcher: AuthWatcherHandle,
}

impl AppRuntime {
    /// Opens the on-device database and starts the role store.
    ///
    /// `strategies` are the available role backends; the configured
    /// `auth.strategies` list picks and orders them.
    pub async fn bootstrap(
        config: SyncConfig,
        identity: Arc<dyn IdentityProvider>,
        strategies: Vec<Arc<dyn RoleStrategy>>,
    ) -> AppResult<Self> {
        config.validate()?;

        let path = config
            .database_path()
            .ok_or_else(|| AppError::config("Could not determine app data directory"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
        info!(path = %path.display(), "Opening role cache database");

        let database = Database::new(DbConfig::new(path)).await?;
        let storage: Arc<dyn SecureStorage> = Arc::new(database.clone());

        let mut runtime = Self::with_storage(config, identity, strategies, storage)?;
        runtime.database = Some(database);
        Ok(runtime)
    }

    /// Starts the role store over a caller-supplied storage backend
    /// (platform keychain, or [`rxdist_db::MemoryStorage`] in tests).
    ///
    /// Must be called inside a Tokio runtime.
    pub fn with_storage(
        config: SyncConfig,
        identity: Arc<dyn IdentityProvider>,
        strategies: Vec<Arc<dyn RoleStrategy>>,
        storage: Arc<dyn SecureStorage>,
    ) -> AppResult<Self> {
        config.validate()?;

        let resolver = RoleResolver::ordered(strategies, &config.auth.strategies)?;
        let cache = PersistentRoleCache::with_prefix(storage, config.auth.role_key_prefix.clone());
        let store = RoleStore::new(
            identity.clone(),
            resolver,
            cache,
            config.refresh_throttle(),
        );

        let watcher = AuthSessionWatcher::start(identity.clone(), store.clone());
        store.trigger(RefreshReason::Boot);

        info!(
            strategies = ?config.auth.strategies,
            cache_ttl_secs = config.cache.ttl_secs,
            "Rxdist runtime started"
        );

        Ok(AppRuntime {
            auth: AuthState::new(store.clone(), identity),
            config,
            database: None,
            store,
            watcher,
        })
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Builds a role-keyed cached resource using the configured TTL.
    pub fn resource<T, F, Fut>(&self, gate: &[Role], fetch: F) -> CachedResource<T>
    where
        T: Send + Sync + 'static,
        F: Fn(Role) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, String>> + Send + 'static,
    {
        CachedResource::new(
            self.auth.clone(),
            DashboardCacheLoader::new(self.config.cache_ttl()),
            gate,
            fetch,
        )
    }

    /// Called when the app returns to the foreground.
    pub fn on_foreground(&self) {
        self.store.trigger(RefreshReason::Foreground);
    }

    /// Stops the watcher and closes the database.
    pub async fn shutdown(self) {
        info!("Shutting down Rxdist runtime");
        self.watcher.shutdown().await;
        if let Some(database) = self.database {
            database.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxdist_core::AuthEvent;
    use rxdist_db::MemoryStorage;
    use rxdist_sync::testing::{FakeIdentity, ScriptedStrategy};
    use rxdist_sync::LoadOptions;
    use std::time::Duration;
    use tokio::time::sleep;

    fn strategies() -> Vec<Arc<dyn RoleStrategy>> {
        vec![
            Arc::new(ScriptedStrategy::silent("rpc")) as Arc<dyn RoleStrategy>,
            Arc::new(ScriptedStrategy::answering("profile_table", "bodega")) as Arc<dyn RoleStrategy>,
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_resolves_through_configured_chain() {
        let identity = Arc::new(FakeIdentity::signed_in("u1"));
        let runtime = AppRuntime::with_storage(
            SyncConfig::default(),
            identity.clone(),
            strategies(),
            Arc::new(MemoryStorage::new()),
        )
        .unwrap();

        sleep(Duration::from_millis(10)).await;
        assert!(runtime.auth().is_ready());
        assert_eq!(runtime.auth().role(), Role::Bodega);

        runtime.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_is_rejected() {
        let mut config = SyncConfig::default();
        config.cache.ttl_secs = 0;

        let err = AppRuntime::with_storage(
            config,
            Arc::new(FakeIdentity::anonymous()),
            strategies(),
            Arc::new(MemoryStorage::new()),
        )
        .err()
        .unwrap();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_strategy_names_leave_empty_chain() {
        let mut config = SyncConfig::default();
        config.auth.strategies = vec!["ldap".into()];

        let err = AppRuntime::with_storage(
            config,
            Arc::new(FakeIdentity::anonymous()),
            strategies(),
            Arc::new(MemoryStorage::new()),
        )
        .err()
        .unwrap();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_event_drives_resource() {
        let identity = Arc::new(FakeIdentity::anonymous());
        let runtime = AppRuntime::with_storage(
            SyncConfig::default(),
            identity.clone(),
            strategies(),
            Arc::new(MemoryStorage::new()),
        )
        .unwrap();
        let stock = runtime.resource(&[Role::Bodega], |role| async move {
            Ok(format!("{} stock", role))
        });

        sleep(Duration::from_millis(10)).await;
        let err = stock.reload(LoadOptions::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        identity.set_user(Some("u1"));
        identity.emit(AuthEvent::SignedIn);
        sleep(Duration::from_millis(10)).await;

        let outcome = stock.reload(LoadOptions::default()).await.unwrap();
        assert_eq!(
            outcome.payload().map(|p| p.as_str()),
            Some("BODEGA stock")
        );

        runtime.shutdown().await;
    }
}
