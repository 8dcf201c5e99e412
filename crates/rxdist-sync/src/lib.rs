//! # rxdist-sync: Authorization State Engine for Rxdist
//!
//! This crate keeps the signed-in user's role in step with the identity
//! provider and gives screens a role-keyed, stale-while-revalidate loader
//! for business data.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Authorization Engine                                │
//! │                                                                         │
//! │  IdentityProvider (external)                                           │
//! │       │ auth-state stream                                               │
//! │       ▼                                                                 │
//! │  ┌────────────────────┐   refresh(reason)    ┌─────────────────────┐   │
//! │  │ AuthSessionWatcher │ ───────────────────► │     RoleStore       │   │
//! │  └────────────────────┘                      │                     │   │
//! │                                              │ tickets, in-flight  │   │
//! │  screens ── refresh(Foreground/Manual) ────► │ join, commit        │   │
//! │                                              └──┬───────────┬──────┘   │
//! │                                                 │           │          │
//! │                          ┌──────────────────────┘           │          │
//! │                          ▼                                  ▼          │
//! │               ┌─────────────────────┐          ┌───────────────────┐   │
//! │               │   RoleResolver      │          │ PersistentRole    │   │
//! │               │ rpc → profile_table │          │ Cache (rxdist-db) │   │
//! │               └─────────────────────┘          └───────────────────┘   │
//! │                                                                         │
//! │  RoleStore snapshot ──► role key ──► DashboardCacheLoader::load()      │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                 screen-supplied fetchers (external)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types
//! - [`identity`] - Identity provider seam
//! - [`resolver`] - Ordered role strategies
//! - [`store`] - The role store and its commit procedure
//! - [`watcher`] - Auth-state event loop
//! - [`loader`] - Stale-while-revalidate loader
//! - `testing` - Fakes for the external seams (`test-utils` feature)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rxdist_sync::{AuthSessionWatcher, RoleResolver, RoleStore, SyncConfig};
//!
//! let config = SyncConfig::load_or_default(None);
//! let resolver = RoleResolver::ordered(strategies, &config.auth.strategies)?;
//! let store = RoleStore::new(identity.clone(), resolver, cache, config.refresh_throttle());
//! let watcher = AuthSessionWatcher::start(identity, store.clone());
//!
//! let role = store.refresh(RefreshReason::Boot).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod identity;
pub mod loader;
pub mod resolver;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod watcher;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AuthSettings, CacheSettings, StorageSettings, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use identity::IdentityProvider;
pub use loader::{
    CacheEntry, DashboardCacheLoader, LoadOptions, LoadOutcome, LoadView, DEFAULT_CACHE_TTL,
};
pub use resolver::{RoleResolver, RoleStrategy};
pub use store::{RefreshOutcome, RoleStore, DEFAULT_REFRESH_THROTTLE};
pub use watcher::{AuthSessionWatcher, AuthWatcherHandle};
