//! # rxdist-db: Durable Storage Layer for Rxdist
//!
//! This crate provides the durable per-user storage that backs the
//! persistent role cache. On devices with a native keychain the bridge
//! supplies its own [`SecureStorage`]; everywhere else the SQLite-backed
//! [`Database`] is used.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rxdist Storage Flow                              │
//! │                                                                         │
//! │  RoleStore (rxdist-sync)                                               │
//! │       │ get / set / clear                                               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     rxdist-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────┐   ┌───────────────┐   ┌───────────────┐   │   │
//! │  │   │ PersistentRole │   │ SecureStorage │   │   Database    │   │   │
//! │  │   │ Cache          │──►│ (trait)       │◄──│  (pool.rs)    │   │   │
//! │  │   │ (role_cache.rs)│   │ MemoryStorage │   │  KeyValueRepo │   │   │
//! │  │   └────────────────┘   └───────────────┘   └───────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite: <data dir>/rxdist.db  (table secure_kv)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Key/value repository
//! - [`storage`] - `SecureStorage` trait and backends
//! - [`role_cache`] - Per-user last-known role
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rxdist_db::{Database, DbConfig, PersistentRoleCache};
//!
//! let db = Database::new(DbConfig::new("path/to/rxdist.db")).await?;
//! let cache = PersistentRoleCache::new(Arc::new(db));
//! cache.set(&user_id, Role::Ventas).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod role_cache;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::kv::KeyValueRepository;
pub use role_cache::{PersistentRoleCache, DEFAULT_KEY_PREFIX};
pub use storage::{MemoryStorage, SecureStorage};
