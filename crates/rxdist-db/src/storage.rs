//! # Secure Storage Backends
//!
//! The durable string store the role cache writes through. Platform
//! bridges (iOS keychain, Android keystore, browser storage) implement
//! [`SecureStorage`] themselves; this crate ships the SQLite-backed
//! [`Database`] implementation and an in-process [`MemoryStorage`].

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::DbResult;
use crate::pool::Database;

/// Durable per-device key/value storage.
///
/// All methods are fallible: keychains can be locked and browser storage
/// can be full. Callers that treat the store as a hint swallow errors.
#[async_trait]
pub trait SecureStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> DbResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> DbResult<()>;

    async fn delete_item(&self, key: &str) -> DbResult<()>;
}

#[async_trait]
impl SecureStorage for Database {
    async fn get_item(&self, key: &str) -> DbResult<Option<String>> {
        self.key_values().get(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> DbResult<()> {
        self.key_values().set(key, value).await
    }

    async fn delete_item(&self, key: &str) -> DbResult<()> {
        self.key_values().delete(key).await.map(|_| ())
    }
}

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl SecureStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> DbResult<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_item(&self, key: &str) -> DbResult<()> {
        self.items.write().remove(key);
        Ok(())
    }
}
