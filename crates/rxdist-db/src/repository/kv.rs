//! # Key/Value Repository
//!
//! Flat string storage in the `secure_kv` table. Writes are upserts, so a
//! key holds at most one value.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for `secure_kv` rows.
#[derive(Debug, Clone)]
pub struct KeyValueRepository {
    pool: SqlitePool,
}

impl KeyValueRepository {
    /// Creates a new KeyValueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        KeyValueRepository { pool }
    }

    /// Reads the value stored under `key`, if any.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM secure_kv WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Inserts or replaces the value stored under `key`.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Writing key");

        sqlx::query(
            r#"
            INSERT INTO secure_kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes `key`. Returns whether a row was deleted.
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM secure_kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of stored keys.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM secure_kv")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_set_get_overwrite_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.key_values();

        assert_eq!(repo.get("user_role_u1").await.unwrap(), None);

        repo.set("user_role_u1", "a").await.unwrap();
        repo.set("user_role_u1", "b").await.unwrap();
        assert_eq!(repo.get("user_role_u1").await.unwrap().as_deref(), Some("b"));
        assert_eq!(repo.count().await.unwrap(), 1);

        assert!(repo.delete("user_role_u1").await.unwrap());
        assert!(!repo.delete("user_role_u1").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
