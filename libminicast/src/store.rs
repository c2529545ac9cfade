//! Key-value state store
//!
//! The publish queue and notice sink both persist through this narrow
//! abstraction: get/set/delete by string key with an optional expiry.
//! Production installs use the SQLite backend; tests use the in-memory
//! backend so the queue and sink can be exercised without a filesystem.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::error::{Result, StoreError};

/// Narrow key-value persistence seam for durable bridge state.
///
/// Expired entries read as absent; expiry granularity is one second.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// Open (or create) the store at the given path and run migrations
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::IoError)?;
            }
        }

        // Use forward slashes for the SQLite URL and mode=rwc so the file
        // is created on first open.
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(StoreError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StoreError::MigrationError)?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT value, expires_at FROM kv_store WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: Option<i64> = row.get("expires_at");
        if let Some(expires_at) = expires_at {
            if expires_at <= chrono::Utc::now().timestamp() {
                // Lazy expiry: purge on read.
                self.delete(key).await?;
                return Ok(None);
            }
        }

        Ok(Some(row.get("value")))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| chrono::Utc::now().timestamp() + ttl.as_secs() as i64);

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM kv_store WHERE key = ?
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        Ok(())
    }
}

/// In-memory store backend
///
/// Available for all builds (not just tests) so integration tests can
/// drive the bridge without touching a filesystem.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, (String, Option<i64>)>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().expect("kv store mutex poisoned");
        if let Some((value, expires_at)) = entries.get(key) {
            if let Some(expires_at) = expires_at {
                if *expires_at <= chrono::Utc::now().timestamp() {
                    entries.remove(key);
                    return Ok(None);
                }
            }
            return Ok(Some(value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| chrono::Utc::now().timestamp() + ttl.as_secs() as i64);
        self.entries
            .lock()
            .expect("kv store mutex poisoned")
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("kv store mutex poisoned")
            .remove(key);
        Ok(())
    }
}
