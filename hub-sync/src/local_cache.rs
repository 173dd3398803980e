//! Local cache store
//!
//! Provides:
//! - [`LocalCache`], the key/value contract the engine persists through
//! - [`SqliteCache`], a durable SQLite-backed store that survives restarts
//! - [`MemoryCache`], an ephemeral store for tests and throwaway sessions
//!
//! Values are opaque strings; the engine stores JSON in them.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::RwLock;

use crate::model::ReferenceListKind;

/// Keys of the local cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full redemption record list, newest first
    Records,
    VoucherList,
    PharmacyList,
    AdminCredential,
    /// Time of the last successful push to the remote
    LastBackup,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::Records => "records",
            CacheKey::VoucherList => "voucher_list",
            CacheKey::PharmacyList => "pharmacy_list",
            CacheKey::AdminCredential => "admin_password",
            CacheKey::LastBackup => "last_backup",
        }
    }

    pub fn for_list(kind: ReferenceListKind) -> Self {
        match kind {
            ReferenceListKind::Voucher => CacheKey::VoucherList,
            ReferenceListKind::Pharmacy => CacheKey::PharmacyList,
        }
    }
}

/// Persisted key/value area owned by the sync engine
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: CacheKey) -> SyncResult<Option<String>>;

    async fn set(&self, key: CacheKey, value: &str) -> SyncResult<()>;

    async fn remove(&self, key: CacheKey) -> SyncResult<()>;
}

/// Read and decode a JSON value stored under `key`
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn LocalCache,
    key: CacheKey,
) -> SyncResult<Option<T>> {
    match cache.get(key).await? {
        Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
            SyncError::Serialization(format!("Corrupt cache entry {}: {}", key.as_str(), e))
        }),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it under `key`
pub async fn set_json<T: Serialize + ?Sized>(
    cache: &dyn LocalCache,
    key: CacheKey,
    value: &T,
) -> SyncResult<()> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, &raw).await
}

/// Configuration for the SQLite cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalCacheConfig {
    /// Path to the database file, created when missing
    pub db_path: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Whether to enable WAL mode
    pub enable_wal: bool,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            db_path: "voucher_hub_cache.db".to_string(),
            max_connections: 5,
            enable_wal: true,
        }
    }
}

/// SQLite-backed cache
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (or create) the cache database
    pub async fn open(config: &LocalCacheConfig) -> SyncResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.db_path))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        if config.enable_wal {
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await?;
        }

        let cache = Self { pool };
        cache.initialize_schema().await?;

        tracing::debug!(db_path = %config.db_path, "Opened local cache");

        Ok(cache)
    }

    async fn initialize_schema(&self) -> SyncResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl LocalCache for SqliteCache {
    async fn get(&self, key: CacheKey) -> SyncResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM cache_entries WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: CacheKey, value: &str) -> SyncResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: CacheKey) -> SyncResult<()> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-process cache, lost on drop
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: CacheKey) -> SyncResult<Option<String>> {
        Ok(self.entries.read().await.get(&key).cloned())
    }

    async fn set(&self, key: CacheKey, value: &str) -> SyncResult<()> {
        self.entries.write().await.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: CacheKey) -> SyncResult<()> {
        self.entries.write().await.remove(&key);
        Ok(())
    }
}
