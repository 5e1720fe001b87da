//! Session storage backends
//!
//! `SqliteSessionStore` persists entries across restarts and is shared by
//! every window opened on the same database file. `MemorySessionStore` keeps
//! entries for the lifetime of the process.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{CookieOptions, SessionStore},
    time::{Clock, SystemClock},
};
use sqlx::{sqlite::SqlitePool, Row};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS session_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        path TEXT NOT NULL,
        expires_at INTEGER,
        updated_at INTEGER NOT NULL
    )
"#;

fn expiry_timestamp(clock: &dyn Clock, options: &CookieOptions) -> Option<i64> {
    options
        .max_age
        .map(|age| clock.unix_timestamp() + age.as_secs() as i64)
}

/// SQLite-backed session store implementation
///
/// Expired rows are treated as absent on read and removed lazily; call
/// [`SqliteSessionStore::purge_expired`] to reclaim them eagerly.
pub struct SqliteSessionStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteSessionStore {
    /// Create a new session store with the given database path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(BridgeError::Io)?;
            }
        }

        // SQLite URLs use forward slashes on every platform
        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let db_url = format!("sqlite://{}?mode=rwc", path_str);

        let store = Self::connect(&db_url).await?;
        debug!(path = ?db_path, "Initialized session store");
        Ok(store)
    }

    /// Create an in-memory session store (for testing)
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(url)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to connect to DB: {}", e)))?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to create table: {}", e)))?;

        Ok(Self {
            pool,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source used for expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Delete every expired entry. Returns the number of rows removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM session_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(self.clock.unix_timestamp())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    BridgeError::StorageError(format!("Failed to purge expired entries: {}", e))
                })?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!(removed, "Purged expired session entries");
        }
        Ok(removed)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, expires_at FROM session_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to read entry: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: Option<i64> = row.get(1);
        if matches!(expires_at, Some(at) if at <= self.clock.unix_timestamp()) {
            debug!(key, "Session entry expired");
            self.delete(key).await?;
            return Ok(None);
        }

        Ok(Some(row.get(0)))
    }

    async fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session_entries (key, value, path, expires_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                path = excluded.path,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&options.path)
        .bind(expiry_timestamp(self.clock.as_ref(), options))
        .bind(self.clock.unix_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::StorageError(format!("Failed to write entry: {}", e)))?;

        debug!(key, path = %options.path, "Stored session entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::StorageError(format!("Failed to delete entry: {}", e)))?;

        debug!(key, "Deleted session entry");
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<i64>,
}

/// Process-local session store.
///
/// Clones share the same entries, so several contexts in one process can be
/// handed the same store.
#[derive(Clone)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
    clock: Arc<dyn Clock>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = self.clock.unix_timestamp();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at.map_or(true, |at| at > now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.unix_timestamp();
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at.map_or(true, |at| at > now) => {
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<()> {
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: expiry_timestamp(self.clock.as_ref(), options),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
