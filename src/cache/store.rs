//! Persistent slow-tier storage behind a strategy interface.
//!
//! The slow tier is a namespaced key → JSON-serialized-entry store with no
//! schema versioning. Keys live under the `validation:` and `processing:`
//! namespaces; cleanup routines never touch keys outside them. Backends
//! are interchangeable: SQLite for durable deployments, an in-memory map
//! for tests and no-persistence setups.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

/// Key namespace for cached validation results
pub const VALIDATION_NS: &str = "validation:";

/// Key namespace for cached processing results
pub const PROCESSING_NS: &str = "processing:";

/// SQL schema for the slow cache tier
const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

-- Index for the background expiry sweep
CREATE INDEX IF NOT EXISTS idx_cache_expires ON cache_entries(expires_at);
";

/// Storage strategy for the slow cache tier.
///
/// All operations are best-effort from the cache manager's point of view:
/// errors are surfaced as `Result` here and swallowed-with-logging one
/// level up, so tests can assert on the failing condition.
pub trait PersistentStore: Send + Sync {
    /// Fetch the JSON-serialized entry stored under `key`
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    /// Store a JSON-serialized entry with its absolute expiry (unix seconds)
    fn set<'a>(&'a self, key: &'a str, value: String, expires_at: i64)
    -> BoxFuture<'a, Result<()>>;

    /// Remove one entry
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>>;

    /// List keys under a namespace prefix
    fn keys<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;

    /// Delete every namespaced entry whose expiry has passed; returns the
    /// number removed. Keys outside the two namespaces are never touched.
    fn remove_expired(&self, now: i64) -> BoxFuture<'_, Result<u64>>;

    /// Delete every namespaced entry
    fn clear(&self) -> BoxFuture<'_, Result<()>>;

    /// Number of namespaced entries currently stored
    fn len(&self) -> BoxFuture<'_, Result<u64>>;
}

/// Durable slow tier backed by SQLite.
///
/// Uses WAL journal mode for concurrent reads during writes and a busy
/// timeout so parallel pipelines sharing one database degrade to waiting
/// instead of erroring.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open an existing store or create a new one.
    ///
    /// The database is stored at `{cache_dir}/linkpipe_cache.sqlite`.
    pub async fn open(cache_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(cache_dir)
            .await
            .context("Failed to create cache directory")?;

        let db_path = cache_dir.join("linkpipe_cache.sqlite");

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .context("Failed to open cache database")?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("Failed to initialize cache schema")?;

        Ok(Self { pool })
    }
}

impl PersistentStore for SqliteStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT value FROM cache_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .context("Cache read failed")?;
            Ok(row.map(|r| r.get::<String, _>("value")))
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        expires_at: i64,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                               expires_at = excluded.expires_at",
            )
            .bind(key)
            .bind(value)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .context("Cache write failed")?;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            sqlx::query("DELETE FROM cache_entries WHERE key = ?")
                .bind(key)
                .execute(&self.pool)
                .await
                .context("Cache delete failed")?;
            Ok(())
        })
    }

    fn keys<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(async move {
            let pattern = format!("{}%", prefix.replace('%', "\\%"));
            let rows = sqlx::query("SELECT key FROM cache_entries WHERE key LIKE ? ESCAPE '\\'")
                .bind(pattern)
                .fetch_all(&self.pool)
                .await
                .context("Cache key scan failed")?;
            Ok(rows.iter().map(|r| r.get::<String, _>("key")).collect())
        })
    }

    fn remove_expired(&self, now: i64) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let result = sqlx::query(
                "DELETE FROM cache_entries WHERE expires_at < ?
                 AND (key LIKE 'validation:%' OR key LIKE 'processing:%')",
            )
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Cache sweep failed")?;
            Ok(result.rows_affected())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            sqlx::query(
                "DELETE FROM cache_entries
                 WHERE key LIKE 'validation:%' OR key LIKE 'processing:%'",
            )
            .execute(&self.pool)
            .await
            .context("Cache clear failed")?;
            Ok(())
        })
    }

    fn len(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT COUNT(*) AS n FROM cache_entries
                 WHERE key LIKE 'validation:%' OR key LIKE 'processing:%'",
            )
            .fetch_one(&self.pool)
            .await
            .context("Cache count failed")?;
            Ok(row.get::<i64, _>("n") as u64)
        })
    }
}

/// In-memory slow tier for tests and no-persistence deployments
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, i64)>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_namespace(key: &str) -> bool {
    key.starts_with(VALIDATION_NS) || key.starts_with(PROCESSING_NS)
}

impl PersistentStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            Ok(self.entries.lock().get(key).map(|(v, _)| v.clone()))
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: String,
        expires_at: i64,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.entries
                .lock()
                .insert(key.to_string(), (value, expires_at));
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.entries.lock().remove(key);
            Ok(())
        })
    }

    fn keys<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(async move {
            Ok(self
                .entries
                .lock()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        })
    }

    fn remove_expired(&self, now: i64) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|k, (_, expires_at)| !in_namespace(k) || *expires_at >= now);
            Ok((before - entries.len()) as u64)
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.entries.lock().retain(|k, _| !in_namespace(k));
            Ok(())
        })
    }

    fn len(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move {
            Ok(self
                .entries
                .lock()
                .keys()
                .filter(|k| in_namespace(k))
                .count() as u64)
        })
    }
}
