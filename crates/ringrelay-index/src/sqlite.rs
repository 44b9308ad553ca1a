//! SQLite key-value backend.
//!
//! One `kv` table of `(key BLOB PRIMARY KEY, value BLOB)` holds every
//! namespace. Uses `sqlx` with WAL mode.
//!
//! # Usage
//! ```rust,no_run
//! use ringrelay_index::sqlite::SqliteKvStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteKvStore::open("./relay-index.db").await?;
//! let scratch = SqliteKvStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::IndexError;
use crate::kv::KvStore;

fn storage_err(e: sqlx::Error) -> IndexError {
    IndexError::Storage(e.to_string())
}

/// SQLite-backed [`KvStore`].
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// Open (or create) a database at `path`.
    ///
    /// Accepts a plain file path (`"./index.db"`) or a full SQLite URL
    /// (`"sqlite:./index.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, IndexError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;
        let store = Self { pool };
        store.init_schema(true).await?;
        debug!(%url, "opened sqlite index store");
        Ok(store)
    }

    /// Open a private in-memory database. Data is lost when the store drops.
    pub async fn in_memory() -> Result<Self, IndexError> {
        // every pooled connection would otherwise see its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;
        let store = Self { pool };
        store.init_schema(false).await?;
        Ok(store)
    }

    async fn init_schema(&self, wal: bool) -> Result<(), IndexError> {
        if wal {
            sqlx::query("PRAGMA journal_mode=WAL;")
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key   BLOB PRIMARY KEY NOT NULL,
                value BLOB NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, IndexError> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(|r| r.get::<Vec<u8>, _>("value")))
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), IndexError> {
        sqlx::query("INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}
