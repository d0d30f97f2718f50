//! SQLite store backend.
//!
//! The tree is decomposed into leaf rows keyed by full path, so subtree
//! reads are prefix scans folded back into a JSON object. Writes replace
//! every row at or under the target path inside one transaction; the
//! multi-path non-atomicity the application tolerates lives above this
//! layer, not here.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{DocumentStore, StoreError, StoreEvent, Subscription, tree};

const EVENT_CAPACITY: usize = 256;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS nodes (
    path TEXT PRIMARY KEY,
    leaf TEXT NOT NULL
)";

pub struct SqliteStore {
    pool: SqlitePool,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        debug!(path = %path.as_ref().display(), "opening sqlite store");
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{}", path.as_ref().display()))?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5));
        Self::connect(options).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::connect(SqliteConnectOptions::from_str("sqlite::memory:")?).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        // SQLite permits a single writer; one connection sidesteps
        // "database is locked" under concurrent access.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        debug!("sqlite store ready");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self { pool, events })
    }

    fn notify(&self, path: &str, value: Option<Value>) {
        let _ = self.events.send(StoreEvent {
            path: path.to_string(),
            value,
        });
    }

    /// Delete every row at or under `path`, then insert the leaves of
    /// `value`, inside the caller's transaction.
    async fn replace_subtree(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        path: &str,
        value: &Value,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM nodes WHERE path = $1 OR path LIKE $1 || '/%'")
            .bind(path)
            .execute(&mut **tx)
            .await?;
        for (rel, leaf) in tree::leaves(value) {
            let full = if rel.is_empty() {
                path.to_string()
            } else {
                format!("{path}/{rel}")
            };
            sqlx::query("INSERT INTO nodes (path, leaf) VALUES ($1, $2)")
                .bind(full)
                .bind(serde_json::to_string(&leaf)?)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        tree::segments(path)?;
        let exact: Option<(String,)> =
            sqlx::query_as("SELECT leaf FROM nodes WHERE path = $1")
                .bind(path)
                .fetch_optional(&self.pool)
                .await?;
        if let Some((leaf,)) = exact {
            return Ok(Some(serde_json::from_str(&leaf)?));
        }

        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT path, leaf FROM nodes WHERE path LIKE $1 || '/%' ORDER BY path")
                .bind(path)
                .fetch_all(&self.pool)
                .await?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut value = Value::Null;
        for (row_path, leaf) in rows {
            let rel = &row_path[path.len() + 1..];
            tree::set_at(&mut value, rel, serde_json::from_str(&leaf)?)?;
        }
        Ok(Some(value))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        tree::segments(path)?;
        let mut tx = self.pool.begin().await?;
        Self::replace_subtree(&mut tx, path, &value).await?;
        tx.commit().await?;
        let after = self.read(path).await?;
        self.notify(path, after);
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        fields: serde_json::Map<String, Value>,
    ) -> Result<(), StoreError> {
        tree::segments(path)?;
        let mut tx = self.pool.begin().await?;
        for (key, value) in &fields {
            tree::segments(key)?;
            let child = format!("{path}/{key}");
            Self::replace_subtree(&mut tx, &child, value).await?;
        }
        tx.commit().await?;
        let after = self.read(path).await?;
        self.notify(path, after);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        tree::segments(path)?;
        sqlx::query("DELETE FROM nodes WHERE path = $1 OR path LIKE $1 || '/%'")
            .bind(path)
            .execute(&self.pool)
            .await?;
        self.notify(path, None);
        Ok(())
    }

    fn subscribe(&self, path: &str) -> Subscription {
        Subscription::new(path.to_string(), self.events.subscribe())
    }
}
