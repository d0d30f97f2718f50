//! Path-addressed hierarchical document store.
//!
//! Documents form a single JSON tree addressed by `/`-separated paths, the
//! way the hosted realtime database the application runs against addresses
//! them. Reads of absent paths are `Ok(None)`, never errors; empty nodes are
//! pruned so a path with no data reads back as absent.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

pub mod memory;
pub mod sqlite;
pub mod tree;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Change notification for a mutated path. `value` is the subtree at the
/// path after the mutation (`None` when it was removed).
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub path: String,
    pub value: Option<Value>,
}

impl StoreEvent {
    /// Whether this event is relevant to a listener rooted at `prefix`:
    /// the mutation happened at, under, or above the listened path.
    fn concerns(&self, prefix: &str) -> bool {
        self.path == prefix
            || self
                .path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
            || prefix
                .strip_prefix(self.path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// A filtered stream of change events at or around one path.
pub struct Subscription {
    prefix: String,
    rx: broadcast::Receiver<StoreEvent>,
}

impl Subscription {
    pub(crate) fn new(prefix: String, rx: broadcast::Receiver<StoreEvent>) -> Self {
        Self { prefix, rx }
    }

    /// Next relevant change, or `None` once the store is gone. Lagged
    /// receivers skip ahead rather than erroring.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.concerns(&self.prefix) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The storage primitives the application treats as black boxes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Value of the subtree at `path`, `None` when absent.
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Full-subtree overwrite. Writing `Null` (or a value with no leaves,
    /// such as an empty object) deletes the node.
    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Shallow merge of top-level fields at `path`. A `Null` field value
    /// removes that field.
    async fn update(
        &self,
        path: &str,
        fields: serde_json::Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Delete the subtree at `path`. Removing an absent path is a no-op.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Change notifications for events at or under `path`.
    fn subscribe(&self, path: &str) -> Subscription;
}
