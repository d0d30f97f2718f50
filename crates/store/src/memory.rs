//! In-memory store backend: the whole document tree behind one lock.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};

use crate::{DocumentStore, StoreError, StoreEvent, Subscription, tree};

const EVENT_CAPACITY: usize = 256;

pub struct MemoryStore {
    root: RwLock<Value>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            root: RwLock::new(Value::Null),
            events,
        }
    }

    /// Start from an existing tree, for seeding test fixtures.
    pub fn with_root(root: Value) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            root: RwLock::new(root),
            events,
        }
    }

    fn notify(&self, path: &str, value: Option<Value>) {
        // No receivers is fine; events are advisory.
        let _ = self.events.send(StoreEvent {
            path: path.to_string(),
            value,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let root = self.root.read().await;
        Ok(tree::get_at(&root, path)?.cloned())
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let after = {
            let mut root = self.root.write().await;
            tree::set_at(&mut root, path, value)?;
            tree::get_at(&root, path)?.cloned()
        };
        self.notify(path, after);
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        fields: serde_json::Map<String, Value>,
    ) -> Result<(), StoreError> {
        let after = {
            let mut root = self.root.write().await;
            tree::merge_at(&mut root, path, &fields)?;
            tree::get_at(&root, path)?.cloned()
        };
        self.notify(path, after);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        {
            let mut root = self.root.write().await;
            tree::remove_at(&mut root, path)?;
        }
        self.notify(path, None);
        Ok(())
    }

    fn subscribe(&self, path: &str) -> Subscription {
        Subscription::new(path.to_string(), self.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn write_then_read_subtree_and_leaf() {
        let store = MemoryStore::new();
        store
            .write("lavorazione/v1/controls/freni", json!({"state": "DA FARE", "note": ""}))
            .await
            .unwrap();

        let map = store.read("lavorazione/v1/controls").await.unwrap().unwrap();
        assert_eq!(map, json!({"freni": {"state": "DA FARE", "note": ""}}));
        let note = store
            .read("lavorazione/v1/controls/freni/note")
            .await
            .unwrap();
        assert_eq!(note, Some(json!("")));
    }

    #[tokio::test]
    async fn update_merges_shallowly() {
        let store = MemoryStore::new();
        store
            .write("config", json!({"a": 1, "b": 2}))
            .await
            .unwrap();
        let mut fields = serde_json::Map::new();
        fields.insert("b".to_string(), json!(3));
        fields.insert("c".to_string(), json!(4));
        store.update("config", fields).await.unwrap();
        assert_eq!(
            store.read("config").await.unwrap(),
            Some(json!({"a": 1, "b": 3, "c": 4}))
        );
    }

    #[tokio::test]
    async fn remove_prunes_to_absent() {
        let store = MemoryStore::new();
        store.write("a/b/c", json!(1)).await.unwrap();
        store.remove("a/b/c").await.unwrap();
        assert_eq!(store.read("a").await.unwrap(), None);
        // Removing again is a no-op.
        store.remove("a/b/c").await.unwrap();
    }

    #[tokio::test]
    async fn subscription_sees_relevant_writes_only() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("lavorazione/v1");
        store.write("appointments/a1/x", json!(1)).await.unwrap();
        store
            .write("lavorazione/v1/controls/freni/state", json!("CONTROLLATO"))
            .await
            .unwrap();
        let event = sub.next().await.unwrap();
        assert_eq!(event.path, "lavorazione/v1/controls/freni/state");
    }
}
