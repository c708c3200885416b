//! In-memory document store for dry runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::storage::{DocumentStore, IdGenerator, matches, with_id};

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    ids: IdGenerator,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| matches(doc, filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<String> {
        let (id, document) = with_id(&self.ids, collection, document)?;
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_find_count() {
        let store = MemoryStore::new();
        store.insert_one("Tag", json!({"name": "IT"})).await.unwrap();
        store.insert_one("Tag", json!({"name": "핫딜"})).await.unwrap();

        assert_eq!(store.count("Tag").await, 2);
        assert_eq!(store.count("GPT").await, 0);

        let found = store.find("Tag", &json!({"name": "IT"})).await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
