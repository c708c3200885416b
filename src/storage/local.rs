//! Local filesystem document store.
//!
//! ## Storage Layout
//!
//! ```text
//! {data_dir}/
//! ├── Realtime.json     # one JSON array per collection
//! ├── Daily.json
//! ├── GPT.json
//! └── Tag.json
//! ```
//!
//! Writes go to a temp file first and are renamed into place, so a crash
//! never leaves a truncated collection behind. Inserts are serialized
//! within one process; concurrent processes are not coordinated.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::{DocumentStore, IdGenerator, matches, with_id};

/// JSON-file document store.
pub struct JsonFileStore {
    root_dir: PathBuf,
    ids: IdGenerator,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ids: IdGenerator::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the file path for a collection.
    fn path(&self, collection: &str) -> PathBuf {
        self.root_dir.join(format!("{collection}.json"))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, collection: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(collection);
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read all documents of a collection; a missing file is an empty collection.
    async fn read_collection(&self, collection: &str) -> Result<Vec<Value>> {
        let path = self.path(collection);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::store(format!("Collection {} is corrupt: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>> {
        let documents = self.read_collection(collection).await?;
        Ok(documents
            .into_iter()
            .filter(|doc| matches(doc, filter))
            .collect())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<String> {
        let (id, document) = with_id(&self.ids, collection, document)?;

        let _guard = self.write_lock.lock().await;
        let mut documents = self.read_collection(collection).await?;
        documents.push(document);

        let bytes = serde_json::to_vec_pretty(&documents)?;
        self.write_bytes(collection, &bytes).await?;

        log::debug!("Inserted {} into {}", id, collection);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_insert_and_find() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path());

        let id = store
            .insert_one("Realtime", json!({"site": "ygosu", "title": "a"}))
            .await
            .unwrap();
        store
            .insert_one("Realtime", json!({"site": "theqoo", "title": "b"}))
            .await
            .unwrap();

        let found = store
            .find("Realtime", &json!({"site": "ygosu"}))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["_id"], id);
        assert!(tmp.path().join("Realtime.json").exists());
    }

    #[tokio::test]
    async fn test_find_missing_collection() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path());

        let found = store.find("Daily", &json!({})).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let tmp = TempDir::new().unwrap();
        JsonFileStore::new(tmp.path())
            .insert_one("Tag", json!({"name": "유머"}))
            .await
            .unwrap();

        let reopened = JsonFileStore::new(tmp.path());
        let found = reopened
            .find("Tag", &json!({"name": "유머"}))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_collection_is_store_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("GPT.json"), b"{not json").unwrap();
        let store = JsonFileStore::new(tmp.path());

        let err = store.find("GPT", &json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }
}
