//! Document store abstractions for post persistence.
//!
//! The pipeline only ever issues two operations against a store:
//! `find(collection, filter)` and `insert_one(collection, document)`.
//! Filters are JSON objects whose fields must all equal the document's.
//!
//! ## Collections
//!
//! ```text
//! Realtime   # real-time best posts
//! Daily      # daily best posts
//! GPT        # enrichment records (answer + tags)
//! Tag        # tag registry
//! ```
//!
//! There is no unique index: callers check for existence before inserting.

pub mod local;
pub mod memory;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

// Re-export for convenience
pub use local::JsonFileStore;
pub use memory::MemoryStore;

/// Collection holding enrichment records.
pub const ENRICHMENT_COLLECTION: &str = "GPT";

/// Collection holding known tags.
pub const TAG_COLLECTION: &str = "Tag";

/// Field carrying a document's generated identifier.
pub const ID_FIELD: &str = "_id";

/// Trait for document store backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return every document of `collection` matching `filter`.
    async fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>>;

    /// Insert a document and return its generated identifier.
    async fn insert_one(&self, collection: &str, document: Value) -> Result<String>;
}

/// Check whether every field of `filter` equals the same field of `document`.
pub fn matches(document: &Value, filter: &Value) -> bool {
    match (document, filter) {
        (Value::Object(doc), Value::Object(fields)) => fields
            .iter()
            .all(|(key, expected)| doc.get(key) == Some(expected)),
        (_, Value::Null) => true,
        _ => false,
    }
}

/// Read the identifier of a stored document.
pub fn document_id(document: &Value) -> Option<String> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Generates 24-hex-digit document identifiers.
#[derive(Debug, Default)]
pub struct IdGenerator {
    sequence: AtomicU64,
}

impl IdGenerator {
    pub fn next(&self, collection: &str, document: &Value) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(collection.as_bytes());
        hasher.update(sequence.to_be_bytes());
        hasher.update(nanos.to_be_bytes());
        hasher.update(document.to_string().as_bytes());

        let mut id = hex::encode(hasher.finalize());
        id.truncate(24);
        id
    }
}

/// Attach a freshly generated id to a document object.
pub(crate) fn with_id(ids: &IdGenerator, collection: &str, document: Value) -> Result<(String, Value)> {
    let Value::Object(mut fields) = document else {
        return Err(AppError::store(format!(
            "Document for {collection} is not a JSON object"
        )));
    };

    let id = ids.next(collection, &Value::Object(fields.clone()));
    fields.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    Ok((id, Value::Object(fields)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_nested_objects_exactly() {
        let doc = json!({"site": "dcinside", "board_id": {"category": "dcbest", "no": 1}});

        assert!(matches(&doc, &json!({"site": "dcinside"})));
        assert!(matches(
            &doc,
            &json!({"site": "dcinside", "board_id": {"category": "dcbest", "no": 1}})
        ));
        assert!(!matches(
            &doc,
            &json!({"board_id": {"category": "dcbest", "no": 2}})
        ));
        assert!(!matches(&doc, &json!({"missing": 1})));
    }

    #[test]
    fn ids_are_unique_and_hex() {
        let ids = IdGenerator::default();
        let a = ids.next("Realtime", &json!({"x": 1}));
        let b = ids.next("Realtime", &json!({"x": 1}));

        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn with_id_rejects_non_objects() {
        let ids = IdGenerator::default();
        assert!(with_id(&ids, "Tag", json!([1, 2])).is_err());

        let (id, doc) = with_id(&ids, "Tag", json!({"name": "IT"})).unwrap();
        assert_eq!(document_id(&doc), Some(id));
    }
}
