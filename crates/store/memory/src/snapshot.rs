//! JSON persistence for the in-memory store.
//!
//! A snapshot file has the shape
//! `{ <tenant>: { <collection>: { <docId>: <document> } } }`, with instants
//! in their tagged form. The CLI uses it to run backup and restore against a
//! dataset kept on disk.

use std::collections::BTreeMap;

use optivault_core::{CollectionName, Document, DocumentId, TenantId};
use optivault_store::error::StoreError;

use crate::store::MemoryDocumentStore;

/// Full contents of a store, grouped by tenant and collection.
pub type Snapshot = BTreeMap<TenantId, BTreeMap<CollectionName, BTreeMap<DocumentId, Document>>>;

impl MemoryDocumentStore {
    /// Load a store from snapshot JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        let snapshot: Snapshot = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::Serialization(format!("invalid snapshot: {e}")))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Render the store as pretty-printed snapshot JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use optivault_core::Value;
    use optivault_store::{DocumentKey, DocumentStore};

    use super::*;

    #[tokio::test]
    async fn json_roundtrip_keeps_timestamps() {
        let store = MemoryDocumentStore::new();
        let mut doc = Document::new();
        doc.insert(
            "createdAt".into(),
            Value::Timestamp(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()),
        );
        store
            .merge_document(&DocumentKey::new("u1", "sales", "s1"), &doc)
            .await
            .unwrap();

        let bytes = store.to_json().unwrap();
        let back = MemoryDocumentStore::from_json(&bytes).unwrap();
        let got = back
            .get_document(&DocumentKey::new("u1", "sales", "s1"))
            .await
            .unwrap();
        assert_eq!(got, Some(doc));
    }

    #[test]
    fn empty_input_is_empty_store() {
        let store = MemoryDocumentStore::from_json(b"  \n").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_input_is_serialization_error() {
        let err = MemoryDocumentStore::from_json(b"[1,2").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
