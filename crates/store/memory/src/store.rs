use async_trait::async_trait;
use dashmap::DashMap;

use optivault_core::{CollectionName, Document, DocumentId, TenantId};
use optivault_store::error::StoreError;
use optivault_store::key::DocumentKey;
use optivault_store::store::DocumentStore;

use crate::snapshot::Snapshot;

/// In-memory [`DocumentStore`] backed by a [`DashMap`].
///
/// Documents are keyed by the structured [`DocumentKey`], so tenant,
/// collection and id never share a namespace whatever characters they
/// contain. Listing scans the map and filters by tenant and collection, so it
/// is linear in the total number of stored documents.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    data: DashMap<DocumentKey, Document>,
}

impl MemoryDocumentStore {
    /// Create a new, empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated from a snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        for (tenant, collections) in snapshot {
            for (collection, documents) in collections {
                for (id, document) in documents {
                    let key = DocumentKey {
                        tenant: tenant.clone(),
                        collection: collection.clone(),
                        id,
                    };
                    store.data.insert(key, document);
                }
            }
        }
        store
    }

    /// Capture the full contents of the store.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for entry in &self.data {
            let key = entry.key();
            snapshot
                .entry(key.tenant.clone())
                .or_default()
                .entry(key.collection.clone())
                .or_default()
                .insert(key.id.clone(), entry.value().clone());
        }
        snapshot
    }

    /// Number of stored documents across all tenants.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_documents(
        &self,
        tenant: &TenantId,
        collection: &CollectionName,
    ) -> Result<Vec<(DocumentId, Document)>, StoreError> {
        let mut docs: Vec<(DocumentId, Document)> = self
            .data
            .iter()
            .filter(|entry| entry.key().is_in(tenant, collection))
            .map(|entry| (entry.key().id.clone(), entry.value().clone()))
            .collect();
        docs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(docs)
    }

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError> {
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    async fn merge_document(
        &self,
        key: &DocumentKey,
        document: &Document,
    ) -> Result<(), StoreError> {
        self.data
            .entry(key.clone())
            .and_modify(|stored| {
                for (field, value) in document {
                    stored.insert(field.clone(), value.clone());
                }
            })
            .or_insert_with(|| document.clone());

        Ok(())
    }
}
