use async_trait::async_trait;

use optivault_core::{CollectionName, Document, DocumentId, TenantId};

use crate::error::StoreError;
use crate::key::DocumentKey;

/// Trait for the tenant-scoped document storage backend.
///
/// Implementations must guarantee that one tenant can never observe or write
/// another tenant's documents. Callers pass the tenant explicitly and perform
/// no filtering of their own.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every document in one tenant's collection, ordered by id.
    ///
    /// A collection that was never written is empty, not an error.
    async fn list_documents(
        &self,
        tenant: &TenantId,
        collection: &CollectionName,
    ) -> Result<Vec<(DocumentId, Document)>, StoreError>;

    /// Fetch one document. Returns `None` if it does not exist.
    async fn get_document(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError>;

    /// Write a document, merging into any existing one.
    ///
    /// Top-level fields present in `document` replace the stored ones; stored
    /// fields absent from `document` are left untouched. Creates the document
    /// if it does not exist.
    async fn merge_document(&self, key: &DocumentKey, document: &Document)
    -> Result<(), StoreError>;
}
