use serde::{Deserialize, Serialize};

use optivault_core::{CollectionName, DocumentId, TenantId};

/// Address of one document in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    pub tenant: TenantId,
    pub collection: CollectionName,
    pub id: DocumentId,
}

impl DocumentKey {
    /// Create a new document key.
    #[must_use]
    pub fn new(
        tenant: impl Into<TenantId>,
        collection: impl Into<CollectionName>,
        id: impl Into<DocumentId>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Render as `tenant:collection:id` for logs. Not unique when a part
    /// contains `:`, so never use it as a storage key.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}:{}:{}", self.tenant, self.collection, self.id)
    }

    /// Whether this key lives in the given tenant's collection.
    #[must_use]
    pub fn is_in(&self, tenant: &TenantId, collection: &CollectionName) -> bool {
        &self.tenant == tenant && &self.collection == collection
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Name of the lock that serializes restores into one tenant.
#[must_use]
pub fn restore_lock_name(tenant: &TenantId) -> String {
    format!("restore:{tenant}")
}
