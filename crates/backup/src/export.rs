use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use optivault_core::{CollectionName, Document, TenantId};
use optivault_store::DocumentStore;

use crate::artifact::CollectionData;
use crate::config::BackupConfig;
use crate::normalize;
use crate::retry::with_retry;

/// Field marking a document that only keeps an empty collection addressable.
pub const PLACEHOLDER_FIELD: &str = "_placeholder";

/// Whether a stored document is a placeholder rather than business data.
#[must_use]
pub fn is_placeholder(document: &Document) -> bool {
    document
        .get(PLACEHOLDER_FIELD)
        .and_then(optivault_core::Value::as_bool)
        .unwrap_or(false)
}

/// The encoded contents of one collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionExport {
    pub collection: CollectionName,
    pub documents: CollectionData,
    pub placeholders_skipped: usize,
    /// Set when the collection could not be listed and was exported empty.
    pub error: Option<String>,
}

/// Per-collection line of an [`ExportReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionExportStats {
    pub collection: CollectionName,
    pub documents: usize,
    pub placeholders_skipped: usize,
}

/// Lists one tenant collection and renders it in artifact form.
pub struct CollectionExporter {
    store: Arc<dyn DocumentStore>,
    config: BackupConfig,
}

impl CollectionExporter {
    pub fn new(store: Arc<dyn DocumentStore>, config: BackupConfig) -> Self {
        Self { store, config }
    }

    /// Export one collection.
    ///
    /// Never fails: if the listing still fails after retries, the
    /// collection is exported empty and the error is recorded on the result.
    pub async fn export(&self, tenant: &TenantId, collection: &CollectionName) -> CollectionExport {
        let listed = with_retry(&self.config, "list_documents", || {
            self.store.list_documents(tenant, collection)
        })
        .await;

        let documents = match listed {
            Ok(documents) => documents,
            Err(e) => {
                warn!(
                    tenant = %tenant,
                    collection = %collection,
                    error = %e,
                    "failed to list collection, exporting it empty"
                );
                return CollectionExport {
                    collection: collection.clone(),
                    error: Some(e.to_string()),
                    ..CollectionExport::default()
                };
            }
        };

        let mut export = CollectionExport {
            collection: collection.clone(),
            ..CollectionExport::default()
        };
        for (id, document) in documents {
            if is_placeholder(&document) {
                export.placeholders_skipped += 1;
                continue;
            }
            export
                .documents
                .insert(id, JsonValue::Object(normalize::encode_document(&document)));
        }

        debug!(
            collection = %collection,
            documents = export.documents.len(),
            placeholders = export.placeholders_skipped,
            "collection exported"
        );
        export
    }
}
