use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use optivault_core::{CollectionName, DocumentId, TenantId};
use optivault_store::{DocumentKey, DocumentStore};

use crate::artifact::CollectionData;
use crate::config::BackupConfig;
use crate::normalize;
use crate::progress::{ProgressTracker, Tally};
use crate::retry::with_retry;

/// Number of individual write failures kept per collection.
const MAX_REPORTED_FAILURES: usize = 10;

/// A document that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub id: DocumentId,
    pub error: String,
}

/// Result of importing one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionOutcome {
    pub collection: CollectionName,
    pub restored: usize,
    /// Bodies that were `null` or not objects.
    pub skipped: usize,
    pub errored: usize,
    /// Documents never written because the restore was cancelled.
    pub not_attempted: usize,
    /// The first few write failures, ordered by document id.
    pub failures: Vec<DocumentFailure>,
}

enum DocumentResult {
    Restored,
    Skipped,
    Failed(DocumentFailure),
    NotAttempted,
}

/// Writes one collection of an artifact into a tenant's storage space.
pub(crate) struct CollectionImporter {
    store: Arc<dyn DocumentStore>,
    config: BackupConfig,
}

impl CollectionImporter {
    pub fn new(store: Arc<dyn DocumentStore>, config: BackupConfig) -> Self {
        Self { store, config }
    }

    /// Import every document of `documents` under its original id.
    ///
    /// Writes merge into existing documents, so importing the same data
    /// twice yields the same end state. A failed write is counted and the
    /// remaining documents are still written. Once `cancel` fires no new
    /// writes are started; writes already in flight complete.
    pub(crate) async fn import(
        &self,
        tenant: &TenantId,
        collection: &CollectionName,
        documents: &CollectionData,
        cancel: &CancellationToken,
        progress: &ProgressTracker,
    ) -> CollectionOutcome {
        // Built up front so the stream does not hold a closure over borrowed arguments.
        let writes: Vec<_> = documents
            .iter()
            .map(|(id, body)| self.import_one(tenant, collection, id, body, cancel))
            .collect();
        let results: Vec<DocumentResult> = futures::stream::iter(writes)
            .buffer_unordered(self.config.max_concurrent_writes.max(1))
            .inspect(|result| match result {
                DocumentResult::Restored => progress.record(Tally::Restored),
                DocumentResult::Skipped => progress.record(Tally::Skipped),
                DocumentResult::Failed(_) => progress.record(Tally::Errored),
                DocumentResult::NotAttempted => {}
            })
            .collect()
            .await;

        let mut outcome = CollectionOutcome {
            collection: collection.clone(),
            ..CollectionOutcome::default()
        };
        for result in results {
            match result {
                DocumentResult::Restored => outcome.restored += 1,
                DocumentResult::Skipped => outcome.skipped += 1,
                DocumentResult::NotAttempted => outcome.not_attempted += 1,
                DocumentResult::Failed(failure) => {
                    outcome.errored += 1;
                    outcome.failures.push(failure);
                }
            }
        }
        outcome.failures.sort_by(|a, b| a.id.cmp(&b.id));
        outcome.failures.truncate(MAX_REPORTED_FAILURES);

        debug!(
            collection = %collection,
            restored = outcome.restored,
            skipped = outcome.skipped,
            errored = outcome.errored,
            not_attempted = outcome.not_attempted,
            "collection imported"
        );
        outcome
    }

    async fn import_one(
        &self,
        tenant: &TenantId,
        collection: &CollectionName,
        id: &DocumentId,
        body: &JsonValue,
        cancel: &CancellationToken,
    ) -> DocumentResult {
        if cancel.is_cancelled() {
            return DocumentResult::NotAttempted;
        }
        let JsonValue::Object(body) = body else {
            debug!(collection = %collection, id = %id, "skipping non-object document body");
            return DocumentResult::Skipped;
        };

        let document = normalize::decode_document(body);
        let key = DocumentKey::new(tenant.clone(), collection.clone(), id.clone());
        match with_retry(&self.config, "merge_document", || {
            self.store.merge_document(&key, &document)
        })
        .await
        {
            Ok(()) => DocumentResult::Restored,
            Err(e) => {
                warn!(
                    collection = %collection,
                    id = %id,
                    error = %e,
                    "failed to restore document"
                );
                DocumentResult::Failed(DocumentFailure {
                    id: id.clone(),
                    error: e.to_string(),
                })
            }
        }
    }
}
