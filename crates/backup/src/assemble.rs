use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use tracing::{info, instrument};

use optivault_core::{CollectionName, CoreError, Principal};
use optivault_store::DocumentStore;

use crate::artifact::{Artifact, ArtifactMetadata};
use crate::config::BackupConfig;
use crate::error::BackupError;
use crate::export::{CollectionExportStats, CollectionExporter};
use crate::manifest::{FORMAT_VERSION, SECURITY_LEVEL, default_manifest};

/// Per-collection results of an assembled backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub collections: Vec<CollectionExportStats>,
    pub total_documents: usize,
    /// Collections that could not be listed and were exported empty.
    pub warnings: Vec<String>,
}

/// An artifact together with the report describing how it was produced.
#[derive(Debug, Clone)]
pub struct BackupOutput {
    pub artifact: Artifact,
    pub report: ExportReport,
}

/// Builds a complete artifact for one principal from the collection manifest.
pub struct BackupAssembler {
    exporter: CollectionExporter,
    manifest: Vec<CollectionName>,
    max_concurrent: usize,
}

impl BackupAssembler {
    /// Create an assembler over the default manifest.
    pub fn new(store: Arc<dyn DocumentStore>, config: BackupConfig) -> Self {
        let max_concurrent = config.max_concurrent_collections.max(1);
        Self {
            exporter: CollectionExporter::new(store, config),
            manifest: default_manifest(),
            max_concurrent,
        }
    }

    /// Replace the collection manifest.
    #[must_use]
    pub fn with_manifest(mut self, manifest: Vec<CollectionName>) -> Self {
        self.manifest = manifest;
        self
    }

    /// Export every manifest collection and assemble the artifact.
    ///
    /// All collections are exported before anything is assembled. A
    /// collection that cannot be listed is included empty and reported in
    /// [`ExportReport::warnings`].
    #[instrument(skip_all, fields(tenant = %principal.id))]
    pub async fn assemble(&self, principal: &Principal) -> Result<BackupOutput, BackupError> {
        if principal.id.is_blank() {
            return Err(BackupError::InvalidPrincipal(CoreError::InvalidIdentifier(
                "cannot back up without a principal id".into(),
            )));
        }
        let tenant = principal.tenant();

        let pending: Vec<_> = self
            .manifest
            .iter()
            .map(|collection| self.exporter.export(tenant, collection))
            .collect();
        let exports: Vec<_> = futures::stream::iter(pending)
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut collections = BTreeMap::new();
        let mut report = ExportReport::default();
        for export in exports {
            if let Some(error) = &export.error {
                report
                    .warnings
                    .push(format!("{} could not be read: {error}", export.collection));
            }
            report.total_documents += export.documents.len();
            report.collections.push(CollectionExportStats {
                collection: export.collection.clone(),
                documents: export.documents.len(),
                placeholders_skipped: export.placeholders_skipped,
            });
            collections.insert(export.collection, export.documents);
        }
        report
            .collections
            .sort_by_key(|stats| self.position(&stats.collection));
        report.warnings.sort();

        let metadata = ArtifactMetadata {
            owner_id: principal.id.to_string(),
            owner_email: principal.email.clone(),
            created_at: Some(Utc::now()),
            collections: self.manifest.clone(),
            total_documents: report.total_documents as u64,
            version: FORMAT_VERSION.to_owned(),
            security_level: SECURITY_LEVEL.to_owned(),
        };

        info!(
            documents = report.total_documents,
            collections = self.manifest.len(),
            warnings = report.warnings.len(),
            "backup assembled"
        );
        Ok(BackupOutput {
            artifact: Artifact {
                metadata,
                collections,
            },
            report,
        })
    }

    fn position(&self, collection: &CollectionName) -> usize {
        self.manifest
            .iter()
            .position(|c| c == collection)
            .unwrap_or(usize::MAX)
    }
}
