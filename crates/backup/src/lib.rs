//! Tenant-scoped backup and restore.
//!
//! [`BackupAssembler`] exports every manifest collection of one tenant into
//! an [`Artifact`]. [`RestoreOrchestrator`] reads an artifact back, admits it
//! only for the principal that produced it, and merges its documents into
//! the tenant's store, counting failures per document instead of aborting.

pub mod artifact;
pub mod assemble;
pub mod config;
pub mod error;
pub mod export;
mod import;
pub mod manifest;
pub mod normalize;
pub mod ownership;
mod progress;
pub mod restore;
mod retry;

pub use artifact::{Artifact, ArtifactMetadata, ArtifactPreview, default_file_name, inspect};
pub use assemble::{BackupAssembler, BackupOutput, ExportReport};
pub use config::BackupConfig;
pub use error::{BackupError, RestoreError};
pub use export::{CollectionExport, CollectionExporter};
pub use import::{CollectionOutcome, DocumentFailure};
pub use ownership::{OwnershipCheck, validate_ownership};
pub use progress::RestoreProgress;
pub use restore::{RestoreControl, RestoreOrchestrator, RestoreState, RestoreSummary};
pub use retry::RetryStrategy;
