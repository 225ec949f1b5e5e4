use thiserror::Error;

use optivault_core::{CoreError, TenantId};
use optivault_store::StoreError;

/// Errors that prevent a backup artifact from being produced.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The principal has no usable id, so the artifact would have no owner.
    #[error("invalid principal: {0}")]
    InvalidPrincipal(#[from] CoreError),

    #[error("failed to serialize backup: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that stop a restore before any document is written.
///
/// Per-document write failures are not errors at this level; they are
/// counted in the restore summary.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("invalid backup format: {0}")]
    Parse(String),

    #[error(
        "this backup belongs to {backup_owner} and cannot be restored by {requester}: {}",
        errors.join("; ")
    )]
    Ownership {
        backup_owner: String,
        requester: String,
        errors: Vec<String>,
    },

    #[error("another restore is already running for tenant {tenant}")]
    Busy { tenant: TenantId },

    #[error("restore lock failure: {0}")]
    Lock(StoreError),
}
