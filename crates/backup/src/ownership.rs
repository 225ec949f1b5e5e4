//! The restore admission gate.
//!
//! A backup may only be restored by the principal whose id is recorded as
//! its owner. The owner email is advisory: it can change, and historical
//! records do not guarantee it is unique, so it only ever produces warnings.

use serde::Serialize;

use optivault_core::Principal;

use crate::artifact::ArtifactMetadata;

/// Outcome of the ownership check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnershipCheck {
    pub valid: bool,
    /// Reasons for rejection. Non-empty whenever `valid` is false.
    pub errors: Vec<String>,
    /// Anomalies that do not block the restore.
    pub warnings: Vec<String>,
}

/// Decide whether `principal` may restore a backup described by `metadata`.
#[must_use]
pub fn validate_ownership(metadata: &ArtifactMetadata, principal: &Principal) -> OwnershipCheck {
    let mut check = OwnershipCheck::default();
    let owner = metadata.owner_id.as_str();

    if owner.trim().is_empty() {
        check
            .errors
            .push("backup has no owner id and cannot be restored into any account".into());
    }
    if principal.id.is_blank() {
        check
            .errors
            .push("restore was requested without an account id".into());
    }
    if check.errors.is_empty() && owner != principal.id.as_str() {
        check.errors.push(format!(
            "backup was created by account {owner}, not by the current account {}",
            principal.id
        ));
    }

    let backup_email = metadata.owner_email.trim();
    let current_email = principal.email.trim();
    if backup_email.is_empty() {
        check
            .warnings
            .push("backup does not record an owner email".into());
    } else if !current_email.is_empty() && !backup_email.eq_ignore_ascii_case(current_email) {
        check.warnings.push(format!(
            "backup was created under email {backup_email}, current email is {current_email}"
        ));
    }

    check.valid = check.errors.is_empty();
    check
}
