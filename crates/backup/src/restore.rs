use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use optivault_core::{Principal, TenantId};
use optivault_store::{DocumentStore, LockGuard, StoreError, TenantLock};

use crate::artifact::{Artifact, ArtifactMetadata, CollectionData};
use crate::config::BackupConfig;
use crate::error::RestoreError;
use crate::import::{CollectionImporter, CollectionOutcome};
use crate::ownership::validate_ownership;
use crate::progress::{ProgressTracker, RestoreProgress};

/// Shortest interval between lock extensions.
const MIN_HEARTBEAT: Duration = Duration::from_millis(10);

/// Lifecycle of one restore attempt.
///
/// `Parsed` is entered when the artifact is received and left for
/// `ParseFailed` if its structure is invalid. `Validated` is where the
/// ownership check runs.
///
/// ```text
/// Parsed -> Validated -> Restoring -> Completed
///   |           |
///   v           v
/// ParseFailed  Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RestoreState {
    Parsed,
    Validated,
    Restoring,
    Completed,
    Rejected,
    ParseFailed,
}

impl RestoreState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::ParseFailed)
    }

    /// Check if moving from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Parsed, Self::Validated | Self::ParseFailed)
                | (Self::Validated, Self::Restoring | Self::Rejected)
                | (Self::Restoring, Self::Completed)
        )
    }
}

/// Ordered record of the states a restore went through.
#[derive(Debug, Default)]
struct StateLog {
    states: Vec<RestoreState>,
}

impl StateLog {
    fn enter(&mut self, next: RestoreState) {
        match self.states.last() {
            Some(current) => debug_assert!(
                current.can_transition_to(next),
                "invalid restore transition {current:?} -> {next:?}"
            ),
            None => debug_assert_eq!(next, RestoreState::Parsed, "restore must start parsed"),
        }
        debug!(state = ?next, "restore state");
        self.states.push(next);
    }
}

/// Caller-side controls for a running restore.
#[derive(Debug, Clone, Default)]
pub struct RestoreControl {
    /// Cancelling stops new writes; in-flight writes complete.
    pub cancel: CancellationToken,
    /// Receives progress events when set.
    pub progress: Option<mpsc::UnboundedSender<RestoreProgress>>,
}

impl RestoreControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<RestoreProgress>) -> Self {
        self.progress = Some(sender);
        self
    }
}

/// Final counts of a completed restore.
///
/// A restore completes even when some documents failed; check
/// [`RestoreSummary::errored`] before declaring success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub restored: usize,
    pub skipped: usize,
    pub errored: usize,
    pub not_attempted: usize,
    /// Whether the restore was cancelled before every document was written.
    pub cancelled: bool,
    /// Whether the tenant lock expired mid-restore, stopping further writes.
    pub lock_lost: bool,
    pub collections: Vec<CollectionOutcome>,
    /// Non-blocking ownership anomalies.
    pub warnings: Vec<String>,
    pub states: Vec<RestoreState>,
}

impl RestoreSummary {
    fn add(&mut self, outcome: CollectionOutcome) {
        self.restored += outcome.restored;
        self.skipped += outcome.skipped;
        self.errored += outcome.errored;
        self.not_attempted += outcome.not_attempted;
        self.collections.push(outcome);
    }

    /// Every document was either written or deliberately skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errored == 0 && self.not_attempted == 0 && !self.cancelled && !self.lock_lost
    }
}

/// Drives a restore from artifact bytes to a written tenant data space.
///
/// The ownership check always runs before the first write. When a
/// [`TenantLock`] is configured, restores into the same tenant are
/// serialized.
pub struct RestoreOrchestrator {
    importer: CollectionImporter,
    lock: Option<Arc<dyn TenantLock>>,
    config: BackupConfig,
}

impl RestoreOrchestrator {
    pub fn new(store: Arc<dyn DocumentStore>, config: BackupConfig) -> Self {
        Self {
            importer: CollectionImporter::new(store, config.clone()),
            lock: None,
            config,
        }
    }

    /// Serialize restores per tenant through `lock`.
    #[must_use]
    pub fn with_lock(mut self, lock: Arc<dyn TenantLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Parse `bytes` as an artifact and restore it for `principal`.
    #[instrument(skip_all, fields(tenant = %principal.id))]
    pub async fn restore(
        &self,
        bytes: &[u8],
        principal: &Principal,
        control: &RestoreControl,
    ) -> Result<RestoreSummary, RestoreError> {
        let mut log = StateLog::default();
        log.enter(RestoreState::Parsed);
        let artifact = match Artifact::parse(bytes) {
            Ok(artifact) => artifact,
            Err(e) => {
                log.enter(RestoreState::ParseFailed);
                warn!(error = %e, "backup could not be parsed");
                return Err(e);
            }
        };
        self.run(&artifact, principal, control, log).await
    }

    /// Restore an artifact that is already in memory.
    #[instrument(skip_all, fields(tenant = %principal.id))]
    pub async fn restore_artifact(
        &self,
        artifact: &Artifact,
        principal: &Principal,
        control: &RestoreControl,
    ) -> Result<RestoreSummary, RestoreError> {
        let mut log = StateLog::default();
        log.enter(RestoreState::Parsed);
        self.run(artifact, principal, control, log).await
    }

    async fn run(
        &self,
        artifact: &Artifact,
        principal: &Principal,
        control: &RestoreControl,
        mut log: StateLog,
    ) -> Result<RestoreSummary, RestoreError> {
        log.enter(RestoreState::Validated);
        let check = validate_ownership(&artifact.metadata, principal);
        if !check.valid {
            log.enter(RestoreState::Rejected);
            warn!(errors = ?check.errors, "restore rejected by ownership check");
            return Err(RestoreError::Ownership {
                backup_owner: describe_owner(&artifact.metadata),
                requester: principal.to_string(),
                errors: check.errors,
            });
        }
        for warning in &check.warnings {
            warn!(warning = %warning, "ownership check warning");
        }

        let tenant = principal.tenant();
        let guard = match &self.lock {
            Some(lock) => Some(self.acquire_lock(lock.as_ref(), tenant).await?),
            None => None,
        };

        log.enter(RestoreState::Restoring);
        let tracker = ProgressTracker::new(
            self.config.progress_interval,
            artifact.metadata.collections.len(),
            control.progress.clone(),
        );
        // Stopped by the caller or by losing the tenant lock.
        let writes = control.cancel.child_token();
        let (mut summary, lock_lost) = match guard {
            Some(guard) => {
                let imported = CancellationToken::new();
                let (summary, lock_lost) = tokio::join!(
                    async {
                        let summary = self
                            .import_collections(artifact, tenant, &writes, &tracker)
                            .await;
                        imported.cancel();
                        summary
                    },
                    self.hold_lock(guard.as_ref(), &imported, &writes),
                );
                if let Err(e) = guard.release().await {
                    warn!(error = %e, "failed to release restore lock");
                }
                (summary, lock_lost)
            }
            None => (
                self.import_collections(artifact, tenant, &writes, &tracker)
                    .await,
                false,
            ),
        };
        summary.warnings = check.warnings;
        summary.cancelled = control.cancel.is_cancelled();
        summary.lock_lost = lock_lost;
        if lock_lost {
            summary.warnings.push(format!(
                "restore lock for tenant {tenant} was lost; {} documents were not written",
                summary.not_attempted
            ));
        }

        log.enter(RestoreState::Completed);
        summary.states = log.states;
        info!(
            restored = summary.restored,
            skipped = summary.skipped,
            errored = summary.errored,
            not_attempted = summary.not_attempted,
            cancelled = summary.cancelled,
            lock_lost = summary.lock_lost,
            "restore completed"
        );
        Ok(summary)
    }

    /// Import each listed collection once, in manifest order.
    async fn import_collections(
        &self,
        artifact: &Artifact,
        tenant: &TenantId,
        writes: &CancellationToken,
        tracker: &ProgressTracker,
    ) -> RestoreSummary {
        let mut summary = RestoreSummary::default();
        let empty = CollectionData::new();
        let mut seen = BTreeSet::new();

        for name in &artifact.metadata.collections {
            if !seen.insert(name) {
                continue;
            }
            let documents = artifact.collection(name).unwrap_or(&empty);
            if writes.is_cancelled() {
                summary.add(CollectionOutcome {
                    collection: name.clone(),
                    not_attempted: documents.len(),
                    ..CollectionOutcome::default()
                });
                continue;
            }

            tracker.start_collection(name);
            let outcome = self
                .importer
                .import(tenant, name, documents, writes, tracker)
                .await;
            tracker.finish_collection();
            summary.add(outcome);
        }
        summary
    }

    /// Keep the tenant lease alive until `imported` fires.
    ///
    /// Extends every third of the lease. If an extension fails the lease may
    /// already belong to another restore, so `writes` is cancelled and `true`
    /// is returned.
    async fn hold_lock(
        &self,
        guard: &dyn LockGuard,
        imported: &CancellationToken,
        writes: &CancellationToken,
    ) -> bool {
        let period = (self.config.lock_ttl / 3).max(MIN_HEARTBEAT);
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                () = imported.cancelled() => return false,
                _ = heartbeat.tick() => {
                    if let Err(e) = guard.extend(self.config.lock_ttl).await {
                        warn!(error = %e, "restore lock lost, stopping writes");
                        writes.cancel();
                        return true;
                    }
                    debug!("restore lock extended");
                }
            }
        }
    }

    async fn acquire_lock(
        &self,
        lock: &dyn TenantLock,
        tenant: &TenantId,
    ) -> Result<Box<dyn LockGuard>, RestoreError> {
        match lock
            .acquire(tenant, self.config.lock_ttl, self.config.lock_timeout)
            .await
        {
            Ok(guard) => Ok(guard),
            Err(StoreError::Timeout(_)) => {
                warn!("another restore holds the tenant lock");
                Err(RestoreError::Busy {
                    tenant: tenant.clone(),
                })
            }
            Err(e) => Err(RestoreError::Lock(e)),
        }
    }
}

fn describe_owner(metadata: &ArtifactMetadata) -> String {
    match (metadata.owner_id.trim(), metadata.owner_email.trim()) {
        ("", _) => "an unknown account".to_owned(),
        (id, "") => id.to_owned(),
        (id, email) => format!("{id} <{email}>"),
    }
}
