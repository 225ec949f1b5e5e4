use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;

use optivault_core::CollectionName;

/// A point-in-time view of a running restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreProgress {
    /// Collection being imported when the event was emitted.
    pub collection: CollectionName,
    pub collections_done: usize,
    pub collections_total: usize,
    pub restored: u64,
    pub skipped: u64,
    pub errored: u64,
}

impl RestoreProgress {
    /// Documents processed so far across all collections.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.restored + self.skipped + self.errored
    }
}

/// How one document fared during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tally {
    Restored,
    Skipped,
    Errored,
}

/// Running totals for one restore, reported over an optional channel.
///
/// Events are emitted every `interval` processed documents and at each
/// collection boundary. Reporting is advisory: a closed receiver is ignored.
pub(crate) struct ProgressTracker {
    restored: AtomicU64,
    skipped: AtomicU64,
    errored: AtomicU64,
    interval: u64,
    collections_total: usize,
    collections_done: AtomicU64,
    current: Mutex<CollectionName>,
    sender: Option<mpsc::UnboundedSender<RestoreProgress>>,
}

impl ProgressTracker {
    pub(crate) fn new(
        interval: usize,
        collections_total: usize,
        sender: Option<mpsc::UnboundedSender<RestoreProgress>>,
    ) -> Self {
        Self {
            restored: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            errored: AtomicU64::new(0),
            interval: u64::try_from(interval.max(1)).unwrap_or(u64::MAX),
            collections_total,
            collections_done: AtomicU64::new(0),
            current: Mutex::new(CollectionName::default()),
            sender,
        }
    }

    pub(crate) fn start_collection(&self, collection: &CollectionName) {
        if let Ok(mut current) = self.current.lock() {
            current.clone_from(collection);
        }
    }

    pub(crate) fn record(&self, tally: Tally) {
        let counter = match tally {
            Tally::Restored => &self.restored,
            Tally::Skipped => &self.skipped,
            Tally::Errored => &self.errored,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if self.processed() % self.interval == 0 {
            self.emit();
        }
    }

    pub(crate) fn finish_collection(&self) {
        self.collections_done.fetch_add(1, Ordering::Relaxed);
        self.emit();
    }

    fn processed(&self) -> u64 {
        self.restored.load(Ordering::Relaxed)
            + self.skipped.load(Ordering::Relaxed)
            + self.errored.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self) -> RestoreProgress {
        let collection = self
            .current
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default();
        RestoreProgress {
            collection,
            collections_done: usize::try_from(self.collections_done.load(Ordering::Relaxed))
                .unwrap_or(usize::MAX),
            collections_total: self.collections_total,
            restored: self.restored.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
        }
    }

    fn emit(&self) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(self.snapshot());
        }
    }
}
