use std::time::Duration;

use crate::retry::RetryStrategy;

/// Tuning for backup and restore runs.
///
/// Controls retry behaviour for store calls, fan-out limits and the
/// tenant restore lock.
///
/// # Examples
///
/// ```
/// use optivault_backup::BackupConfig;
///
/// let config = BackupConfig::default();
/// assert_eq!(config.max_retries, 2);
/// assert_eq!(config.max_concurrent_collections, 4);
/// ```
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Maximum number of retries for a transient store failure.
    pub max_retries: u32,
    /// Strategy used to compute the delay between retries.
    pub retry_strategy: RetryStrategy,
    /// Maximum wall-clock time allowed for a single store call.
    pub store_timeout: Duration,
    /// How many collections are exported concurrently.
    pub max_concurrent_collections: usize,
    /// How many documents of one collection are written concurrently.
    pub max_concurrent_writes: usize,
    /// Emit a progress event every this many processed documents.
    pub progress_interval: usize,
    /// TTL of the tenant restore lock; extended after every collection.
    pub lock_ttl: Duration,
    /// How long a restore waits for another restore of the same tenant.
    pub lock_timeout: Duration,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_strategy: RetryStrategy::default(),
            store_timeout: Duration::from_secs(30),
            max_concurrent_collections: 4,
            max_concurrent_writes: 16,
            progress_interval: 50,
            lock_ttl: Duration::from_secs(300),
            lock_timeout: Duration::from_secs(10),
        }
    }
}
