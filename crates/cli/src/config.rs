use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use optivault_backup::{BackupConfig, RetryStrategy};
use serde::Deserialize;

/// Top-level CLI configuration, loaded from a TOML file.
///
/// # Example
///
/// ```toml
/// [store]
/// path = "/var/lib/optivault/data.json"
///
/// [backup]
/// max_retries = 3
/// store_timeout_seconds = 10
/// max_concurrent_writes = 8
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    /// Retry, concurrency and locking settings.
    #[serde(default)]
    pub backup: BackupSection,
    /// Dataset location.
    #[serde(default)]
    pub store: StoreSection,
}

/// `[backup]` table. Unset fields keep the library defaults.
#[derive(Debug, Default, Deserialize)]
pub struct BackupSection {
    /// Maximum retries for a transient store failure.
    pub max_retries: Option<u32>,
    /// Per-call store timeout in seconds.
    pub store_timeout_seconds: Option<u64>,
    /// Delay before the first retry, in milliseconds.
    pub retry_base_ms: Option<u64>,
    /// Upper bound on the retry delay, in milliseconds.
    pub retry_max_ms: Option<u64>,
    /// Collections exported concurrently.
    pub max_concurrent_collections: Option<usize>,
    /// Documents written concurrently within one collection.
    pub max_concurrent_writes: Option<usize>,
    /// Report restore progress every this many documents.
    pub progress_interval: Option<usize>,
    /// Tenant restore lock TTL in seconds.
    pub lock_ttl_seconds: Option<u64>,
    /// How long to wait for another restore of the same account, in seconds.
    pub lock_timeout_seconds: Option<u64>,
}

/// `[store]` table.
#[derive(Debug, Default, Deserialize)]
pub struct StoreSection {
    /// JSON snapshot file holding the dataset.
    pub path: Option<PathBuf>,
}

impl CliConfig {
    /// Load the configuration file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Merge the `[backup]` table over [`BackupConfig::default`].
    pub fn backup_config(&self) -> BackupConfig {
        let section = &self.backup;
        let defaults = BackupConfig::default();

        let retry_strategy = match (
            &defaults.retry_strategy,
            section.retry_base_ms,
            section.retry_max_ms,
        ) {
            (_, None, None) => defaults.retry_strategy.clone(),
            (
                RetryStrategy::Exponential {
                    base,
                    max,
                    multiplier,
                    jitter,
                },
                base_ms,
                max_ms,
            ) => RetryStrategy::Exponential {
                base: base_ms.map_or(*base, Duration::from_millis),
                max: max_ms.map_or(*max, Duration::from_millis),
                multiplier: *multiplier,
                jitter: *jitter,
            },
            (RetryStrategy::Constant { delay }, base_ms, _) => RetryStrategy::Constant {
                delay: base_ms.map_or(*delay, Duration::from_millis),
            },
        };

        BackupConfig {
            max_retries: section.max_retries.unwrap_or(defaults.max_retries),
            retry_strategy,
            store_timeout: section
                .store_timeout_seconds
                .map_or(defaults.store_timeout, Duration::from_secs),
            max_concurrent_collections: section
                .max_concurrent_collections
                .unwrap_or(defaults.max_concurrent_collections),
            max_concurrent_writes: section
                .max_concurrent_writes
                .unwrap_or(defaults.max_concurrent_writes),
            progress_interval: section
                .progress_interval
                .unwrap_or(defaults.progress_interval),
            lock_ttl: section
                .lock_ttl_seconds
                .map_or(defaults.lock_ttl, Duration::from_secs),
            lock_timeout: section
                .lock_timeout_seconds
                .map_or(defaults.lock_timeout, Duration::from_secs),
        }
    }
}
