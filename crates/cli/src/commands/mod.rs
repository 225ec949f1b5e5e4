pub mod backup;
pub mod inspect;
pub mod restore;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use optivault_store_memory::MemoryDocumentStore;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How often a blocked process retries the dataset lock.
const LOCK_POLL: Duration = Duration::from_millis(100);

/// Open the dataset snapshot at `path`. A missing file is an empty dataset.
pub async fn load_store(path: &Path) -> anyhow::Result<MemoryDocumentStore> {
    match tokio::fs::read(path).await {
        Ok(bytes) => MemoryDocumentStore::from_json(&bytes)
            .with_context(|| format!("failed to load dataset {}", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "dataset not found, starting empty");
            Ok(MemoryDocumentStore::new())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read dataset {}", path.display())),
    }
}

/// Write the dataset back to `path` through a temporary sibling file.
pub async fn save_store(store: &MemoryDocumentStore, path: &Path) -> anyhow::Result<()> {
    let bytes = store.to_json()?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to replace dataset {}", path.display()))
}

/// Read a whole file, naming it in the error.
pub async fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Exclusive claim on a dataset, held as a `<dataset>.lock` file beside it.
///
/// Restores in one process are serialized per tenant by the in-memory lock;
/// this file serializes separate `optivault` processes writing the same
/// dataset. The file is removed on drop. A killed process leaves it behind
/// and it has to be deleted by hand.
#[derive(Debug)]
pub struct DatasetLock {
    path: PathBuf,
}

impl DatasetLock {
    /// Create the lock file, retrying until `timeout` while another process holds it.
    pub async fn acquire(dataset: &Path, timeout: Duration) -> anyhow::Result<Self> {
        let path = lock_path(dataset);
        let deadline = Instant::now() + timeout;
        loop {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => {
                    debug!(path = %path.display(), "dataset lock acquired");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        bail!(
                            "dataset {} is in use by another process; remove {} if none is running",
                            dataset.display(),
                            path.display()
                        );
                    }
                    tokio::time::sleep(LOCK_POLL).await;
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to create {}", path.display()));
                }
            }
        }
    }
}

impl Drop for DatasetLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove dataset lock");
        }
    }
}

fn lock_path(dataset: &Path) -> PathBuf {
    let mut name = dataset.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}
