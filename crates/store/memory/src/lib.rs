mod lock;
mod snapshot;
mod store;

pub use lock::{MemoryLockGuard, MemoryTenantLock};
pub use snapshot::Snapshot;
pub use store::MemoryDocumentStore;
