pub mod error;
pub mod key;
pub mod lock;
pub mod store;
pub mod testing;

pub use error::StoreError;
pub use key::{DocumentKey, restore_lock_name};
pub use lock::{LockGuard, TenantLock};
pub use store::DocumentStore;
