use std::time::Duration;

use async_trait::async_trait;

use optivault_core::TenantId;

use crate::error::StoreError;

/// Exclusive right to restore into one tenant, valid until its lease runs out.
///
/// The holder keeps the lease alive with [`LockGuard::extend`]. Once a lease
/// has expired another restore may take the tenant, and `extend` on the stale
/// guard fails with [`StoreError::LockExpired`]. Dropping a guard without
/// calling [`LockGuard::release`] leaves the tenant locked until expiry.
#[async_trait]
pub trait LockGuard: Send + Sync {
    /// Push the lease expiry to `ttl` from now.
    async fn extend(&self, ttl: Duration) -> Result<(), StoreError>;

    /// Give the tenant up so a waiting restore can proceed.
    async fn release(self: Box<Self>) -> Result<(), StoreError>;
}

/// Serializes restores that target the same tenant.
#[async_trait]
pub trait TenantLock: Send + Sync {
    /// Lease `tenant` for `ttl`, waiting up to `timeout` for the current
    /// holder to release it or let it expire.
    ///
    /// Returns [`StoreError::Timeout`] if the tenant is still leased when the
    /// timeout elapses.
    async fn acquire(
        &self,
        tenant: &TenantId,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Box<dyn LockGuard>, StoreError>;
}
