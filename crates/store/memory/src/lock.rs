use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use optivault_core::TenantId;
use optivault_store::error::StoreError;
use optivault_store::key::restore_lock_name;
use optivault_store::lock::{LockGuard, TenantLock};

/// The restore currently holding a tenant.
#[derive(Debug, Clone, Copy)]
struct Lease {
    holder: Uuid,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Leases {
    by_tenant: DashMap<TenantId, Lease>,
    /// Woken whenever a tenant is released.
    released: Notify,
}

/// In-process [`TenantLock`].
///
/// Waiters sleep until the holder releases the tenant or its lease runs
/// out, whichever comes first. Leases only exist inside this value and its
/// clones, so separate processes are not serialized against each other.
#[derive(Debug, Clone, Default)]
pub struct MemoryTenantLock {
    leases: Arc<Leases>,
}

impl MemoryTenantLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a restore currently holds an unexpired lease on `tenant`.
    pub fn is_locked(&self, tenant: &TenantId) -> bool {
        self.leases
            .by_tenant
            .get(tenant)
            .is_some_and(|lease| lease.expires_at > Instant::now())
    }

    /// Take the lease, or report when the current one expires.
    fn try_lease(&self, tenant: &TenantId, ttl: Duration) -> Result<MemoryLockGuard, Instant> {
        let now = Instant::now();
        let lease = Lease {
            holder: Uuid::new_v4(),
            expires_at: now + ttl,
        };
        match self.leases.by_tenant.entry(tenant.clone()) {
            Entry::Occupied(current) if current.get().expires_at > now => {
                return Err(current.get().expires_at);
            }
            Entry::Occupied(mut stale) => {
                tracing::debug!(tenant = %tenant, "taking over expired restore lease");
                stale.insert(lease);
            }
            Entry::Vacant(free) => {
                free.insert(lease);
            }
        }
        Ok(MemoryLockGuard {
            leases: Arc::clone(&self.leases),
            tenant: tenant.clone(),
            holder: lease.holder,
        })
    }
}

#[async_trait]
impl TenantLock for MemoryTenantLock {
    async fn acquire(
        &self,
        tenant: &TenantId,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Box<dyn LockGuard>, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before looking, so a release in between is not missed.
            let released = self.leases.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            let expires_at = match self.try_lease(tenant, ttl) {
                Ok(guard) => return Ok(Box::new(guard)),
                Err(expires_at) => expires_at,
            };
            if Instant::now() >= deadline {
                return Err(StoreError::Timeout(timeout));
            }
            let _ = tokio::time::timeout_at(expires_at.min(deadline), released).await;
        }
    }
}

/// Lease on one tenant handed out by [`MemoryTenantLock`].
#[derive(Debug)]
pub struct MemoryLockGuard {
    leases: Arc<Leases>,
    tenant: TenantId,
    holder: Uuid,
}

#[async_trait]
impl LockGuard for MemoryLockGuard {
    async fn extend(&self, ttl: Duration) -> Result<(), StoreError> {
        let lost = || StoreError::LockExpired(restore_lock_name(&self.tenant));
        let mut lease = self.leases.by_tenant.get_mut(&self.tenant).ok_or_else(lost)?;
        if lease.holder != self.holder || lease.expires_at <= Instant::now() {
            return Err(lost());
        }
        lease.expires_at = Instant::now() + ttl;
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        let removed = self
            .leases
            .by_tenant
            .remove_if(&self.tenant, |_, lease| lease.holder == self.holder);
        if removed.is_some() {
            self.leases.released.notify_waiters();
        }
        Ok(())
    }
}
