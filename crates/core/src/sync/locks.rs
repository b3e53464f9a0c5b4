//! Per-tenant mutual exclusion for reconciliation

use std::sync::Arc;

use cadence_domain::TenantId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutex. Holders for the same tenant run one at a time; other
/// tenants proceed in parallel.
#[derive(Debug, Default, Clone)]
pub struct TenantLocks {
    locks: Arc<DashMap<TenantId, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the tenant.
    pub async fn acquire(&self, tenant_id: TenantId) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(tenant_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
        lock.lock_owned().await
    }

    /// Whether someone currently holds the tenant's lock.
    pub fn is_locked(&self, tenant_id: &TenantId) -> bool {
        self.locks.get(tenant_id).is_some_and(|lock| lock.try_lock().is_err())
    }
}
