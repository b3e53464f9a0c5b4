//! Port interfaces for sync operations

use async_trait::async_trait;
use cadence_domain::{ReconcileJob, Result, SyncChannel, Tenant, TenantId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence for push channels and their change cursors.
#[async_trait]
pub trait SyncChannelRepository: Send + Sync {
    /// Store a newly registered channel.
    async fn insert(&self, channel: &SyncChannel) -> Result<()>;

    /// Look up a channel by the provider-facing channel id.
    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<SyncChannel>>;

    /// Most recently created channel of the tenant. Owns the cursor.
    async fn latest_for_tenant(&self, tenant_id: &TenantId) -> Result<Option<SyncChannel>>;

    /// All channels of the tenant, newest first.
    async fn list_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<SyncChannel>>;

    /// Channels expiring at or before `deadline`.
    async fn list_expiring_before(&self, deadline: DateTime<Utc>) -> Result<Vec<SyncChannel>>;

    /// Replace the stored cursor. `None` clears it.
    async fn update_cursor(&self, id: &Uuid, cursor: Option<&str>) -> Result<()>;

    /// Delete a channel record. Returns whether a row was removed.
    async fn delete(&self, id: &Uuid) -> Result<bool>;
}

/// Source of the tenants that take part in synchronization.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn active_tenants(&self) -> Result<Vec<Tenant>>;
}

/// Non-blocking hand-off of reconciliation work.
pub trait SyncJobQueue: Send + Sync {
    /// Queue a job and return immediately.
    ///
    /// # Errors
    /// Fails only when the queue no longer accepts work (shut down).
    fn enqueue(&self, job: ReconcileJob) -> Result<()>;
}
