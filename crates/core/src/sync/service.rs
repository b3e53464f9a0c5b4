//! Tenant-level sync orchestration: cursor lookup, reconciliation, cursor store

use std::sync::Arc;

use cadence_domain::{
    ReconcileJob, ReconcileOutcome, Result, SyncMode, TenantId, TenantSyncFailure,
};
use serde::Serialize;
use tracing::{error, info, instrument};

use super::ports::{SyncChannelRepository, TenantDirectory};
use super::reconciler::Reconciler;
use super::retry::RetryPolicy;

/// Result of syncing one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantSyncReport {
    pub tenant_id: TenantId,
    pub outcome: ReconcileOutcome,
    /// Whether the new cursor was written to a channel.
    pub cursor_stored: bool,
}

/// Result of syncing every active tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSyncReport {
    pub synced: Vec<TenantSyncReport>,
    pub failures: Vec<TenantSyncFailure>,
}

impl BatchSyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs reconciliation passes and keeps the cursor store current.
pub struct CalendarSyncService {
    reconciler: Arc<Reconciler>,
    channels: Arc<dyn SyncChannelRepository>,
    tenants: Arc<dyn TenantDirectory>,
    retry: RetryPolicy,
}

impl CalendarSyncService {
    pub fn new(
        reconciler: Arc<Reconciler>,
        channels: Arc<dyn SyncChannelRepository>,
        tenants: Arc<dyn TenantDirectory>,
    ) -> Self {
        Self { reconciler, channels, tenants, retry: RetryPolicy::default() }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Sync one tenant using its latest channel's cursor (or none for a full
    /// pass) and store the resulting cursor. No retries; used by manual
    /// actions that report failure directly.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn sync_tenant(&self, tenant_id: TenantId, mode: SyncMode) -> Result<TenantSyncReport> {
        let cursor = match mode {
            SyncMode::Full => None,
            SyncMode::Incremental => self
                .channels
                .latest_for_tenant(&tenant_id)
                .await?
                .and_then(|channel| channel.cursor().map(str::to_owned)),
        };

        let outcome = self.reconciler.reconcile(tenant_id, cursor.as_deref()).await?;
        let cursor_stored = self.store_cursor(tenant_id, &outcome).await?;
        Ok(TenantSyncReport { tenant_id, outcome, cursor_stored })
    }

    /// Execute a queued job with the cursor captured at enqueue time, retrying
    /// transient failures.
    #[instrument(skip(self, job), fields(tenant_id = %job.tenant_id, channel_id = ?job.channel_id))]
    pub async fn run_job(&self, job: &ReconcileJob) -> Result<TenantSyncReport> {
        let tenant_id = job.tenant_id;
        let cursor = job.cursor.as_deref();

        self.retry
            .run("reconcile_job", move || async move {
                let outcome = self.reconciler.reconcile(tenant_id, cursor).await?;
                let cursor_stored = self.store_cursor(tenant_id, &outcome).await?;
                Ok(TenantSyncReport { tenant_id, outcome, cursor_stored })
            })
            .await
    }

    /// Sync every active tenant. One tenant's failure is recorded and the
    /// batch continues.
    #[instrument(skip(self))]
    pub async fn sync_all(&self, mode: SyncMode) -> Result<BatchSyncReport> {
        let tenants = self.tenants.active_tenants().await?;
        let mut report = BatchSyncReport::default();

        for tenant in tenants {
            let tenant_id = tenant.id;
            match self.retry.run("sync_tenant", move || self.sync_tenant(tenant_id, mode)).await {
                Ok(synced) => report.synced.push(synced),
                Err(err) => {
                    error!(tenant_id = %tenant_id, error = %err, category = err.label(), "Tenant sync failed");
                    report.failures.push(TenantSyncFailure { tenant_id, error: err.to_string() });
                }
            }
        }

        info!(
            synced = report.synced.len(),
            failed = report.failures.len(),
            "Batch sync finished"
        );
        Ok(report)
    }

    /// Write the pass's cursor to the tenant's latest channel.
    ///
    /// The channel is looked up again after reconciliation so a renewal that
    /// replaced it in the meantime receives the cursor. A full pass that
    /// produced no cursor clears the stored one.
    async fn store_cursor(&self, tenant_id: TenantId, outcome: &ReconcileOutcome) -> Result<bool> {
        let Some(channel) = self.channels.latest_for_tenant(&tenant_id).await? else {
            return Ok(false);
        };

        match outcome.next_cursor.as_deref() {
            Some(cursor) => {
                self.channels.update_cursor(&channel.id, Some(cursor)).await?;
                Ok(true)
            }
            None if outcome.full_resync => {
                self.channels.update_cursor(&channel.id, None).await?;
                Ok(false)
            }
            None => Ok(false),
        }
    }
}
