//! Push channel registration, renewal and cancellation

use std::sync::Arc;

use cadence_domain::constants::DEFAULT_RENEWAL_LEAD_HOURS;
use cadence_domain::{
    CadenceError, ReconcileOutcome, RenewalReport, Result, SyncChannel, TenantId,
    TenantSyncFailure,
};
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, instrument, warn};

use super::ports::SyncChannelRepository;
use super::reconciler::Reconciler;
use super::retry::RetryPolicy;
use crate::calendar_ports::CalendarProvider;

/// A freshly registered channel and the initial full reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRegistration {
    pub channel: SyncChannel,
    pub outcome: ReconcileOutcome,
}

/// Outcome of unregistering several tenants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnregisterReport {
    pub removed: usize,
    pub failures: Vec<TenantSyncFailure>,
}

impl UnregisterReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Keeps every tenant's push channel alive.
pub struct ChannelLifecycleManager {
    provider: Arc<dyn CalendarProvider>,
    channels: Arc<dyn SyncChannelRepository>,
    reconciler: Arc<Reconciler>,
    webhook_url: Option<String>,
    renewal_lead: Duration,
    retry: RetryPolicy,
}

impl ChannelLifecycleManager {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        channels: Arc<dyn SyncChannelRepository>,
        reconciler: Arc<Reconciler>,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            provider,
            channels,
            reconciler,
            webhook_url,
            renewal_lead: Duration::hours(DEFAULT_RENEWAL_LEAD_HOURS),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_renewal_lead(mut self, lead: Duration) -> Self {
        self.renewal_lead = lead;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn webhook_url(&self) -> Result<&str> {
        self.webhook_url.as_deref().filter(|url| !url.trim().is_empty()).ok_or_else(|| {
            CadenceError::Config("webhook.public_url is required to register channels".into())
        })
    }

    /// Register a channel, run a full reconciliation and store its cursor on
    /// the new channel.
    ///
    /// # Errors
    /// `Config` without a webhook URL; provider and store failures. A channel
    /// that was registered stays persisted even if the initial sync fails.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn register(&self, tenant_id: TenantId) -> Result<ChannelRegistration> {
        let url = self.webhook_url()?;
        let descriptor = self.provider.register_channel(url).await?;
        let mut channel =
            SyncChannel::from_descriptor(tenant_id, self.provider.calendar_id(), descriptor, Utc::now());
        self.channels.insert(&channel).await?;
        info!(
            channel_id = %channel.channel_id,
            expires_at = %channel.expires_at,
            "Push channel registered"
        );

        let outcome = self.reconciler.reconcile(tenant_id, None).await?;
        if let Some(cursor) = outcome.next_cursor.as_deref() {
            self.channels.update_cursor(&channel.id, Some(cursor)).await?;
            channel.sync_cursor = Some(cursor.to_string());
        }

        Ok(ChannelRegistration { channel, outcome })
    }

    /// Replace a channel with a new registration that inherits its cursor.
    ///
    /// # Errors
    /// Registration and store failures. The old record is kept when the
    /// replacement could not be registered.
    #[instrument(skip(self, channel), fields(tenant_id = %channel.tenant_id, channel_id = %channel.channel_id))]
    pub async fn renew(&self, channel: &SyncChannel) -> Result<SyncChannel> {
        let url = self.webhook_url()?;

        if let Err(err) = self.provider.cancel_channel(&channel.channel_id, &channel.resource_id).await
        {
            warn!(error = %err, "Could not stop expiring channel, continuing with renewal");
        }

        let descriptor = self.provider.register_channel(url).await?;

        // The stored cursor may have advanced since `channel` was loaded.
        let cursor = self
            .channels
            .find_by_channel_id(&channel.channel_id)
            .await?
            .map_or_else(|| channel.sync_cursor.clone(), |current| current.sync_cursor);

        let mut replacement = SyncChannel::from_descriptor(
            channel.tenant_id,
            channel.remote_calendar_id.clone(),
            descriptor,
            Utc::now(),
        );
        replacement.sync_cursor = cursor;

        self.channels.insert(&replacement).await?;
        self.channels.delete(&channel.id).await?;

        info!(
            new_channel_id = %replacement.channel_id,
            expires_at = %replacement.expires_at,
            "Push channel renewed"
        );
        Ok(replacement)
    }

    /// Renew every channel expiring within the renewal lead of `now`.
    #[instrument(skip(self))]
    pub async fn renew_expiring(&self, now: DateTime<Utc>) -> Result<RenewalReport> {
        let due = self.channels.list_expiring_before(now + self.renewal_lead).await?;
        let mut report = RenewalReport::default();

        for channel in &due {
            match self.retry.run("renew_channel", move || self.renew(channel)).await {
                Ok(_) => report.renewed += 1,
                Err(err) => {
                    error!(
                        tenant_id = %channel.tenant_id,
                        channel_id = %channel.channel_id,
                        error = %err,
                        "Channel renewal failed"
                    );
                    report.failed.push(channel.channel_id.clone());
                }
            }
        }

        if !due.is_empty() {
            info!(renewed = report.renewed, failed = report.failed.len(), "Renewal sweep finished");
        }
        Ok(report)
    }

    /// Stop a channel at the provider and delete its record. The record is
    /// deleted even when the provider call fails.
    #[instrument(skip(self, channel), fields(tenant_id = %channel.tenant_id, channel_id = %channel.channel_id))]
    pub async fn unregister(&self, channel: &SyncChannel) -> Result<()> {
        if let Err(err) = self.provider.cancel_channel(&channel.channel_id, &channel.resource_id).await
        {
            warn!(error = %err, "Provider refused to stop channel, deleting record anyway");
        }
        self.channels.delete(&channel.id).await?;
        info!("Push channel unregistered");
        Ok(())
    }

    /// Unregister every channel of a tenant. Returns how many were removed.
    pub async fn unregister_tenant(&self, tenant_id: TenantId) -> Result<usize> {
        let channels = self.channels.list_for_tenant(&tenant_id).await?;
        for channel in &channels {
            self.unregister(channel).await?;
        }
        Ok(channels.len())
    }

    /// Unregister every listed tenant. A failing tenant is recorded and the
    /// rest still run.
    #[instrument(skip(self, tenants), fields(tenants = tenants.len()))]
    pub async fn unregister_tenants(&self, tenants: &[TenantId]) -> UnregisterReport {
        let mut report = UnregisterReport::default();
        for &tenant_id in tenants {
            match self.unregister_tenant(tenant_id).await {
                Ok(removed) => report.removed += removed,
                Err(err) => {
                    error!(tenant_id = %tenant_id, error = %err, "Channel unregistration failed");
                    report.failures.push(TenantSyncFailure { tenant_id, error: err.to_string() });
                }
            }
        }
        report
    }
}
