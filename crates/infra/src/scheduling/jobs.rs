//! Periodic jobs wired onto [`CronScheduler`](super::CronScheduler).

use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::{CalendarSyncService, ChannelLifecycleManager, ReminderSweep};
use cadence_domain::{CadenceError, SyncMode};
use chrono::Utc;
use tracing::{info, warn};

use super::cron_scheduler::ScheduledJob;

/// Incremental sync of every active tenant.
pub struct IncrementalSyncJob {
    service: Arc<CalendarSyncService>,
}

impl IncrementalSyncJob {
    pub fn new(service: Arc<CalendarSyncService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ScheduledJob for IncrementalSyncJob {
    fn name(&self) -> &'static str {
        "incremental_sync"
    }

    async fn run(&self) -> Result<(), CadenceError> {
        let report = self.service.sync_all(SyncMode::Incremental).await?;
        if !report.is_clean() {
            warn!(failed = report.failures.len(), "Incremental sync finished with failures");
        }
        Ok(())
    }
}

/// Renews push channels that are about to expire.
pub struct ChannelRenewalJob {
    channels: Arc<ChannelLifecycleManager>,
}

impl ChannelRenewalJob {
    pub fn new(channels: Arc<ChannelLifecycleManager>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl ScheduledJob for ChannelRenewalJob {
    fn name(&self) -> &'static str {
        "channel_renewal"
    }

    async fn run(&self) -> Result<(), CadenceError> {
        let report = self.channels.renew_expiring(Utc::now()).await?;
        if !report.failed.is_empty() {
            warn!(renewed = report.renewed, failed = ?report.failed, "Channel renewal pass had failures");
        } else if report.renewed > 0 {
            info!(renewed = report.renewed, "Channel renewal pass");
        }
        Ok(())
    }
}

pub struct ReminderSweepJob {
    sweep: Arc<ReminderSweep>,
}

impl ReminderSweepJob {
    pub fn new(sweep: Arc<ReminderSweep>) -> Self {
        Self { sweep }
    }
}

#[async_trait]
impl ScheduledJob for ReminderSweepJob {
    fn name(&self) -> &'static str {
        "reminder_sweep"
    }

    async fn run(&self) -> Result<(), CadenceError> {
        self.sweep.run(Utc::now()).await.map(|_| ())
    }
}
