//! Cron-driven background work: incremental sync, channel renewal and
//! reminder sweeps.
//!
//! Schedulers have an explicit start/stop lifecycle, track their join
//! handles, honor a cancellation token and wrap every async operation in a
//! timeout.

pub mod cron_scheduler;
pub mod error;
pub mod jobs;

pub use cron_scheduler::{CronScheduler, CronSchedulerConfig, ScheduledJob};
pub use error::{SchedulerError, SchedulerResult};
pub use jobs::{ChannelRenewalJob, IncrementalSyncJob, ReminderSweepJob};
