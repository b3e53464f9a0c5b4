//! Cron-driven runner for periodic background jobs.
//!
//! Join handles are tracked, cancellation is explicit, and every asynchronous
//! lifecycle operation is wrapped in a timeout.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use cadence_domain::CadenceError;
//! use cadence_infra::scheduling::{
//!     CronScheduler, CronSchedulerConfig, ScheduledJob, SchedulerResult,
//! };
//!
//! struct Noop;
//!
//! #[async_trait]
//! impl ScheduledJob for Noop {
//!     fn name(&self) -> &'static str {
//!         "noop"
//!     }
//!
//!     async fn run(&self) -> Result<(), CadenceError> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> SchedulerResult<()> {
//! let mut scheduler = CronScheduler::with_config(
//!     CronSchedulerConfig { cron_expression: "0 */5 * * * *".into(), ..Default::default() },
//!     Arc::new(Noop),
//! )
//! .await?;
//! scheduler.start().await?;
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cadence_domain::CadenceError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// A unit of periodic work.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<(), CadenceError>;
}

#[derive(Debug, Clone)]
pub struct CronSchedulerConfig {
    /// Six-field cron expression (with seconds).
    pub cron_expression: String,
    /// Timeout applied to a single job execution.
    pub job_timeout: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for CronSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 */15 * * * *".into(),
            job_timeout: Duration::from_secs(300),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

pub struct CronScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: CronSchedulerConfig,
    job_id: Uuid,
    job_name: &'static str,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
}

impl CronScheduler {
    pub async fn new(cron_expression: String, job: Arc<dyn ScheduledJob>) -> SchedulerResult<Self> {
        let config = CronSchedulerConfig { cron_expression, ..CronSchedulerConfig::default() };
        Self::with_config(config, job).await
    }

    pub async fn with_config(
        config: CronSchedulerConfig,
        job: Arc<dyn ScheduledJob>,
    ) -> SchedulerResult<Self> {
        let raw_scheduler = JobScheduler::new()
            .await
            .map_err(|source| SchedulerError::CreationFailed { source })?;

        let job_name = job.name();
        let job_id = register_job(&raw_scheduler, &config, job).await?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            job_id,
            job_name,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
        })
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self), fields(job = self.job_name))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        let start_result = tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?;

        start_result.map_err(|source| SchedulerError::StartFailed { source })?;

        let cancel = self.cancellation.clone();
        let job_name = self.job_name;
        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!(job = job_name, "scheduler monitor cancelled");
        }));

        info!(cron = %self.config.cron_expression, job_id = %self.job_id, "Scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self), fields(job = self.job_name))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        let stop_result = tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?;

        stop_result.map_err(|source| SchedulerError::StopFailed { source })?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn job_name(&self) -> &'static str {
        self.job_name
    }
}

async fn register_job(
    scheduler: &JobScheduler,
    config: &CronSchedulerConfig,
    job: Arc<dyn ScheduledJob>,
) -> SchedulerResult<Uuid> {
    let cron = config.cron_expression.clone();
    let job_timeout = config.job_timeout;

    let definition = Job::new_async(cron.as_str(), move |_id, _lock| {
        let job = job.clone();

        Box::pin(async move {
            let name = job.name();
            let started = Instant::now();

            match tokio::time::timeout(job_timeout, job.run()).await {
                Ok(Ok(())) => {
                    debug!(job = name, elapsed_ms = started.elapsed().as_millis() as u64, "Job finished");
                }
                Ok(Err(err)) => {
                    error!(job = name, error = %err, category = err.label(), "Job failed");
                }
                Err(_) => {
                    warn!(job = name, timeout_secs = job_timeout.as_secs(), "Job timed out");
                }
            }
        })
    })
    .map_err(|source| SchedulerError::JobRegistrationFailed { cron: cron.clone(), source })?;

    let job_id = scheduler
        .add(definition)
        .await
        .map_err(|source| SchedulerError::JobRegistrationFailed { cron: cron.clone(), source })?;

    debug!(cron = %cron, job_id = %job_id, "Registered scheduled job");
    Ok(job_id)
}

impl Drop for CronScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(job = self.job_name, "CronScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
