//! In-process reconciliation queue and the worker that drains it.
//!
//! Webhook ingress pushes jobs through [`ChannelJobQueue`] without waiting;
//! [`ReconcileWorker`] runs them in the background with bounded concurrency.
//! Jobs for the same tenant still serialize on the reconciler's tenant locks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_core::{CalendarSyncService, SyncJobQueue};
use cadence_domain::{CadenceError, ReconcileJob, Result};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Sending half handed to the webhook ingress.
#[derive(Clone)]
pub struct ChannelJobQueue {
    sender: mpsc::Sender<ReconcileJob>,
}

/// Receiving half consumed by [`ReconcileWorker`].
pub struct JobReceiver {
    inner: mpsc::Receiver<ReconcileJob>,
}

impl ChannelJobQueue {
    /// Bounded queue holding at most `capacity` pending jobs.
    pub fn bounded(capacity: usize) -> (Self, JobReceiver) {
        let (sender, inner) = mpsc::channel(capacity.max(1));
        (Self { sender }, JobReceiver { inner })
    }
}

impl SyncJobQueue for ChannelJobQueue {
    fn enqueue(&self, job: ReconcileJob) -> Result<()> {
        self.sender.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(job) => CadenceError::Internal(format!(
                "reconcile queue is full; dropped job for tenant {}",
                job.tenant_id
            )),
            mpsc::error::TrySendError::Closed(_) => {
                CadenceError::Internal("reconcile queue is closed".into())
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileWorkerConfig {
    /// Jobs allowed to run at the same time.
    pub max_concurrency: usize,
    /// Upper bound for one job, retries included.
    pub job_timeout: Duration,
    /// How long `stop` waits for in-flight jobs.
    pub join_timeout: Duration,
}

impl Default for ReconcileWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            job_timeout: Duration::from_secs(300),
            join_timeout: Duration::from_secs(10),
        }
    }
}

/// Background consumer of reconcile jobs with an explicit lifecycle.
pub struct ReconcileWorker {
    service: Arc<CalendarSyncService>,
    config: ReconcileWorkerConfig,
    receiver: Option<JobReceiver>,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<JobReceiver>>,
}

impl ReconcileWorker {
    pub fn new(
        service: Arc<CalendarSyncService>,
        receiver: JobReceiver,
        config: ReconcileWorkerConfig,
    ) -> Self {
        Self {
            service,
            config,
            receiver: Some(receiver),
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(CadenceError::Internal("reconcile worker already running".into()));
        }
        let receiver = self
            .receiver
            .take()
            .ok_or_else(|| CadenceError::Internal("reconcile worker lost its queue".into()))?;

        self.cancellation = CancellationToken::new();
        let handle = tokio::spawn(process_loop(
            Arc::clone(&self.service),
            receiver,
            self.config.clone(),
            self.cancellation.clone(),
        ));
        self.task_handle = Some(handle);

        info!(max_concurrency = self.config.max_concurrency, "Reconcile worker started");
        Ok(())
    }

    /// Stop accepting queued jobs and wait for in-flight ones to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            return Err(CadenceError::Internal("reconcile worker not running".into()));
        };

        self.cancellation.cancel();

        match tokio::time::timeout(self.config.join_timeout, handle).await {
            Ok(Ok(receiver)) => {
                self.receiver = Some(receiver);
                info!("Reconcile worker stopped");
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Reconcile worker task panicked");
                Err(CadenceError::Internal(format!("reconcile worker panicked: {err}")))
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.join_timeout.as_secs(),
                    "Reconcile worker did not finish in time"
                );
                Err(CadenceError::Internal("reconcile worker stop timed out".into()))
            }
        }
    }

    /// Hand the queue back once stopped, so a new worker can take it over.
    pub fn take_receiver(&mut self) -> Option<JobReceiver> {
        if self.is_running() {
            return None;
        }
        self.receiver.take()
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ReconcileWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("ReconcileWorker dropped while running; cancelling");
            self.cancellation.cancel();
        }
    }
}

async fn process_loop(
    service: Arc<CalendarSyncService>,
    mut receiver: JobReceiver,
    config: ReconcileWorkerConfig,
    cancel: CancellationToken,
) -> JobReceiver {
    let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Reconcile worker loop cancelled");
                break;
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    error!(error = %err, "Reconcile job task panicked");
                }
            }
            next = receiver.inner.recv() => {
                let Some(job) = next else {
                    debug!("Reconcile queue closed");
                    break;
                };
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break;
                };
                let service = Arc::clone(&service);
                let job_timeout = config.job_timeout;
                in_flight.spawn(async move {
                    run_job(&service, &job, job_timeout).await;
                    drop(permit);
                });
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "Reconcile job task panicked");
        }
    }
    receiver
}

async fn run_job(service: &CalendarSyncService, job: &ReconcileJob, job_timeout: Duration) {
    let started = Instant::now();
    match tokio::time::timeout(job_timeout, service.run_job(job)).await {
        Ok(Ok(report)) => {
            debug!(
                tenant_id = %job.tenant_id,
                summary = %report.outcome.summary,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Reconcile job finished"
            );
        }
        Ok(Err(err)) => {
            error!(tenant_id = %job.tenant_id, error = %err, category = err.label(), "Reconcile job failed");
        }
        Err(_) => {
            warn!(tenant_id = %job.tenant_id, timeout_secs = job_timeout.as_secs(), "Reconcile job timed out");
        }
    }
}
