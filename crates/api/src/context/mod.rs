//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use cadence_core::{
    AppointmentNotifier, AppointmentService, CalendarProvider, CalendarSyncService,
    ChannelLifecycleManager, OutboundPropagator, Reconciler, ReminderSweep, RetryPolicy,
    SyncJobQueue, TenantLocks, WebhookIngress,
};
use cadence_domain::{CadenceError, Config, Result};
use cadence_infra::scheduling::{
    ChannelRenewalJob, CronScheduler, CronSchedulerConfig, IncrementalSyncJob, ReminderSweepJob,
    ScheduledJob,
};
use cadence_infra::sync::JobReceiver;
use cadence_infra::{
    ChannelJobQueue, DbManager, GoogleCalendarClient, LogNotifier, ReconcileWorker,
    ReconcileWorkerConfig, SqliteAppointmentRepository, SqliteSyncChannelRepository,
    SqliteTenantDirectory,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

const JOB_QUEUE_CAPACITY: usize = 256;

/// Services that need a configured calendar provider.
pub struct SyncServices {
    pub provider: Arc<dyn CalendarProvider>,
    pub sync: Arc<CalendarSyncService>,
    pub channels: Arc<ChannelLifecycleManager>,
}

#[derive(Default)]
struct Background {
    worker: Option<ReconcileWorker>,
    schedulers: Vec<CronScheduler>,
}

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub tenants: Arc<SqliteTenantDirectory>,
    pub appointment_store: Arc<SqliteAppointmentRepository>,
    pub channel_store: Arc<SqliteSyncChannelRepository>,
    pub appointments: Arc<AppointmentService>,
    pub ingress: Arc<WebhookIngress>,
    pub reminders: Arc<ReminderSweep>,
    /// `None` when provider credentials are absent.
    pub sync: Option<SyncServices>,
    receiver: Mutex<Option<JobReceiver>>,
    background: Mutex<Background>,
}

impl AppContext {
    /// Open the database, apply the schema and wire every service.
    ///
    /// Background work is not started; see [`AppContext::start_background`].
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let provider: Option<Arc<dyn CalendarProvider>> = if config.provider.is_configured() {
            let client = GoogleCalendarClient::from_config(&config).map_err(CadenceError::from)?;
            Some(Arc::new(client))
        } else {
            None
        };
        Self::with_provider(config, db, provider)
    }

    /// Wire the context around an already opened database and provider.
    pub fn with_provider(
        config: Config,
        db: Arc<DbManager>,
        provider: Option<Arc<dyn CalendarProvider>>,
    ) -> Result<Self> {
        let tenants = Arc::new(SqliteTenantDirectory::new(Arc::clone(&db)));
        let appointment_store = Arc::new(SqliteAppointmentRepository::new(Arc::clone(&db)));
        let channel_store = Arc::new(SqliteSyncChannelRepository::new(Arc::clone(&db)));
        let notifier: Arc<dyn AppointmentNotifier> = Arc::new(LogNotifier);

        let mut service =
            AppointmentService::new(appointment_store.clone()).with_notifier(Arc::clone(&notifier));
        match &provider {
            Some(provider) => {
                let propagator =
                    OutboundPropagator::new(Arc::clone(provider), appointment_store.clone());
                service = service.with_propagator(Arc::new(propagator));
            }
            None => {
                info!("Calendar provider not configured; outbound propagation disabled");
            }
        }
        let appointments = Arc::new(service);

        let (queue, receiver) = ChannelJobQueue::bounded(JOB_QUEUE_CAPACITY);
        let queue: Arc<dyn SyncJobQueue> = Arc::new(queue);
        let ingress = Arc::new(
            WebhookIngress::new(channel_store.clone(), queue)
                .with_channel_token(config.webhook.channel_token.clone()),
        );

        let reminders = Arc::new(
            ReminderSweep::new(appointment_store.clone(), notifier)
                .with_window(config.sync.reminder_window()?),
        );
        let renewal_lead = config.sync.renewal_lead()?;

        let sync = provider.map(|provider| {
            let retry = RetryPolicy::from_config(&config.sync);
            let reconciler = Arc::new(Reconciler::new(
                Arc::clone(&provider),
                Arc::clone(&appointments),
                TenantLocks::new(),
            ));
            let sync = Arc::new(
                CalendarSyncService::new(
                    Arc::clone(&reconciler),
                    channel_store.clone(),
                    tenants.clone(),
                )
                .with_retry_policy(retry),
            );
            let channels = Arc::new(
                ChannelLifecycleManager::new(
                    Arc::clone(&provider),
                    channel_store.clone(),
                    reconciler,
                    config.webhook.public_url.clone(),
                )
                .with_renewal_lead(renewal_lead)
                .with_retry_policy(retry),
            );
            SyncServices { provider, sync, channels }
        });

        Ok(Self {
            config,
            db,
            tenants,
            appointment_store,
            channel_store,
            appointments,
            ingress,
            reminders,
            sync,
            receiver: Mutex::new(Some(receiver)),
            background: Mutex::new(Background::default()),
        })
    }

    /// Provider-backed services, or a `Config` error naming what is missing.
    pub fn sync_services(&self) -> Result<&SyncServices> {
        match &self.sync {
            Some(services) => Ok(services),
            None => Err(self
                .config
                .provider
                .validate()
                .err()
                .unwrap_or_else(|| CadenceError::Config("calendar provider unavailable".into()))),
        }
    }

    /// Start the reconcile worker and the cron schedulers.
    ///
    /// Reminders run regardless of the provider; sync and renewal need it.
    pub async fn start_background(&self) -> Result<()> {
        let mut background = self.background.lock().await;
        let job_timeout = Duration::from_secs(self.config.sync.job_timeout_secs.max(1));

        if let Some(services) = &self.sync {
            if let Some(receiver) = self.receiver.lock().await.take() {
                let mut worker = ReconcileWorker::new(
                    Arc::clone(&services.sync),
                    receiver,
                    ReconcileWorkerConfig { job_timeout, ..ReconcileWorkerConfig::default() },
                );
                worker.start()?;
                background.worker = Some(worker);
            }
        }

        if !self.config.sync.enabled {
            info!("Scheduled jobs disabled by configuration");
            return Ok(());
        }

        let mut jobs: Vec<(String, Arc<dyn ScheduledJob>)> = vec![(
            self.config.sync.reminder_cron.clone(),
            Arc::new(ReminderSweepJob::new(Arc::clone(&self.reminders))),
        )];
        if let Some(services) = &self.sync {
            jobs.push((
                self.config.sync.incremental_cron.clone(),
                Arc::new(IncrementalSyncJob::new(Arc::clone(&services.sync))),
            ));
            jobs.push((
                self.config.sync.renewal_cron.clone(),
                Arc::new(ChannelRenewalJob::new(Arc::clone(&services.channels))),
            ));
        }

        for (cron_expression, job) in jobs {
            let config = CronSchedulerConfig {
                cron_expression,
                job_timeout,
                ..CronSchedulerConfig::default()
            };
            let mut scheduler = CronScheduler::with_config(config, job).await?;
            scheduler.start().await?;
            background.schedulers.push(scheduler);
        }

        info!(schedulers = background.schedulers.len(), "Background work started");
        Ok(())
    }

    /// Stop schedulers first, then drain the reconcile worker.
    pub async fn shutdown(&self) -> Result<()> {
        let mut background = self.background.lock().await;

        for mut scheduler in background.schedulers.drain(..) {
            if let Err(err) = scheduler.stop().await {
                warn!(job = scheduler.job_name(), error = %err, "Scheduler did not stop cleanly");
            }
        }

        if let Some(mut worker) = background.worker.take() {
            if let Err(err) = worker.stop().await {
                warn!(error = %err, "Reconcile worker did not stop cleanly");
            }
            if let Some(receiver) = worker.take_receiver() {
                *self.receiver.lock().await = Some(receiver);
            }
        }

        info!("Application context shut down");
        Ok(())
    }

    /// Check health of the application components.
    pub async fn health_check(&self) -> HealthStatus {
        let mut status = HealthStatus::new().add_component(self.check_database_health().await);
        status.calculate_score();
        if self.sync.is_none() {
            status.message = Some("calendar provider not configured; sync disabled".into());
        }
        status
    }

    /// Uses spawn_blocking to keep the synchronous query off the runtime.
    async fn check_database_health(&self) -> ComponentHealth {
        let db = Arc::clone(&self.db);
        match tokio::task::spawn_blocking(move || db.health_check()).await {
            Ok(Ok(())) => ComponentHealth::healthy("database"),
            Ok(Err(e)) => {
                warn!(error = %e, "database health check failed");
                ComponentHealth::unhealthy("database", format!("query failed: {e}"))
            }
            Err(e) => {
                tracing::error!(error = %e, "database health check task panicked");
                ComponentHealth::unhealthy("database", format!("task panic: {e}"))
            }
        }
    }
}
