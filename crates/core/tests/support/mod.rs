//! Shared test helpers for `cadence-core` integration tests.
//!
//! Every suite compiles this module separately and uses a different subset.
#![allow(dead_code)]

pub mod calendar;
pub mod repositories;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use cadence_core::{
    AppointmentService, CalendarSyncService, ChannelLifecycleManager, OutboundPropagator,
    Reconciler, RetryPolicy, TenantLocks, WebhookIngress,
};
use cadence_domain::{
    Appointment, AppointmentDraft, AppointmentId, ChannelDescriptor, EventTime, RemoteEvent,
    RemoteEventStatus, SyncChannel, TenantId,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub use calendar::MockCalendarProvider;
pub use repositories::{
    MockAppointmentRepository, MockSyncChannelRepository, MockTenantDirectory, RecordingJobQueue,
    RecordingNotifier,
};

pub const WEBHOOK_URL: &str = "https://cadence.example.com/calendar/webhook";

/// Retry policy that keeps suites fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: StdDuration::from_millis(1),
        max_delay: StdDuration::from_millis(2),
    }
}

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 15, hour, 0, 0).unwrap()
}

pub fn active_event(id: &str, summary: &str) -> RemoteEvent {
    RemoteEvent {
        id: id.to_string(),
        status: RemoteEventStatus::Active,
        summary: Some(summary.to_string()),
        description: Some(String::new()),
        location: None,
        start: Some(EventTime::At(at(9))),
        end: Some(EventTime::At(at(10))),
        marker: None,
    }
}

pub fn marked_event(id: &str, appointment_id: AppointmentId, summary: &str) -> RemoteEvent {
    RemoteEvent { marker: Some(appointment_id.to_string()), ..active_event(id, summary) }
}

pub fn cancelled_event(id: &str) -> RemoteEvent {
    RemoteEvent {
        id: id.to_string(),
        status: RemoteEventStatus::Cancelled,
        summary: None,
        description: None,
        location: None,
        start: None,
        end: None,
        marker: None,
    }
}

pub fn draft(title: &str) -> AppointmentDraft {
    AppointmentDraft {
        title: title.to_string(),
        description: "Agenda attached".to_string(),
        starts_at: at(14),
        ends_at: at(15),
        location: "Room 2".to_string(),
        confirmed: false,
        notify: false,
    }
}

pub fn local_appointment(tenant_id: TenantId, title: &str) -> Appointment {
    Appointment::from_draft(tenant_id, draft(title), Utc::now())
}

pub fn linked_appointment(tenant_id: TenantId, title: &str, remote_id: &str) -> Appointment {
    let mut appointment = local_appointment(tenant_id, title);
    appointment.remote_event_id = Some(remote_id.to_string());
    appointment.remote_calendar_id = Some("primary".to_string());
    appointment
}

pub fn channel(tenant_id: TenantId, channel_id: &str, expires_in: Duration) -> SyncChannel {
    SyncChannel::from_descriptor(
        tenant_id,
        "primary",
        ChannelDescriptor {
            channel_id: channel_id.to_string(),
            resource_id: format!("{channel_id}-resource"),
            expires_at: Utc::now() + expires_in,
        },
        Utc::now(),
    )
}

/// Fully wired core services over in-memory ports.
pub struct Harness {
    pub provider: MockCalendarProvider,
    pub appointments: MockAppointmentRepository,
    pub channels: MockSyncChannelRepository,
    pub tenants: MockTenantDirectory,
    pub queue: RecordingJobQueue,
    pub notifier: RecordingNotifier,
    pub service: Arc<AppointmentService>,
    pub reconciler: Arc<Reconciler>,
    pub sync: CalendarSyncService,
    pub lifecycle: ChannelLifecycleManager,
    pub ingress: WebhookIngress,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_webhook_url(Some(WEBHOOK_URL))
    }

    pub fn with_webhook_url(webhook_url: Option<&str>) -> Self {
        let provider = MockCalendarProvider::new();
        let appointments = MockAppointmentRepository::new();
        let channels = MockSyncChannelRepository::new();
        let tenants = MockTenantDirectory::default();
        let queue = RecordingJobQueue::default();
        let notifier = RecordingNotifier::default();

        let propagator =
            Arc::new(OutboundPropagator::new(Arc::new(provider.clone()), Arc::new(appointments.clone())));
        let service = Arc::new(
            AppointmentService::new(Arc::new(appointments.clone()))
                .with_propagator(propagator)
                .with_notifier(Arc::new(notifier.clone())),
        );
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(provider.clone()),
            service.clone(),
            TenantLocks::new(),
        ));
        let sync = CalendarSyncService::new(
            reconciler.clone(),
            Arc::new(channels.clone()),
            Arc::new(tenants.clone()),
        )
        .with_retry_policy(fast_retry());
        let lifecycle = ChannelLifecycleManager::new(
            Arc::new(provider.clone()),
            Arc::new(channels.clone()),
            reconciler.clone(),
            webhook_url.map(str::to_string),
        )
        .with_retry_policy(fast_retry());
        let ingress = WebhookIngress::new(Arc::new(channels.clone()), Arc::new(queue.clone()));

        Self {
            provider,
            appointments,
            channels,
            tenants,
            queue,
            notifier,
            service,
            reconciler,
            sync,
            lifecycle,
            ingress,
        }
    }
}
