//! # Cadence Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits)
//! - The reconciler, outbound propagator and webhook ingress
//! - Channel lifecycle and reminder services
//!
//! ## Architecture Principles
//! - Only depends on `cadence-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod appointments;
pub mod calendar_ports;
pub mod reminders;
pub mod sync;

pub use appointments::ports::{AppointmentNotifier, AppointmentRepository};
pub use appointments::AppointmentService;
pub use calendar_ports::CalendarProvider;
pub use reminders::ReminderSweep;
pub use sync::ports::{SyncChannelRepository, SyncJobQueue, TenantDirectory};
pub use sync::{
    BatchSyncReport, CalendarSyncService, ChannelLifecycleManager, ChannelRegistration,
    OutboundPropagator, PropagationOutcome, Reconciler, RetryPolicy, TenantLocks,
    TenantSyncReport, UnregisterReport, WebhookIngress,
};
