//! Port interfaces for the local appointment store

use async_trait::async_trait;
use cadence_domain::{Appointment, AppointmentId, Result, TenantId};
use chrono::{DateTime, Utc};

/// Persistence for appointments.
///
/// Writes through this trait never trigger propagation; that decision lives
/// in [`crate::AppointmentService`].
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Load an appointment by id, regardless of tenant.
    async fn get(&self, id: &AppointmentId) -> Result<Option<Appointment>>;

    /// Insert a new appointment.
    async fn insert(&self, appointment: &Appointment) -> Result<()>;

    /// Replace all stored fields of an existing appointment.
    async fn update(&self, appointment: &Appointment) -> Result<()>;

    /// Store the provider-mutable fields of an existing appointment: title,
    /// description, location, start, end, `last_synced_at` and `updated_at`.
    ///
    /// The remote link, flags and provenance are left as stored, so a
    /// concurrent [`record_remote_link`](Self::record_remote_link) survives.
    async fn apply_remote_changes(&self, appointment: &Appointment) -> Result<()>;

    /// Delete by id. Returns whether a row was removed.
    async fn delete(&self, id: &AppointmentId) -> Result<bool>;

    /// Find the tenant's appointment linked to a remote event.
    async fn find_by_remote_event(
        &self,
        tenant_id: &TenantId,
        remote_event_id: &str,
    ) -> Result<Option<Appointment>>;

    /// Delete every appointment of the tenant linked to a remote event.
    async fn delete_by_remote_event(
        &self,
        tenant_id: &TenantId,
        remote_event_id: &str,
    ) -> Result<usize>;

    /// Persist the link to a remote event without touching other fields.
    async fn record_remote_link(
        &self,
        id: &AppointmentId,
        remote_event_id: &str,
        remote_calendar_id: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Appointments starting in `[from, until]` with reminders requested and
    /// not yet sent.
    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Appointment>>;

    /// Flag an appointment's reminder as sent.
    async fn mark_notified(&self, id: &AppointmentId) -> Result<()>;
}

/// Outgoing notices about appointments.
#[async_trait]
pub trait AppointmentNotifier: Send + Sync {
    /// Confirmation for a newly created appointment.
    async fn send_confirmation(&self, appointment: &Appointment) -> Result<()>;

    /// Reminder ahead of the appointment start.
    async fn send_reminder(&self, appointment: &Appointment) -> Result<()>;
}
