//! Appointment notices delivered as structured log records.

use async_trait::async_trait;
use cadence_core::AppointmentNotifier;
use cadence_domain::{Appointment, Result};
use tracing::info;

/// Writes confirmations and reminders to the log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl AppointmentNotifier for LogNotifier {
    async fn send_confirmation(&self, appointment: &Appointment) -> Result<()> {
        info!(
            target: "cadence::notices",
            appointment_id = %appointment.id,
            tenant_id = %appointment.tenant_id,
            title = %appointment.title,
            starts_at = %appointment.starts_at,
            "appointment confirmed"
        );
        Ok(())
    }

    async fn send_reminder(&self, appointment: &Appointment) -> Result<()> {
        info!(
            target: "cadence::notices",
            appointment_id = %appointment.id,
            tenant_id = %appointment.tenant_id,
            title = %appointment.title,
            starts_at = %appointment.starts_at,
            "appointment reminder"
        );
        Ok(())
    }
}
