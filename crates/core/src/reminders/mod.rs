//! Reminder dispatch for upcoming appointments

use std::sync::Arc;

use cadence_domain::constants::DEFAULT_REMINDER_WINDOW_HOURS;
use cadence_domain::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use crate::appointments::ports::{AppointmentNotifier, AppointmentRepository};

/// Sends one reminder per appointment that starts within the window.
pub struct ReminderSweep {
    appointments: Arc<dyn AppointmentRepository>,
    notifier: Arc<dyn AppointmentNotifier>,
    window: Duration,
}

impl ReminderSweep {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        notifier: Arc<dyn AppointmentNotifier>,
    ) -> Self {
        Self { appointments, notifier, window: Duration::hours(DEFAULT_REMINDER_WINDOW_HOURS) }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Dispatch reminders for appointments starting in `[now, now + window]`.
    /// Returns how many were sent. A failed dispatch leaves the appointment
    /// unflagged for the next sweep.
    #[instrument(skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.appointments.due_for_reminder(now, now + self.window).await?;
        let mut sent = 0;

        for appointment in &due {
            if let Err(err) = self.notifier.send_reminder(appointment).await {
                warn!(appointment_id = %appointment.id, error = %err, "Reminder dispatch failed");
                continue;
            }
            self.appointments.mark_notified(&appointment.id).await?;
            sent += 1;
        }

        if sent > 0 {
            info!(sent, due = due.len(), "Reminders dispatched");
        }
        Ok(sent)
    }
}
