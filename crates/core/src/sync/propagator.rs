//! Outbound propagation of local appointment writes to the provider

use std::sync::Arc;

use cadence_domain::{Appointment, ProviderError, WriteOrigin};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::appointments::ports::AppointmentRepository;
use crate::calendar_ports::CalendarProvider;

/// What happened to a propagation attempt. Failures are reported here and in
/// the logs, never as an error to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationOutcome {
    /// The write came from the reconciler and was not echoed back.
    Suppressed,
    Created { remote_event_id: String },
    Updated { remote_event_id: String },
    Deleted,
    /// Nothing to delete remotely.
    Unlinked,
    Failed { reason: String },
}

/// Pushes local creates, updates and deletes to the external calendar.
pub struct OutboundPropagator {
    provider: Arc<dyn CalendarProvider>,
    appointments: Arc<dyn AppointmentRepository>,
}

impl OutboundPropagator {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        appointments: Arc<dyn AppointmentRepository>,
    ) -> Self {
        Self { provider, appointments }
    }

    /// Propagate a committed create or update.
    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id, tenant_id = %appointment.tenant_id))]
    pub async fn on_saved(
        &self,
        appointment: &Appointment,
        created: bool,
        origin: WriteOrigin,
    ) -> PropagationOutcome {
        if !origin.propagates() {
            debug!("Provider-originated write, skipping propagation");
            return PropagationOutcome::Suppressed;
        }

        let create = created || !appointment.is_linked();
        let result = if create {
            self.provider.create_event(appointment).await
        } else {
            self.provider.update_event(appointment).await
        };

        let remote_event_id = match result {
            Ok(id) => id,
            Err(err) => return failed(&err, if create { "create" } else { "update" }),
        };

        if appointment.remote_id() != Some(remote_event_id.as_str()) {
            if let Err(err) = self
                .appointments
                .record_remote_link(
                    &appointment.id,
                    &remote_event_id,
                    self.provider.calendar_id(),
                    Utc::now(),
                )
                .await
            {
                warn!(
                    remote_event_id = %remote_event_id,
                    error = %err,
                    "Remote event written but link could not be stored"
                );
                return PropagationOutcome::Failed { reason: err.to_string() };
            }
        }

        info!(remote_event_id = %remote_event_id, created = create, "Appointment propagated");
        if create {
            PropagationOutcome::Created { remote_event_id }
        } else {
            PropagationOutcome::Updated { remote_event_id }
        }
    }

    /// Propagate a delete. Runs before the local row is removed so the remote
    /// id is still known.
    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id, tenant_id = %appointment.tenant_id))]
    pub async fn on_deleting(
        &self,
        appointment: &Appointment,
        origin: WriteOrigin,
    ) -> PropagationOutcome {
        if !origin.propagates() {
            debug!("Provider-originated delete, skipping propagation");
            return PropagationOutcome::Suppressed;
        }
        if !appointment.is_linked() {
            return PropagationOutcome::Unlinked;
        }

        match self.provider.delete_event(appointment).await {
            Ok(()) => PropagationOutcome::Deleted,
            Err(ProviderError::NotFound(_)) => {
                debug!("Remote event already gone");
                PropagationOutcome::Deleted
            }
            Err(err) => failed(&err, "delete"),
        }
    }
}

fn failed(err: &ProviderError, action: &'static str) -> PropagationOutcome {
    warn!(action, category = err.category().as_str(), error = %err, "Outbound propagation failed");
    PropagationOutcome::Failed { reason: err.to_string() }
}
