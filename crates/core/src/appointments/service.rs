//! Appointment write path

use std::sync::Arc;

use cadence_domain::{
    Appointment, AppointmentDraft, AppointmentId, CadenceError, Result, TenantId, WriteOrigin,
};
use chrono::Utc;
use tracing::{debug, instrument, warn};

use super::ports::{AppointmentNotifier, AppointmentRepository};
use crate::sync::propagator::{OutboundPropagator, PropagationOutcome};

/// Owns every appointment mutation.
///
/// Each write names its [`WriteOrigin`]; only `Local` writes reach the
/// outbound propagator. Propagation and notification failures are logged and
/// never undo the local write.
pub struct AppointmentService {
    repository: Arc<dyn AppointmentRepository>,
    propagator: Option<Arc<OutboundPropagator>>,
    notifier: Option<Arc<dyn AppointmentNotifier>>,
}

impl AppointmentService {
    /// Create a service without provider propagation.
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository, propagator: None, notifier: None }
    }

    pub fn with_propagator(mut self, propagator: Arc<OutboundPropagator>) -> Self {
        self.propagator = Some(propagator);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AppointmentNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn propagation_enabled(&self) -> bool {
        self.propagator.is_some()
    }

    pub fn repository(&self) -> &Arc<dyn AppointmentRepository> {
        &self.repository
    }

    /// # Errors
    /// `NotFound` when no appointment has this id.
    pub async fn get(&self, id: &AppointmentId) -> Result<Appointment> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(format!("appointment {id}")))
    }

    /// Create an appointment from user input and push it to the provider.
    #[instrument(skip(self, draft), fields(tenant_id = %tenant_id))]
    pub async fn create(&self, tenant_id: TenantId, draft: AppointmentDraft) -> Result<Appointment> {
        draft.validate().map_err(CadenceError::InvalidInput)?;
        let appointment = Appointment::from_draft(tenant_id, draft, Utc::now());

        self.save(&appointment, true, WriteOrigin::Local).await?;

        if appointment.notify {
            if let Some(notifier) = &self.notifier {
                if let Err(err) = notifier.send_confirmation(&appointment).await {
                    warn!(appointment_id = %appointment.id, error = %err, "Confirmation notice failed");
                }
            }
        }

        // Re-read so the caller sees the remote link stored by propagation.
        self.get(&appointment.id).await
    }

    /// Apply user edits and push them to the provider.
    #[instrument(skip(self, draft), fields(appointment_id = %id))]
    pub async fn update(&self, id: &AppointmentId, draft: AppointmentDraft) -> Result<Appointment> {
        draft.validate().map_err(CadenceError::InvalidInput)?;
        let mut appointment = self.get(id).await?;
        appointment.apply_draft(draft, Utc::now());

        self.save(&appointment, false, WriteOrigin::Local).await?;
        self.get(id).await
    }

    /// Delete an appointment, removing the remote event first.
    #[instrument(skip(self), fields(appointment_id = %id))]
    pub async fn delete(&self, id: &AppointmentId) -> Result<()> {
        let appointment = self.get(id).await?;
        self.remove(&appointment, WriteOrigin::Local).await
    }

    /// Persist an appointment. Propagates afterwards when `origin` allows it.
    ///
    /// Updates with `Remote` origin only write the provider-mutable fields.
    pub async fn save(
        &self,
        appointment: &Appointment,
        created: bool,
        origin: WriteOrigin,
    ) -> Result<PropagationOutcome> {
        if created {
            self.repository.insert(appointment).await?;
        } else if origin.propagates() {
            self.repository.update(appointment).await?;
        } else {
            self.repository.apply_remote_changes(appointment).await?;
        }

        Ok(self.propagate_saved(appointment, created, origin).await)
    }

    /// Delete an appointment. Propagation runs before the local delete and
    /// its failure does not stop it.
    pub async fn remove(&self, appointment: &Appointment, origin: WriteOrigin) -> Result<()> {
        if let Some(propagator) = self.active_propagator(origin) {
            propagator.on_deleting(appointment, origin).await;
        }

        if !self.repository.delete(&appointment.id).await? {
            debug!(appointment_id = %appointment.id, "Appointment already deleted");
        }
        Ok(())
    }

    /// Delete the tenant's appointments linked to a cancelled remote event.
    ///
    /// Only used when applying provider changes, so nothing is propagated.
    pub async fn remove_remote_linked(
        &self,
        tenant_id: &TenantId,
        remote_event_id: &str,
    ) -> Result<usize> {
        self.repository.delete_by_remote_event(tenant_id, remote_event_id).await
    }

    async fn propagate_saved(
        &self,
        appointment: &Appointment,
        created: bool,
        origin: WriteOrigin,
    ) -> PropagationOutcome {
        match self.active_propagator(origin) {
            Some(propagator) => propagator.on_saved(appointment, created, origin).await,
            None => PropagationOutcome::Suppressed,
        }
    }

    fn active_propagator(&self, origin: WriteOrigin) -> Option<&Arc<OutboundPropagator>> {
        // Origin is checked before anything else touches the provider.
        if origin.propagates() {
            self.propagator.as_ref()
        } else {
            None
        }
    }
}
