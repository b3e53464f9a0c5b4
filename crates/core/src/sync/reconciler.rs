//! Applies provider change sets to the local appointment store

use std::sync::Arc;

use cadence_domain::constants::UNTITLED_EVENT_TITLE;
use cadence_domain::{
    Appointment, AppointmentId, ChangeSet, ProviderError, Provenance, ReconcileOutcome,
    ReconcileSummary, RemoteEvent, Result, TenantId, WriteOrigin,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::locks::TenantLocks;
use crate::appointments::AppointmentService;
use crate::calendar_ports::CalendarProvider;

/// Reconciles one tenant's appointments against the provider's change feed.
///
/// Passes for the same tenant are serialized; the lock is held across the
/// expired-cursor fallback so two passes never interleave their writes.
pub struct Reconciler {
    provider: Arc<dyn CalendarProvider>,
    appointments: Arc<AppointmentService>,
    locks: TenantLocks,
}

impl Reconciler {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        appointments: Arc<AppointmentService>,
        locks: TenantLocks,
    ) -> Self {
        Self { provider, appointments, locks }
    }

    /// Pull changes since `cursor` and apply them for `tenant_id`.
    ///
    /// A blank or absent cursor performs a full pull. An expired cursor is
    /// answered with exactly one full pull.
    ///
    /// # Errors
    /// Provider failures (other than a first cursor expiry) and store failures.
    /// The returned cursor must not be persisted when this fails.
    #[instrument(skip(self, cursor), fields(tenant_id = %tenant_id, incremental = cursor.is_some_and(|c| !c.trim().is_empty())))]
    pub async fn reconcile(
        &self,
        tenant_id: TenantId,
        cursor: Option<&str>,
    ) -> Result<ReconcileOutcome> {
        let cursor = cursor.filter(|c| !c.trim().is_empty());
        let _guard = self.locks.acquire(tenant_id).await;

        let (changes, full_resync) = self.pull(cursor).await?;
        let now = Utc::now();
        let mut summary = ReconcileSummary::default();

        for event in &changes.events {
            self.apply(tenant_id, event, now, &mut summary).await?;
        }

        info!(
            events = changes.events.len(),
            created = summary.created,
            updated = summary.updated,
            removed = summary.removed,
            skipped = summary.skipped,
            full_resync,
            "Reconciliation finished"
        );

        Ok(ReconcileOutcome {
            next_cursor: changes.next_cursor.filter(|c| !c.trim().is_empty()),
            summary,
            full_resync,
        })
    }

    async fn pull(&self, cursor: Option<&str>) -> Result<(ChangeSet, bool)> {
        match self.provider.list_changed_since(cursor).await {
            Ok(changes) => Ok((changes, false)),
            Err(ProviderError::CursorExpired) if cursor.is_some() => {
                warn!("Sync cursor expired, falling back to a full pull");
                let changes = self.provider.list_changed_since(None).await?;
                Ok((changes, true))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply(
        &self,
        tenant_id: TenantId,
        event: &RemoteEvent,
        now: DateTime<Utc>,
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        if event.is_cancelled() {
            let removed = self.appointments.remove_remote_linked(&tenant_id, &event.id).await?;
            if removed > 0 {
                debug!(remote_event_id = %event.id, removed, "Removed cancelled event");
            }
            summary.removed += removed;
            return Ok(());
        }

        if let Some(raw_marker) = event.marker.as_deref().filter(|m| !m.trim().is_empty()) {
            match event.marker_id() {
                Some(id) => self.apply_marked(tenant_id, id, event, now, summary).await?,
                None => {
                    debug!(remote_event_id = %event.id, marker = raw_marker, "Unreadable marker, skipping");
                    summary.skipped += 1;
                }
            }
            return Ok(());
        }

        let existing =
            self.appointments.repository().find_by_remote_event(&tenant_id, &event.id).await?;
        match existing {
            Some(mut appointment) => {
                overwrite_from_remote(&mut appointment, event, now);
                self.appointments.save(&appointment, false, WriteOrigin::Remote).await?;
                summary.updated += 1;
            }
            None => {
                let appointment =
                    appointment_from_remote(tenant_id, event, self.provider.calendar_id(), now);
                self.appointments.save(&appointment, true, WriteOrigin::Remote).await?;
                debug!(remote_event_id = %event.id, appointment_id = %appointment.id, "Imported remote event");
                summary.created += 1;
            }
        }
        Ok(())
    }

    /// Events carrying our marker update the appointment they name, even if a
    /// different appointment is linked to the same remote id.
    async fn apply_marked(
        &self,
        tenant_id: TenantId,
        id: AppointmentId,
        event: &RemoteEvent,
        now: DateTime<Utc>,
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        let Some(mut appointment) = self.appointments.repository().get(&id).await? else {
            debug!(remote_event_id = %event.id, appointment_id = %id, "Marker without local appointment, skipping");
            summary.skipped += 1;
            return Ok(());
        };

        if appointment.tenant_id != tenant_id {
            debug!(
                remote_event_id = %event.id,
                appointment_id = %id,
                owner = %appointment.tenant_id,
                "Marker belongs to another tenant, skipping"
            );
            summary.skipped += 1;
            return Ok(());
        }

        merge_from_remote(&mut appointment, event, now);
        self.appointments.save(&appointment, false, WriteOrigin::Remote).await?;
        if !appointment.is_linked() {
            self.repair_link(tenant_id, &appointment, event, now).await?;
        }
        summary.updated += 1;
        Ok(())
    }

    /// Link a marked appointment to the event that names it, unless another
    /// appointment of the tenant already holds that event id.
    async fn repair_link(
        &self,
        tenant_id: TenantId,
        appointment: &Appointment,
        event: &RemoteEvent,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let repository = self.appointments.repository();
        if let Some(holder) = repository.find_by_remote_event(&tenant_id, &event.id).await? {
            if holder.id != appointment.id {
                debug!(
                    remote_event_id = %event.id,
                    appointment_id = %appointment.id,
                    holder = %holder.id,
                    "Remote event already linked elsewhere, leaving marker unlinked"
                );
            }
            return Ok(());
        }

        repository
            .record_remote_link(&appointment.id, &event.id, self.provider.calendar_id(), now)
            .await?;
        debug!(remote_event_id = %event.id, appointment_id = %appointment.id, "Linked marked appointment");
        Ok(())
    }
}

/// Provider-mutable fields only; absent values keep the local ones.
fn merge_from_remote(appointment: &mut Appointment, event: &RemoteEvent, now: DateTime<Utc>) {
    if let Some(summary) = &event.summary {
        appointment.title.clone_from(summary);
    }
    if let Some(description) = &event.description {
        appointment.description.clone_from(description);
    }
    if let Some(location) = &event.location {
        appointment.location.clone_from(location);
    }
    if let Some(start) = event.start {
        appointment.starts_at = start.to_utc();
    }
    if let Some(end) = event.end {
        appointment.ends_at = end.to_utc();
    }
    appointment.last_synced_at = Some(now);
    appointment.updated_at = now;
}

fn overwrite_from_remote(appointment: &mut Appointment, event: &RemoteEvent, now: DateTime<Utc>) {
    appointment.title = event.summary.clone().unwrap_or_else(|| UNTITLED_EVENT_TITLE.to_string());
    appointment.description = event.description.clone().unwrap_or_default();
    appointment.location = event.location.clone().unwrap_or_default();
    appointment.starts_at = event.start_or(now);
    appointment.ends_at = event.end_or(now);
    appointment.last_synced_at = Some(now);
    appointment.updated_at = now;
}

fn appointment_from_remote(
    tenant_id: TenantId,
    event: &RemoteEvent,
    calendar_id: &str,
    now: DateTime<Utc>,
) -> Appointment {
    Appointment {
        id: AppointmentId::new(),
        tenant_id,
        title: event.summary.clone().unwrap_or_else(|| UNTITLED_EVENT_TITLE.to_string()),
        description: event.description.clone().unwrap_or_default(),
        starts_at: event.start_or(now),
        ends_at: event.end_or(now),
        location: event.location.clone().unwrap_or_default(),
        confirmed: true,
        notify: false,
        notified: false,
        provenance: Provenance::Remote,
        remote_event_id: Some(event.id.clone()),
        remote_calendar_id: Some(calendar_id.to_string()),
        last_synced_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}
