//! In-memory mocks for the store, queue and notifier ports

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cadence_core::{
    AppointmentNotifier, AppointmentRepository, SyncChannelRepository, SyncJobQueue,
    TenantDirectory,
};
use cadence_domain::{
    Appointment, AppointmentId, CadenceError, ReconcileJob, Result as DomainResult, SyncChannel,
    Tenant, TenantId,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// In-memory appointment store enforcing the per-tenant remote id uniqueness
/// the SQLite schema enforces.
#[derive(Default, Clone)]
pub struct MockAppointmentRepository {
    rows: Arc<Mutex<HashMap<AppointmentId, Appointment>>>,
    link_after_read: Arc<Mutex<Option<(AppointmentId, String)>>>,
}

impl MockAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Appointment> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn for_tenant(&self, tenant_id: TenantId) -> Vec<Appointment> {
        self.all().into_iter().filter(|a| a.tenant_id == tenant_id).collect()
    }

    pub fn seed(&self, appointment: Appointment) {
        self.rows.lock().unwrap().insert(appointment.id, appointment);
    }

    /// The next `get` of `id` returns the row as stored, then links it to
    /// `remote_id` as a propagation finishing in between would.
    pub fn link_after_next_read(&self, id: AppointmentId, remote_id: &str) {
        *self.link_after_read.lock().unwrap() = Some((id, remote_id.to_string()));
    }

    pub fn find(&self, id: AppointmentId) -> Option<Appointment> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn check_unique(
        rows: &HashMap<AppointmentId, Appointment>,
        candidate: &Appointment,
    ) -> DomainResult<()> {
        let Some(remote_id) = candidate.remote_id() else {
            return Ok(());
        };
        let clash = rows.values().any(|other| {
            other.id != candidate.id
                && other.tenant_id == candidate.tenant_id
                && other.remote_id() == Some(remote_id)
        });
        if clash {
            Err(CadenceError::Database("unique constraint violation".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AppointmentRepository for MockAppointmentRepository {
    async fn get(&self, id: &AppointmentId) -> DomainResult<Option<Appointment>> {
        let read = self.rows.lock().unwrap().get(id).cloned();
        let pending = {
            let mut slot = self.link_after_read.lock().unwrap();
            match slot.as_ref() {
                Some((target, _)) if target == id => slot.take(),
                _ => None,
            }
        };
        if let Some((target, remote_id)) = pending {
            self.record_remote_link(&target, &remote_id, "primary", Utc::now()).await?;
        }
        Ok(read)
    }

    async fn insert(&self, appointment: &Appointment) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        Self::check_unique(&rows, appointment)?;
        rows.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update(&self, appointment: &Appointment) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&appointment.id) {
            return Err(CadenceError::NotFound(format!("appointment {}", appointment.id)));
        }
        Self::check_unique(&rows, appointment)?;
        rows.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn apply_remote_changes(&self, appointment: &Appointment) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let stored = rows
            .get_mut(&appointment.id)
            .ok_or_else(|| CadenceError::NotFound(format!("appointment {}", appointment.id)))?;
        stored.title.clone_from(&appointment.title);
        stored.description.clone_from(&appointment.description);
        stored.location.clone_from(&appointment.location);
        stored.starts_at = appointment.starts_at;
        stored.ends_at = appointment.ends_at;
        stored.last_synced_at = appointment.last_synced_at;
        stored.updated_at = appointment.updated_at;
        Ok(())
    }

    async fn delete(&self, id: &AppointmentId) -> DomainResult<bool> {
        Ok(self.rows.lock().unwrap().remove(id).is_some())
    }

    async fn find_by_remote_event(
        &self,
        tenant_id: &TenantId,
        remote_event_id: &str,
    ) -> DomainResult<Option<Appointment>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|a| a.tenant_id == *tenant_id && a.remote_id() == Some(remote_event_id))
            .cloned())
    }

    async fn delete_by_remote_event(
        &self,
        tenant_id: &TenantId,
        remote_event_id: &str,
    ) -> DomainResult<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, a| !(a.tenant_id == *tenant_id && a.remote_id() == Some(remote_event_id)));
        Ok(before - rows.len())
    }

    async fn record_remote_link(
        &self,
        id: &AppointmentId,
        remote_event_id: &str,
        remote_calendar_id: &str,
        synced_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let mut updated = rows
            .get(id)
            .cloned()
            .ok_or_else(|| CadenceError::NotFound(format!("appointment {id}")))?;
        updated.remote_event_id = Some(remote_event_id.to_string());
        updated.remote_calendar_id = Some(remote_calendar_id.to_string());
        updated.last_synced_at = Some(synced_at);
        Self::check_unique(&rows, &updated)?;
        rows.insert(*id, updated);
        Ok(())
    }

    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DomainResult<Vec<Appointment>> {
        let mut due: Vec<Appointment> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.notify && !a.notified && a.starts_at >= from && a.starts_at <= until)
            .cloned()
            .collect();
        due.sort_by_key(|a| a.starts_at);
        Ok(due)
    }

    async fn mark_notified(&self, id: &AppointmentId) -> DomainResult<()> {
        if let Some(row) = self.rows.lock().unwrap().get_mut(id) {
            row.notified = true;
        }
        Ok(())
    }
}

/// In-memory channel store.
#[derive(Default, Clone)]
pub struct MockSyncChannelRepository {
    rows: Arc<Mutex<Vec<SyncChannel>>>,
    unreadable: Arc<Mutex<Vec<TenantId>>>,
}

impl MockSyncChannelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, channel: SyncChannel) {
        self.rows.lock().unwrap().push(channel);
    }

    pub fn all(&self) -> Vec<SyncChannel> {
        self.rows.lock().unwrap().clone()
    }

    /// Listing this tenant's channels fails from now on.
    pub fn fail_listing_for(&self, tenant_id: TenantId) {
        self.unreadable.lock().unwrap().push(tenant_id);
    }
}

#[async_trait]
impl SyncChannelRepository for MockSyncChannelRepository {
    async fn insert(&self, channel: &SyncChannel) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|c| c.channel_id == channel.channel_id) {
            return Err(CadenceError::Database("unique constraint violation".into()));
        }
        rows.push(channel.clone());
        Ok(())
    }

    async fn find_by_channel_id(&self, channel_id: &str) -> DomainResult<Option<SyncChannel>> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.channel_id == channel_id).cloned())
    }

    async fn latest_for_tenant(&self, tenant_id: &TenantId) -> DomainResult<Option<SyncChannel>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.tenant_id == *tenant_id)
            .max_by_key(|c| (c.created_at, c.id))
            .cloned())
    }

    async fn list_for_tenant(&self, tenant_id: &TenantId) -> DomainResult<Vec<SyncChannel>> {
        if self.unreadable.lock().unwrap().contains(tenant_id) {
            return Err(CadenceError::Database("database is locked".into()));
        }
        let mut channels: Vec<SyncChannel> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.tenant_id == *tenant_id)
            .cloned()
            .collect();
        channels.sort_by_key(|c| std::cmp::Reverse(c.created_at));
        Ok(channels)
    }

    async fn list_expiring_before(&self, deadline: DateTime<Utc>) -> DomainResult<Vec<SyncChannel>> {
        Ok(self.rows.lock().unwrap().iter().filter(|c| c.expires_at <= deadline).cloned().collect())
    }

    async fn update_cursor(&self, id: &Uuid, cursor: Option<&str>) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let channel = rows
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| CadenceError::NotFound(format!("channel {id}")))?;
        channel.sync_cursor = cursor.map(str::to_string);
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> DomainResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != *id);
        Ok(rows.len() != before)
    }
}

/// Fixed list of tenants.
#[derive(Default, Clone)]
pub struct MockTenantDirectory {
    tenants: Arc<Mutex<Vec<Tenant>>>,
}

impl MockTenantDirectory {
    pub fn add(&self, name: &str) -> TenantId {
        let id = TenantId::new();
        self.tenants.lock().unwrap().push(Tenant { id, name: name.to_string(), active: true });
        id
    }

    pub fn add_inactive(&self, name: &str) -> TenantId {
        let id = TenantId::new();
        self.tenants.lock().unwrap().push(Tenant { id, name: name.to_string(), active: false });
        id
    }
}

#[async_trait]
impl TenantDirectory for MockTenantDirectory {
    async fn active_tenants(&self) -> DomainResult<Vec<Tenant>> {
        Ok(self.tenants.lock().unwrap().iter().filter(|t| t.active).cloned().collect())
    }
}

/// Queue that records jobs instead of running them.
#[derive(Default, Clone)]
pub struct RecordingJobQueue {
    jobs: Arc<Mutex<Vec<ReconcileJob>>>,
}

impl RecordingJobQueue {
    pub fn jobs(&self) -> Vec<ReconcileJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl SyncJobQueue for RecordingJobQueue {
    fn enqueue(&self, job: ReconcileJob) -> DomainResult<()> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

/// Notifier that records what it was asked to send.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    confirmations: Arc<Mutex<Vec<AppointmentId>>>,
    reminders: Arc<Mutex<Vec<AppointmentId>>>,
    fail_for: Arc<Mutex<Vec<AppointmentId>>>,
}

impl RecordingNotifier {
    pub fn confirmations(&self) -> Vec<AppointmentId> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn reminders(&self) -> Vec<AppointmentId> {
        self.reminders.lock().unwrap().clone()
    }

    pub fn fail_for(&self, id: AppointmentId) {
        self.fail_for.lock().unwrap().push(id);
    }
}

#[async_trait]
impl AppointmentNotifier for RecordingNotifier {
    async fn send_confirmation(&self, appointment: &Appointment) -> DomainResult<()> {
        self.confirmations.lock().unwrap().push(appointment.id);
        Ok(())
    }

    async fn send_reminder(&self, appointment: &Appointment) -> DomainResult<()> {
        if self.fail_for.lock().unwrap().contains(&appointment.id) {
            return Err(CadenceError::Network("smtp unavailable".into()));
        }
        self.reminders.lock().unwrap().push(appointment.id);
        Ok(())
    }
}
