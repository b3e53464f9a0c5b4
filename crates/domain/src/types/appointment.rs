//! Appointment records and write provenance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AppointmentId, TenantId};
use crate::impl_str_enum;

/// Where an appointment was first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Created through the application.
    #[default]
    Local,
    /// Imported from the external calendar.
    Remote,
}

impl_str_enum!(Provenance {
    Local => "local",
    Remote => "remote",
});

/// Who is performing a write.
///
/// Every mutation through the appointment service carries an origin. Writes
/// with `Remote` origin are never echoed back to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// A user or collaborator action.
    Local,
    /// The reconciler applying provider changes.
    Remote,
}

impl WriteOrigin {
    pub const fn propagates(self) -> bool {
        matches!(self, Self::Local)
    }
}

/// A scheduled appointment owned by one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub tenant_id: TenantId,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: String,
    pub confirmed: bool,
    /// Whether the owner wants reminder notices.
    pub notify: bool,
    /// Set once a reminder was dispatched.
    pub notified: bool,
    pub provenance: Provenance,
    pub remote_event_id: Option<String>,
    pub remote_calendar_id: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Build a locally created appointment from user input.
    pub fn from_draft(tenant_id: TenantId, draft: AppointmentDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: AppointmentId::new(),
            tenant_id,
            title: draft.title,
            description: draft.description,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            location: draft.location,
            confirmed: draft.confirmed,
            notify: draft.notify,
            notified: false,
            provenance: Provenance::Local,
            remote_event_id: None,
            remote_calendar_id: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply user-editable fields from a draft.
    pub fn apply_draft(&mut self, draft: AppointmentDraft, now: DateTime<Utc>) {
        if draft.starts_at != self.starts_at {
            self.notified = false;
        }
        self.title = draft.title;
        self.description = draft.description;
        self.starts_at = draft.starts_at;
        self.ends_at = draft.ends_at;
        self.location = draft.location;
        self.confirmed = draft.confirmed;
        self.notify = draft.notify;
        self.updated_at = now;
    }

    /// The remote id, treating blank strings as "never synced".
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_event_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn is_linked(&self) -> bool {
        self.remote_id().is_some()
    }
}

/// User-editable appointment fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

const fn default_notify() -> bool {
    true
}

impl AppointmentDraft {
    /// Reject drafts that cannot be stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".into());
        }
        if self.title.chars().count() > 150 {
            return Err("title must be at most 150 characters".into());
        }
        if self.ends_at < self.starts_at {
            return Err("end must not precede start".into());
        }
        Ok(())
    }
}
