//! Push-notification channel and change cursor

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::TenantId;
use super::remote::ChannelDescriptor;

/// A registered webhook channel together with the tenant's sync cursor.
///
/// A tenant may hold several channels while a renewal is in flight; the most
/// recently created one owns the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChannel {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub channel_id: String,
    pub resource_id: String,
    pub remote_calendar_id: String,
    pub expires_at: DateTime<Utc>,
    /// Opaque provider cursor. `None` means the next pass is a full resync.
    pub sync_cursor: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SyncChannel {
    pub fn from_descriptor(
        tenant_id: TenantId,
        remote_calendar_id: impl Into<String>,
        descriptor: ChannelDescriptor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            tenant_id,
            channel_id: descriptor.channel_id,
            resource_id: descriptor.resource_id,
            remote_calendar_id: remote_calendar_id.into(),
            expires_at: descriptor.expires_at,
            sync_cursor: None,
            created_at: now,
        }
    }

    /// Cursor with blank values normalized away.
    pub fn cursor(&self) -> Option<&str> {
        self.sync_cursor.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn expires_within(&self, now: DateTime<Utc>, lead: Duration) -> bool {
        self.expires_at <= now + lead
    }
}
