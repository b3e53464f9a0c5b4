//! Provider-side view of calendar events and channels

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::ids::AppointmentId;

/// Lifecycle state reported for a remote event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteEventStatus {
    Active,
    Cancelled,
}

/// Start or end of a remote event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    /// A precise instant.
    At(DateTime<Utc>),
    /// An all-day date without time of day.
    AllDay(NaiveDate),
}

impl EventTime {
    /// Normalize to an instant. All-day dates become midnight UTC.
    pub fn to_utc(self) -> DateTime<Utc> {
        match self {
            Self::At(instant) => instant,
            Self::AllDay(date) => Utc.from_utc_datetime(&date.and_time(NaiveTime::default())),
        }
    }
}

/// One changed event from the provider's change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub id: String,
    pub status: RemoteEventStatus,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    /// Raw value of the private marker property, if the event originated here.
    pub marker: Option<String>,
}

impl RemoteEvent {
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.status, RemoteEventStatus::Cancelled)
    }

    /// Marker parsed as a local appointment id. Unparseable markers are ignored.
    pub fn marker_id(&self) -> Option<AppointmentId> {
        self.marker.as_deref().and_then(|raw| raw.parse().ok())
    }

    pub fn start_or(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        self.start.map_or(fallback, EventTime::to_utc)
    }

    pub fn end_or(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        self.end.map_or(fallback, EventTime::to_utc)
    }
}

/// Result of a change-feed pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub events: Vec<RemoteEvent>,
    /// Cursor to use on the next incremental pull.
    pub next_cursor: Option<String>,
}

/// Channel metadata returned by the provider on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub channel_id: String,
    pub resource_id: String,
    pub expires_at: DateTime<Utc>,
}
