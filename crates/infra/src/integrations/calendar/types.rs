//! Google Calendar v3 wire types.

use std::collections::HashMap;

use cadence_domain::constants::APPOINTMENT_MARKER_KEY;
use cadence_domain::{
    Appointment, EventTime, ProviderError, ProviderResult, RemoteEvent, RemoteEventStatus,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Body sent on `events.insert` / `events.update`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: EventDateTimeBody,
    pub end: EventDateTimeBody,
    pub extended_properties: ExtendedProperties,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTimeBody {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedProperties {
    #[serde(default)]
    pub private: HashMap<String, String>,
}

impl EventBody {
    /// Build the outgoing event, tagging it with the appointment marker.
    pub fn from_appointment(appointment: &Appointment, time_zone: &str) -> Self {
        let mut private = HashMap::new();
        private.insert(APPOINTMENT_MARKER_KEY.to_string(), appointment.id.to_string());

        Self {
            summary: appointment.title.clone(),
            description: appointment.description.clone(),
            location: appointment.location.clone(),
            start: EventDateTimeBody::new(appointment.starts_at, time_zone),
            end: EventDateTimeBody::new(appointment.ends_at, time_zone),
            extended_properties: ExtendedProperties { private },
        }
    }
}

impl EventDateTimeBody {
    fn new(instant: DateTime<Utc>, time_zone: &str) -> Self {
        Self {
            date_time: instant.to_rfc3339_opts(SecondsFormat::Secs, true),
            time_zone: time_zone.to_string(),
        }
    }
}

/// Event resource as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResource {
    pub id: String,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
    pub extended_properties: Option<ExtendedProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

impl EventDateTime {
    fn parse(&self) -> ProviderResult<Option<EventTime>> {
        if let Some(raw) = self.date_time.as_deref() {
            return DateTime::parse_from_rfc3339(raw)
                .map(|instant| Some(EventTime::At(instant.with_timezone(&Utc))))
                .map_err(|e| ProviderError::Decode(format!("invalid dateTime '{raw}': {e}")));
        }
        if let Some(raw) = self.date.as_deref() {
            return NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|date| Some(EventTime::AllDay(date)))
                .map_err(|e| ProviderError::Decode(format!("invalid date '{raw}': {e}")));
        }
        Ok(None)
    }
}

impl EventResource {
    pub fn into_remote_event(self) -> ProviderResult<RemoteEvent> {
        let status = match self.status.as_deref() {
            Some("cancelled") => RemoteEventStatus::Cancelled,
            _ => RemoteEventStatus::Active,
        };
        let start = self.start.as_ref().map(EventDateTime::parse).transpose()?.flatten();
        let end = self.end.as_ref().map(EventDateTime::parse).transpose()?.flatten();
        let marker = self
            .extended_properties
            .and_then(|mut props| props.private.remove(APPOINTMENT_MARKER_KEY));

        Ok(RemoteEvent {
            id: self.id,
            status,
            summary: self.summary,
            description: self.description,
            location: self.location,
            start,
            end,
            marker,
        })
    }
}

/// One page of `events.list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    #[serde(default)]
    pub items: Vec<EventResource>,
    pub next_page_token: Option<String>,
    pub next_sync_token: Option<String>,
}

/// Body of `events.watch`.
#[derive(Debug, Clone, Serialize)]
pub struct WatchRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub address: String,
    /// Requested expiry in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchResponse {
    pub id: String,
    pub resource_id: String,
    /// Granted expiry in epoch milliseconds; the API encodes it as a string.
    pub expiration: Option<String>,
}

/// Body of `channels.stop`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRequest {
    pub id: String,
    pub resource_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
}
