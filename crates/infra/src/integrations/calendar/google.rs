//! Google Calendar v3 implementation of the `CalendarProvider` port.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cadence_core::CalendarProvider;
use cadence_domain::constants::CHANNEL_TYPE_WEB_HOOK;
use cadence_domain::{
    Appointment, ChangeSet, ChannelDescriptor, Config, ProviderError, ProviderResult, RemoteEvent,
};
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::auth::AccessTokenSource;
use super::types::{
    EventBody, EventResource, EventsPage, StopRequest, WatchRequest, WatchResponse,
};

const PAGE_SIZE: &str = "250";

/// Which request a status code answers; 410 means different things.
#[derive(Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    ChangeFeed,
    Other,
}

pub struct GoogleCalendarClient {
    http: Client,
    tokens: AccessTokenSource,
    base_url: String,
    calendar_id: String,
    time_zone: String,
    history_window: Duration,
    max_pages: usize,
    channel_ttl: Duration,
    channel_token: Option<String>,
}

impl GoogleCalendarClient {
    /// Build a client from the application configuration.
    ///
    /// # Errors
    /// `ProviderError::Config` when credentials are missing or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config) -> ProviderResult<Self> {
        let provider = &config.provider;
        let http = Client::builder()
            .timeout(StdDuration::from_secs(provider.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))?;
        let tokens = AccessTokenSource::from_config(provider, http.clone())?;
        let history_window =
            config.sync.history_window().map_err(|e| ProviderError::Config(e.to_string()))?;
        let channel_ttl =
            config.webhook.channel_ttl().map_err(|e| ProviderError::Config(e.to_string()))?;

        Ok(Self {
            http,
            tokens,
            base_url: provider.api_base_url.trim_end_matches('/').to_string(),
            calendar_id: provider.calendar_id.clone(),
            time_zone: provider.time_zone.clone(),
            history_window,
            max_pages: config.sync.max_pages.max(1),
            channel_ttl,
            channel_token: config.webhook.channel_token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, urlencoding::encode(&self.calendar_id))
    }

    fn event_url(&self, remote_event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(remote_event_id))
    }

    async fn request(&self, method: Method, url: &str) -> ProviderResult<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(&self, builder: RequestBuilder, kind: RequestKind) -> ProviderResult<Response> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_status(status, kind, &body);
        if matches!(error, ProviderError::Auth(_)) {
            self.tokens.invalidate().await;
        }
        Err(error)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        kind: RequestKind,
    ) -> ProviderResult<T> {
        let response = self.send(builder, kind).await?;
        response.json::<T>().await.map_err(|e| ProviderError::Decode(e.to_string()))
    }

    fn changes_query(&self, cursor: Option<&str>, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![("singleEvents", "true".to_string()), ("maxResults", PAGE_SIZE.to_string())];
        match cursor {
            Some(token) => query.push(("syncToken", token.to_string())),
            None => {
                let time_min = Utc::now() - self.history_window;
                query.push(("timeMin", time_min.to_rfc3339_opts(SecondsFormat::Secs, true)));
            }
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        query
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn create_event(&self, appointment: &Appointment) -> ProviderResult<String> {
        let body = EventBody::from_appointment(appointment, &self.time_zone);
        let request = self.request(Method::POST, &self.events_url()).await?.json(&body);
        let created: EventResource = self.send_json(request, RequestKind::Other).await?;
        info!(remote_event_id = %created.id, "remote event created");
        Ok(created.id)
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn update_event(&self, appointment: &Appointment) -> ProviderResult<String> {
        let Some(remote_id) = appointment.remote_id() else {
            return self.create_event(appointment).await;
        };

        let body = EventBody::from_appointment(appointment, &self.time_zone);
        let request = self.request(Method::PUT, &self.event_url(remote_id)).await?.json(&body);
        let updated: EventResource = self.send_json(request, RequestKind::Other).await?;
        debug!(remote_event_id = %updated.id, "remote event updated");
        Ok(updated.id)
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn delete_event(&self, appointment: &Appointment) -> ProviderResult<()> {
        let Some(remote_id) = appointment.remote_id() else {
            return Ok(());
        };

        let request = self.request(Method::DELETE, &self.event_url(remote_id)).await?;
        self.send(request, RequestKind::Other).await?;
        info!(remote_event_id = remote_id, "remote event deleted");
        Ok(())
    }

    async fn get_event(&self, remote_event_id: &str) -> ProviderResult<Option<RemoteEvent>> {
        let request = self.request(Method::GET, &self.event_url(remote_event_id)).await?;
        match self.send_json::<EventResource>(request, RequestKind::Other).await {
            Ok(resource) => resource.into_remote_event().map(Some),
            Err(ProviderError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, cursor), fields(incremental = cursor.is_some()))]
    async fn list_changed_since(&self, cursor: Option<&str>) -> ProviderResult<ChangeSet> {
        let cursor = cursor.filter(|c| !c.trim().is_empty());
        let url = self.events_url();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for page_number in 1..=self.max_pages {
            let query = self.changes_query(cursor, page_token.as_deref());
            let request = self.request(Method::GET, &url).await?.query(&query);
            let page: EventsPage = self.send_json(request, RequestKind::ChangeFeed).await?;

            for resource in page.items {
                let id = resource.id.clone();
                match resource.into_remote_event() {
                    Ok(event) => events.push(event),
                    Err(err) => warn!(remote_event_id = %id, error = %err, "skipping undecodable event"),
                }
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => {
                    debug!(pages = page_number, events = events.len(), "change feed drained");
                    return Ok(ChangeSet {
                        events,
                        next_cursor: page.next_sync_token.filter(|t| !t.is_empty()),
                    });
                }
            }
        }

        Err(ProviderError::Rejected(format!(
            "change feed still paginating after {} pages",
            self.max_pages
        )))
    }

    #[instrument(skip(self))]
    async fn register_channel(&self, webhook_url: &str) -> ProviderResult<ChannelDescriptor> {
        let requested_expiry = Utc::now() + self.channel_ttl;
        let body = WatchRequest {
            id: Uuid::new_v4().to_string(),
            kind: CHANNEL_TYPE_WEB_HOOK.to_string(),
            address: webhook_url.to_string(),
            expiration: Some(requested_expiry.timestamp_millis().to_string()),
            token: self.channel_token.clone(),
        };

        let url = format!("{}/watch", self.events_url());
        let request = self.request(Method::POST, &url).await?.json(&body);
        let granted: WatchResponse = self.send_json(request, RequestKind::Other).await?;

        let expires_at = granted
            .expiration
            .as_deref()
            .and_then(parse_epoch_millis)
            .unwrap_or(requested_expiry);
        info!(channel_id = %granted.id, %expires_at, "push channel registered");

        Ok(ChannelDescriptor { channel_id: granted.id, resource_id: granted.resource_id, expires_at })
    }

    #[instrument(skip(self))]
    async fn cancel_channel(&self, channel_id: &str, resource_id: &str) -> ProviderResult<()> {
        let body =
            StopRequest { id: channel_id.to_string(), resource_id: resource_id.to_string() };
        let url = format!("{}/channels/stop", self.base_url);
        let request = self.request(Method::POST, &url).await?.json(&body);
        self.send(request, RequestKind::Other).await?;
        info!("push channel stopped");
        Ok(())
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Transient("request timed out".into())
    } else if err.is_connect() {
        ProviderError::Transient(format!("connection failed: {err}"))
    } else {
        ProviderError::Transient(err.to_string())
    }
}

fn classify_status(status: StatusCode, kind: RequestKind, body: &str) -> ProviderError {
    let message = format!("HTTP {}: {}", status.as_u16(), truncate(body));
    match status.as_u16() {
        410 if kind == RequestKind::ChangeFeed => ProviderError::CursorExpired,
        // Deleted resources answer 410 outside the change feed.
        404 | 410 => ProviderError::NotFound(message),
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::Transient(message),
        400..=499 => ProviderError::Rejected(message),
        _ => ProviderError::Transient(message),
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

fn parse_epoch_millis(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim().parse::<i64>().ok().and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}
