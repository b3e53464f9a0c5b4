use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cadence_core::CalendarProvider;
use cadence_domain::{
    Appointment, AppointmentId, ChangeSet, ChannelDescriptor, ProviderError, ProviderResult,
    RemoteEvent,
};
use chrono::{Duration, Utc};

/// Scripted in-memory calendar provider.
///
/// `list_changed_since` answers from a queue of prepared responses (an empty
/// change set once the queue is drained). Every call is recorded so tests can
/// assert on what reached the provider.
#[derive(Default, Clone)]
pub struct MockCalendarProvider {
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Default)]
struct ProviderState {
    responses: VecDeque<ProviderResult<ChangeSet>>,
    list_calls: Vec<Option<String>>,
    created: Vec<AppointmentId>,
    updated: Vec<AppointmentId>,
    deleted: Vec<String>,
    registered: Vec<String>,
    cancelled: Vec<(String, String)>,
    write_error: Option<ProviderError>,
    register_error: Option<ProviderError>,
    cancel_error: Option<ProviderError>,
    sequence: usize,
    list_delay: Option<StdDuration>,
    lists_in_flight: usize,
    max_lists_in_flight: usize,
}

impl MockCalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_changes(&self, changes: ChangeSet) {
        self.state.lock().unwrap().responses.push_back(Ok(changes));
    }

    pub fn push_events(&self, events: Vec<RemoteEvent>, next_cursor: Option<&str>) {
        self.push_changes(ChangeSet { events, next_cursor: next_cursor.map(str::to_string) });
    }

    pub fn push_error(&self, error: ProviderError) {
        self.state.lock().unwrap().responses.push_back(Err(error));
    }

    pub fn fail_writes_with(&self, error: ProviderError) {
        self.state.lock().unwrap().write_error = Some(error);
    }

    pub fn fail_register_with(&self, error: ProviderError) {
        self.state.lock().unwrap().register_error = Some(error);
    }

    pub fn fail_cancel_with(&self, error: ProviderError) {
        self.state.lock().unwrap().cancel_error = Some(error);
    }

    /// Hold every `list_changed_since` call open for `delay`.
    pub fn delay_lists(&self, delay: StdDuration) {
        self.state.lock().unwrap().list_delay = Some(delay);
    }

    /// Highest number of `list_changed_since` calls seen running at once.
    pub fn max_lists_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_lists_in_flight
    }

    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().list_calls.clone()
    }

    pub fn created(&self) -> Vec<AppointmentId> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn updated(&self) -> Vec<AppointmentId> {
        self.state.lock().unwrap().updated.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn registered(&self) -> Vec<String> {
        self.state.lock().unwrap().registered.clone()
    }

    pub fn cancelled(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// Number of event writes (create, update, delete) that reached the provider.
    pub fn write_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.created.len() + state.updated.len() + state.deleted.len()
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    fn calendar_id(&self) -> &str {
        "primary"
    }

    async fn create_event(&self, appointment: &Appointment) -> ProviderResult<String> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.write_error.clone() {
            return Err(err);
        }
        state.sequence += 1;
        state.created.push(appointment.id);
        Ok(format!("remote-{}", state.sequence))
    }

    async fn update_event(&self, appointment: &Appointment) -> ProviderResult<String> {
        let Some(remote_id) = appointment.remote_id().map(str::to_string) else {
            return self.create_event(appointment).await;
        };
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.write_error.clone() {
            return Err(err);
        }
        state.updated.push(appointment.id);
        Ok(remote_id)
    }

    async fn delete_event(&self, appointment: &Appointment) -> ProviderResult<()> {
        let Some(remote_id) = appointment.remote_id() else {
            return Ok(());
        };
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.write_error.clone() {
            return Err(err);
        }
        state.deleted.push(remote_id.to_string());
        Ok(())
    }

    async fn get_event(&self, _remote_event_id: &str) -> ProviderResult<Option<RemoteEvent>> {
        Ok(None)
    }

    async fn list_changed_since(&self, cursor: Option<&str>) -> ProviderResult<ChangeSet> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.list_calls.push(cursor.map(str::to_string));
            state.lists_in_flight += 1;
            state.max_lists_in_flight = state.max_lists_in_flight.max(state.lists_in_flight);
            state.list_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.lists_in_flight -= 1;
        state.responses.pop_front().unwrap_or_else(|| Ok(ChangeSet::default()))
    }

    async fn register_channel(&self, webhook_url: &str) -> ProviderResult<ChannelDescriptor> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.register_error.clone() {
            return Err(err);
        }
        state.sequence += 1;
        state.registered.push(webhook_url.to_string());
        Ok(ChannelDescriptor {
            channel_id: format!("channel-{}", state.sequence),
            resource_id: format!("resource-{}", state.sequence),
            expires_at: Utc::now() + Duration::days(14),
        })
    }

    async fn cancel_channel(&self, channel_id: &str, resource_id: &str) -> ProviderResult<()> {
        let mut state = self.state.lock().unwrap();
        state.cancelled.push((channel_id.to_string(), resource_id.to_string()));
        match state.cancel_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
