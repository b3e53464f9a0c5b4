//! Calendar provider port interface

use async_trait::async_trait;
use cadence_domain::{Appointment, ChangeSet, ChannelDescriptor, ProviderResult, RemoteEvent};

/// Operations the sync engine needs from the external calendar.
///
/// Implementations classify failures into [`cadence_domain::ProviderError`]
/// so callers can tell a retryable transport failure from an expired cursor.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Identifier of the calendar events are written to.
    fn calendar_id(&self) -> &str;

    /// Create a remote event for the appointment and return its id.
    async fn create_event(&self, appointment: &Appointment) -> ProviderResult<String>;

    /// Update the linked remote event, creating one when the appointment has
    /// no remote id yet. Returns the remote id now linked.
    async fn update_event(&self, appointment: &Appointment) -> ProviderResult<String>;

    /// Delete the linked remote event. No-op for unlinked appointments.
    async fn delete_event(&self, appointment: &Appointment) -> ProviderResult<()>;

    /// Fetch one event. `None` when the provider no longer knows it.
    async fn get_event(&self, remote_event_id: &str) -> ProviderResult<Option<RemoteEvent>>;

    /// Pull every change since `cursor`, following continuation tokens.
    ///
    /// With no cursor, pulls a bounded historical window plus all future
    /// events. An expired cursor yields `ProviderError::CursorExpired`.
    async fn list_changed_since(&self, cursor: Option<&str>) -> ProviderResult<ChangeSet>;

    /// Open a push-notification channel targeting `webhook_url`.
    async fn register_channel(&self, webhook_url: &str) -> ProviderResult<ChannelDescriptor>;

    /// Stop a push-notification channel.
    async fn cancel_channel(&self, channel_id: &str, resource_id: &str) -> ProviderResult<()>;
}
