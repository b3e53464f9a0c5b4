//! Push notification routing

use std::sync::Arc;

use cadence_domain::{IngressOutcome, ReconcileJob, ResourceState, Result, WebhookNotification};
use tracing::{debug, info, instrument, warn};

use super::ports::{SyncChannelRepository, SyncJobQueue};

/// Turns provider push notifications into queued reconciliation jobs.
///
/// Never waits for reconciliation; the caller acknowledges as soon as this
/// returns.
pub struct WebhookIngress {
    channels: Arc<dyn SyncChannelRepository>,
    queue: Arc<dyn SyncJobQueue>,
    channel_token: Option<String>,
}

impl WebhookIngress {
    pub fn new(channels: Arc<dyn SyncChannelRepository>, queue: Arc<dyn SyncJobQueue>) -> Self {
        Self { channels, queue, channel_token: None }
    }

    /// Require notifications to echo this verification token.
    pub fn with_channel_token(mut self, token: Option<String>) -> Self {
        self.channel_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// # Errors
    /// Store lookups or a closed queue. Unknown or mismatched channels are
    /// outcomes, not errors.
    #[instrument(skip(self, notification), fields(channel_id = %notification.channel_id, state = %notification.resource_state))]
    pub async fn handle(&self, notification: &WebhookNotification) -> Result<IngressOutcome> {
        match notification.state() {
            Some(ResourceState::Sync) => {
                debug!("Channel handshake acknowledged");
                return Ok(IngressOutcome::Handshake);
            }
            Some(ResourceState::Exists) => {}
            Some(ResourceState::NotExists) | None => {
                debug!("Notification state ignored");
                return Ok(IngressOutcome::Ignored);
            }
        }

        let Some(channel) = self.channels.find_by_channel_id(&notification.channel_id).await? else {
            warn!("Notification for unknown channel");
            return Ok(IngressOutcome::UnknownChannel);
        };

        if let Some(resource_id) = notification.resource_id.as_deref() {
            if resource_id != channel.resource_id {
                warn!(resource_id, expected = %channel.resource_id, "Resource id mismatch");
                return Ok(IngressOutcome::Rejected { reason: "resource_mismatch" });
            }
        }

        if let Some(expected) = self.channel_token.as_deref() {
            if notification.channel_token.as_deref() != Some(expected) {
                warn!("Channel token mismatch");
                return Ok(IngressOutcome::Rejected { reason: "token_mismatch" });
            }
        }

        self.queue.enqueue(ReconcileJob {
            tenant_id: channel.tenant_id,
            cursor: channel.cursor().map(str::to_owned),
            channel_id: Some(channel.channel_id.clone()),
        })?;

        info!(tenant_id = %channel.tenant_id, message_number = ?notification.message_number, "Reconciliation enqueued");
        Ok(IngressOutcome::Enqueued { tenant_id: channel.tenant_id })
    }
}
