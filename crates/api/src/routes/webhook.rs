//! `POST /calendar/webhook`

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use cadence_domain::{IngressOutcome, WebhookNotification};
use tracing::{debug, error};

use crate::AppContext;

pub const CHANNEL_ID_HEADER: &str = "x-goog-channel-id";
pub const RESOURCE_ID_HEADER: &str = "x-goog-resource-id";
pub const RESOURCE_STATE_HEADER: &str = "x-goog-resource-state";
pub const CHANNEL_TOKEN_HEADER: &str = "x-goog-channel-token";
pub const MESSAGE_NUMBER_HEADER: &str = "x-goog-message-number";

/// Acknowledge a push notification. The body is ignored.
pub async fn receive(State(ctx): State<Arc<AppContext>>, headers: HeaderMap) -> StatusCode {
    let Some(notification) = parse_notification(&headers) else {
        debug!("Notification without channel id");
        return StatusCode::BAD_REQUEST;
    };

    match ctx.ingress.handle(&notification).await {
        Ok(outcome) => {
            if let IngressOutcome::Enqueued { tenant_id } = &outcome {
                debug!(tenant_id = %tenant_id, channel_id = %notification.channel_id, "Reconcile queued");
            }
            debug!(outcome = outcome.as_str(), "Notification acknowledged");
            StatusCode::OK
        }
        Err(err) => {
            error!(channel_id = %notification.channel_id, error = %err, "Notification handling failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn parse_notification(headers: &HeaderMap) -> Option<WebhookNotification> {
    let channel_id = header(headers, CHANNEL_ID_HEADER)?;

    Some(WebhookNotification {
        channel_id,
        resource_id: header(headers, RESOURCE_ID_HEADER),
        resource_state: header(headers, RESOURCE_STATE_HEADER).unwrap_or_default(),
        channel_token: header(headers, CHANNEL_TOKEN_HEADER),
        message_number: header(headers, MESSAGE_NUMBER_HEADER).and_then(|raw| raw.parse().ok()),
    })
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
