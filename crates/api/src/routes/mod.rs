//! HTTP surface: webhook ingress, operator actions, appointment writes and
//! health.

pub mod appointments;
pub mod error;
pub mod health;
pub mod tenants;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::AppContext;

pub use error::ApiError;

/// Build the application router.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/calendar/webhook", post(webhook::receive))
        .route("/tenants/{tenant_id}/sync", post(tenants::sync))
        .route(
            "/tenants/{tenant_id}/channels",
            post(tenants::register_channel).delete(tenants::unregister_channels),
        )
        .route("/tenants/{tenant_id}/appointments", post(appointments::create))
        .route(
            "/appointments/{id}",
            get(appointments::get).put(appointments::update).delete(appointments::delete),
        )
        .route("/health", get(health::check))
        .with_state(ctx)
}
