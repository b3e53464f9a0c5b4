//! Operator actions per tenant: manual sync and channel registration.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use cadence_domain::{CadenceError, ReconcileSummary, SyncMode, TenantId};
use cadence_core::TenantSyncReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::utils::logging::log_action;
use crate::AppContext;

#[derive(Debug, Default, Deserialize)]
pub struct SyncParams {
    /// Ignore the stored cursor and pull everything.
    #[serde(default)]
    pub full: bool,
}

#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub channel_id: String,
    pub resource_id: String,
    pub expires_at: DateTime<Utc>,
    pub summary: ReconcileSummary,
}

#[derive(Debug, Serialize)]
pub struct UnregisterResponse {
    pub removed: usize,
}

/// `POST /tenants/{tenant_id}/sync`
pub async fn sync(
    State(ctx): State<Arc<AppContext>>,
    Path(tenant_id): Path<String>,
    Query(params): Query<SyncParams>,
) -> Result<Json<TenantSyncReport>, ApiError> {
    const ACTION: &str = "sync";
    let started = Instant::now();
    let mode = if params.full { SyncMode::Full } else { SyncMode::Incremental };

    let result = async {
        let tenant_id = existing_tenant(&ctx, &tenant_id).await?;
        ctx.sync_services()?.sync.sync_tenant(tenant_id, mode).await
    }
    .await;

    log_action("tenants::sync", started.elapsed(), result.is_ok());
    result.map(Json).map_err(|err| ApiError::action_failed(ACTION, &err))
}

/// `POST /tenants/{tenant_id}/channels`
pub async fn register_channel(
    State(ctx): State<Arc<AppContext>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<ChannelResponse>, ApiError> {
    const ACTION: &str = "channel registration";
    let started = Instant::now();

    let result = async {
        let tenant_id = existing_tenant(&ctx, &tenant_id).await?;
        ctx.sync_services()?.channels.register(tenant_id).await
    }
    .await;

    log_action("tenants::register_channel", started.elapsed(), result.is_ok());
    let registration = result.map_err(|err| ApiError::action_failed(ACTION, &err))?;
    Ok(Json(ChannelResponse {
        channel_id: registration.channel.channel_id,
        resource_id: registration.channel.resource_id,
        expires_at: registration.channel.expires_at,
        summary: registration.outcome.summary,
    }))
}

/// `DELETE /tenants/{tenant_id}/channels`
pub async fn unregister_channels(
    State(ctx): State<Arc<AppContext>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<UnregisterResponse>, ApiError> {
    const ACTION: &str = "channel removal";
    let started = Instant::now();

    let result = async {
        let tenant_id = existing_tenant(&ctx, &tenant_id).await?;
        ctx.sync_services()?.channels.unregister_tenant(tenant_id).await
    }
    .await;

    log_action("tenants::unregister_channels", started.elapsed(), result.is_ok());
    result
        .map(|removed| Json(UnregisterResponse { removed }))
        .map_err(|err| ApiError::action_failed(ACTION, &err))
}

/// Parse the path id and make sure the tenant exists.
pub(crate) async fn existing_tenant(ctx: &AppContext, raw: &str) -> Result<TenantId, CadenceError> {
    let tenant_id: TenantId = raw
        .parse()
        .map_err(|_| CadenceError::NotFound(format!("tenant {raw}")))?;
    ctx.tenants
        .get(&tenant_id)
        .await?
        .map(|tenant| tenant.id)
        .ok_or_else(|| CadenceError::NotFound(format!("tenant {tenant_id}")))
}
