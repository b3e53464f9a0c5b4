//! Local appointment writes. Every write here is a local edit and is
//! propagated to the calendar when the provider is configured.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use cadence_domain::{Appointment, AppointmentDraft, AppointmentId};

use super::error::ApiError;
use super::tenants::existing_tenant;
use crate::AppContext;

/// `POST /tenants/{tenant_id}/appointments`
pub async fn create(
    State(ctx): State<Arc<AppContext>>,
    Path(tenant_id): Path<String>,
    Json(draft): Json<AppointmentDraft>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let tenant_id = existing_tenant(&ctx, &tenant_id).await.map_err(ApiError::from_write)?;
    let created = ctx.appointments.create(tenant_id, draft).await.map_err(ApiError::from_write)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /appointments/{id}`
pub async fn get(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let id = parse_id(&id)?;
    ctx.appointments.get(&id).await.map(Json).map_err(ApiError::from_write)
}

/// `PUT /appointments/{id}`
pub async fn update(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(draft): Json<AppointmentDraft>,
) -> Result<Json<Appointment>, ApiError> {
    let id = parse_id(&id)?;
    ctx.appointments.update(&id, draft).await.map(Json).map_err(ApiError::from_write)
}

/// `DELETE /appointments/{id}`
pub async fn delete(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    ctx.appointments.delete(&id).await.map_err(ApiError::from_write)?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(raw: &str) -> Result<AppointmentId, ApiError> {
    raw.parse().map_err(|_| ApiError::bad_request(format!("invalid appointment id: {raw}")))
}
