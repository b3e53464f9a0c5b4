//! SQLite implementation of the `AppointmentRepository` port.

use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::AppointmentRepository;
use cadence_domain::{Appointment, AppointmentId, CadenceError, Result, TenantId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::{debug, instrument};

use super::columns::{
    encode_time, map_join_error, optional_time_column, parsed_column, time_column,
};
use super::manager::DbManager;
use crate::errors::InfraError;

const SELECT_COLUMNS: &str = "SELECT id, tenant_id, title, description, starts_at, ends_at,
        location, confirmed, notify, notified, provenance, remote_event_id,
        remote_calendar_id, last_synced_at, created_at, updated_at
     FROM appointments";

pub struct SqliteAppointmentRepository {
    db: Arc<DbManager>,
}

impl SqliteAppointmentRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// All appointments of a tenant ordered by start time.
    pub async fn list_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<Appointment>> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<Appointment>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} WHERE tenant_id = ?1 ORDER BY starts_at"))
                .map_err(InfraError::from)?;
            let rows = stmt
                .query_map(params![tenant_id], map_appointment_row)
                .map_err(InfraError::from)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>().map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl AppointmentRepository for SqliteAppointmentRepository {
    async fn get(&self, id: &AppointmentId) -> Result<Option<Appointment>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<Option<Appointment>> {
            let conn = db.get_connection()?;
            Ok(conn
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                    params![id],
                    map_appointment_row,
                )
                .optional()
                .map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn insert(&self, appointment: &Appointment) -> Result<()> {
        let db = Arc::clone(&self.db);
        let appointment = appointment.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO appointments (
                    id, tenant_id, title, description, starts_at, ends_at, location,
                    confirmed, notify, notified, provenance, remote_event_id,
                    remote_calendar_id, last_synced_at, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    appointment.id.to_string(),
                    appointment.tenant_id.to_string(),
                    appointment.title,
                    appointment.description,
                    encode_time(appointment.starts_at),
                    encode_time(appointment.ends_at),
                    appointment.location,
                    appointment.confirmed,
                    appointment.notify,
                    appointment.notified,
                    appointment.provenance.as_str(),
                    appointment.remote_id(),
                    appointment.remote_calendar_id,
                    appointment.last_synced_at.map(encode_time),
                    encode_time(appointment.created_at),
                    encode_time(appointment.updated_at),
                ],
            )
            .map_err(InfraError::from)?;
            debug!("appointment inserted");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn update(&self, appointment: &Appointment) -> Result<()> {
        let db = Arc::clone(&self.db);
        let appointment = appointment.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE appointments SET
                        title = ?2, description = ?3, starts_at = ?4, ends_at = ?5,
                        location = ?6, confirmed = ?7, notify = ?8, notified = ?9,
                        provenance = ?10, remote_event_id = ?11, remote_calendar_id = ?12,
                        last_synced_at = ?13, updated_at = ?14
                     WHERE id = ?1",
                    params![
                        appointment.id.to_string(),
                        appointment.title,
                        appointment.description,
                        encode_time(appointment.starts_at),
                        encode_time(appointment.ends_at),
                        appointment.location,
                        appointment.confirmed,
                        appointment.notify,
                        appointment.notified,
                        appointment.provenance.as_str(),
                        appointment.remote_id(),
                        appointment.remote_calendar_id,
                        appointment.last_synced_at.map(encode_time),
                        encode_time(appointment.updated_at),
                    ],
                )
                .map_err(InfraError::from)?;

            if changed == 0 {
                return Err(CadenceError::NotFound(format!("appointment {}", appointment.id)));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    async fn apply_remote_changes(&self, appointment: &Appointment) -> Result<()> {
        let db = Arc::clone(&self.db);
        let appointment = appointment.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE appointments SET
                        title = ?2, description = ?3, starts_at = ?4, ends_at = ?5,
                        location = ?6, last_synced_at = ?7, updated_at = ?8
                     WHERE id = ?1",
                    params![
                        appointment.id.to_string(),
                        appointment.title,
                        appointment.description,
                        encode_time(appointment.starts_at),
                        encode_time(appointment.ends_at),
                        appointment.location,
                        appointment.last_synced_at.map(encode_time),
                        encode_time(appointment.updated_at),
                    ],
                )
                .map_err(InfraError::from)?;

            if changed == 0 {
                return Err(CadenceError::NotFound(format!("appointment {}", appointment.id)));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, id: &AppointmentId) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM appointments WHERE id = ?1", params![id])
                .map_err(InfraError::from)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_remote_event(
        &self,
        tenant_id: &TenantId,
        remote_event_id: &str,
    ) -> Result<Option<Appointment>> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let remote_event_id = remote_event_id.to_string();

        task::spawn_blocking(move || -> Result<Option<Appointment>> {
            let conn = db.get_connection()?;
            Ok(conn
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE tenant_id = ?1 AND remote_event_id = ?2"),
                    params![tenant_id, remote_event_id],
                    map_appointment_row,
                )
                .optional()
                .map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_by_remote_event(
        &self,
        tenant_id: &TenantId,
        remote_event_id: &str,
    ) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let remote_event_id = remote_event_id.to_string();

        task::spawn_blocking(move || -> Result<usize> {
            let conn = db.get_connection()?;
            Ok(conn
                .execute(
                    "DELETE FROM appointments WHERE tenant_id = ?1 AND remote_event_id = ?2",
                    params![tenant_id, remote_event_id],
                )
                .map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn record_remote_link(
        &self,
        id: &AppointmentId,
        remote_event_id: &str,
        remote_calendar_id: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let remote_event_id = remote_event_id.to_string();
        let remote_calendar_id = remote_calendar_id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE appointments
                     SET remote_event_id = ?2, remote_calendar_id = ?3, last_synced_at = ?4
                     WHERE id = ?1",
                    params![id, remote_event_id, remote_calendar_id, encode_time(synced_at)],
                )
                .map_err(InfraError::from)?;

            if changed == 0 {
                return Err(CadenceError::NotFound(format!("appointment {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Appointment>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<Appointment>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "{SELECT_COLUMNS}
                     WHERE notify = 1 AND notified = 0 AND starts_at >= ?1 AND starts_at <= ?2
                     ORDER BY starts_at"
                ))
                .map_err(InfraError::from)?;
            let rows = stmt
                .query_map(params![encode_time(from), encode_time(until)], map_appointment_row)
                .map_err(InfraError::from)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>().map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_notified(&self, id: &AppointmentId) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute("UPDATE appointments SET notified = 1 WHERE id = ?1", params![id])
                .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_appointment_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: parsed_column(row, 0)?,
        tenant_id: parsed_column(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        starts_at: time_column(row, 4)?,
        ends_at: time_column(row, 5)?,
        location: row.get(6)?,
        confirmed: row.get(7)?,
        notify: row.get(8)?,
        notified: row.get(9)?,
        provenance: parsed_column(row, 10)?,
        remote_event_id: row.get(11)?,
        remote_calendar_id: row.get(12)?,
        last_synced_at: optional_time_column(row, 13)?,
        created_at: time_column(row, 14)?,
        updated_at: time_column(row, 15)?,
    })
}
