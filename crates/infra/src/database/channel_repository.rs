//! SQLite implementation of the `SyncChannelRepository` port (the change
//! cursor store).

use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::SyncChannelRepository;
use cadence_domain::{CadenceError, Result, SyncChannel, TenantId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::columns::{encode_time, map_join_error, parsed_column, time_column};
use super::manager::DbManager;
use crate::errors::InfraError;

const SELECT_COLUMNS: &str = "SELECT id, tenant_id, channel_id, resource_id, remote_calendar_id,
        expires_at, sync_cursor, created_at
     FROM sync_channels";

pub struct SqliteSyncChannelRepository {
    db: Arc<DbManager>,
}

impl SqliteSyncChannelRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn query_many(&self, sql: String, arg: String) -> Result<Vec<SyncChannel>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<SyncChannel>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(&sql).map_err(InfraError::from)?;
            let rows = stmt.query_map(params![arg], map_channel_row).map_err(InfraError::from)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>().map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn query_one(&self, sql: String, arg: String) -> Result<Option<SyncChannel>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Option<SyncChannel>> {
            let conn = db.get_connection()?;
            Ok(conn
                .query_row(&sql, params![arg], map_channel_row)
                .optional()
                .map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SyncChannelRepository for SqliteSyncChannelRepository {
    #[instrument(skip(self, channel), fields(channel_id = %channel.channel_id, tenant_id = %channel.tenant_id))]
    async fn insert(&self, channel: &SyncChannel) -> Result<()> {
        let db = Arc::clone(&self.db);
        let channel = channel.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sync_channels (
                    id, tenant_id, channel_id, resource_id, remote_calendar_id,
                    expires_at, sync_cursor, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    channel.id.to_string(),
                    channel.tenant_id.to_string(),
                    channel.channel_id,
                    channel.resource_id,
                    channel.remote_calendar_id,
                    encode_time(channel.expires_at),
                    channel.cursor(),
                    encode_time(channel.created_at),
                ],
            )
            .map_err(InfraError::from)?;
            debug!("sync channel stored");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<SyncChannel>> {
        self.query_one(format!("{SELECT_COLUMNS} WHERE channel_id = ?1"), channel_id.to_string())
            .await
    }

    async fn latest_for_tenant(&self, tenant_id: &TenantId) -> Result<Option<SyncChannel>> {
        self.query_one(
            format!("{SELECT_COLUMNS} WHERE tenant_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1"),
            tenant_id.to_string(),
        )
        .await
    }

    async fn list_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<SyncChannel>> {
        self.query_many(
            format!("{SELECT_COLUMNS} WHERE tenant_id = ?1 ORDER BY created_at DESC, id DESC"),
            tenant_id.to_string(),
        )
        .await
    }

    async fn list_expiring_before(&self, deadline: DateTime<Utc>) -> Result<Vec<SyncChannel>> {
        self.query_many(
            format!("{SELECT_COLUMNS} WHERE expires_at <= ?1 ORDER BY expires_at"),
            encode_time(deadline),
        )
        .await
    }

    async fn update_cursor(&self, id: &Uuid, cursor: Option<&str>) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let cursor = cursor.map(str::to_string);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE sync_channels SET sync_cursor = ?2 WHERE id = ?1",
                    params![id, cursor],
                )
                .map_err(InfraError::from)?;

            if changed == 0 {
                return Err(CadenceError::NotFound(format!("sync channel {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM sync_channels WHERE id = ?1", params![id])
                .map_err(InfraError::from)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_channel_row(row: &Row<'_>) -> rusqlite::Result<SyncChannel> {
    Ok(SyncChannel {
        id: parsed_column(row, 0)?,
        tenant_id: parsed_column(row, 1)?,
        channel_id: row.get(2)?,
        resource_id: row.get(3)?,
        remote_calendar_id: row.get(4)?,
        expires_at: time_column(row, 5)?,
        sync_cursor: row.get(6)?,
        created_at: time_column(row, 7)?,
    })
}
