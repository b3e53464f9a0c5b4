//! SQLite tenant directory.

use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::TenantDirectory;
use cadence_domain::{CadenceError, Result, Tenant, TenantId};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::info;

use super::columns::{encode_time, map_join_error, parsed_column};
use super::manager::DbManager;
use crate::errors::InfraError;

pub struct SqliteTenantDirectory {
    db: Arc<DbManager>,
}

impl SqliteTenantDirectory {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Provision a new active tenant.
    pub async fn create(&self, name: &str) -> Result<Tenant> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(CadenceError::InvalidInput("tenant name must not be empty".into()));
        }

        let db = Arc::clone(&self.db);
        let tenant = Tenant { id: TenantId::new(), name, active: true };
        let row = tenant.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO tenants (id, name, active, created_at) VALUES (?1, ?2, 1, ?3)",
                params![row.id.to_string(), row.name, encode_time(Utc::now())],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)??;

        info!(tenant_id = %tenant.id, name = %tenant.name, "tenant created");
        Ok(tenant)
    }

    pub async fn get(&self, id: &TenantId) -> Result<Option<Tenant>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<Option<Tenant>> {
            let conn = db.get_connection()?;
            Ok(conn
                .query_row(
                    "SELECT id, name, active FROM tenants WHERE id = ?1",
                    params![id],
                    map_tenant_row,
                )
                .optional()
                .map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Every tenant, active or not, ordered by name.
    pub async fn list(&self) -> Result<Vec<Tenant>> {
        self.select("SELECT id, name, active FROM tenants ORDER BY name").await
    }

    pub async fn set_active(&self, id: &TenantId, active: bool) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute("UPDATE tenants SET active = ?2 WHERE id = ?1", params![id, active])
                .map_err(InfraError::from)?;
            if changed == 0 {
                return Err(CadenceError::NotFound(format!("tenant {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn select(&self, sql: &'static str) -> Result<Vec<Tenant>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<Tenant>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(sql).map_err(InfraError::from)?;
            let rows = stmt.query_map([], map_tenant_row).map_err(InfraError::from)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>().map_err(InfraError::from)?)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl TenantDirectory for SqliteTenantDirectory {
    async fn active_tenants(&self) -> Result<Vec<Tenant>> {
        self.select("SELECT id, name, active FROM tenants WHERE active = 1 ORDER BY name").await
    }
}

fn map_tenant_row(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant { id: parsed_column(row, 0)?, name: row.get(1)?, active: row.get(2)? })
}
