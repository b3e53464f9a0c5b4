#![allow(dead_code)]

use std::sync::Arc;

use cadence_domain::{Appointment, AppointmentDraft, SyncChannel, Tenant, TenantId};
use cadence_infra::database::DbManager;
use cadence_infra::SqliteTenantDirectory;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;
use uuid::Uuid;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a migrated temporary database.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("cadence-test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub async fn seed_tenant(&self, name: &str) -> Tenant {
        SqliteTenantDirectory::new(Arc::clone(&self.manager))
            .create(name)
            .await
            .expect("tenant should be created")
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 15, hour, 0, 0).unwrap()
}

pub fn appointment(tenant_id: TenantId, title: &str, starts_at: DateTime<Utc>) -> Appointment {
    Appointment::from_draft(
        tenant_id,
        AppointmentDraft {
            title: title.into(),
            description: "details".into(),
            starts_at,
            ends_at: starts_at + Duration::hours(1),
            location: "Room 4".into(),
            confirmed: true,
            notify: true,
        },
        at(8),
    )
}

pub fn channel(tenant_id: TenantId, channel_id: &str, created_at: DateTime<Utc>) -> SyncChannel {
    SyncChannel {
        id: Uuid::now_v7(),
        tenant_id,
        channel_id: channel_id.into(),
        resource_id: format!("res-{channel_id}"),
        remote_calendar_id: "primary".into(),
        expires_at: created_at + Duration::days(7),
        sync_cursor: None,
        created_at,
    }
}
