//! SQLite persistence: connection pool, schema and repositories.

mod columns;

pub mod appointment_repository;
pub mod channel_repository;
pub mod manager;
pub mod tenant_repository;

pub use appointment_repository::SqliteAppointmentRepository;
pub use channel_repository::SqliteSyncChannelRepository;
pub use manager::{DbManager, SqliteConnection};
pub use tenant_repository::SqliteTenantDirectory;
