//! # Cadence Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - SQLite persistence for tenants, appointments and push channels
//! - The Google Calendar v3 client
//! - Configuration loading
//! - Cron schedulers and the reconcile worker
//!
//! ## Architecture
//! - Implements traits defined in `cadence-core`
//! - Contains all "impure" code (I/O, HTTP, timers)

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;
pub mod notifier;
pub mod scheduling;
pub mod sync;

pub use database::{
    DbManager, SqliteAppointmentRepository, SqliteSyncChannelRepository, SqliteTenantDirectory,
};
pub use errors::InfraError;
pub use integrations::calendar::GoogleCalendarClient;
pub use notifier::LogNotifier;
pub use sync::{ChannelJobQueue, ReconcileWorker, ReconcileWorkerConfig};
