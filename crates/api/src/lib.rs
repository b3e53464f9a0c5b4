//! # Cadence API
//!
//! Application layer - HTTP routes, wiring and the `cadence` binary.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - `axum` routes for the webhook, operator actions and appointment writes
//! - Logging setup
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod context;
pub mod routes;
pub mod utils;

pub use context::{AppContext, SyncServices};
pub use routes::router;
