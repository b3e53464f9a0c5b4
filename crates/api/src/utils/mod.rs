//! Shared helpers for the HTTP layer and the binary.

pub mod health;
pub mod logging;
