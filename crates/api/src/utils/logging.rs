//! Tracing subscriber setup for the binary.

use std::time::Duration;

use cadence_domain::LoggingConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. `format = "json"` switches to
/// one JSON object per line; anything else is human-readable text.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.format.eq_ignore_ascii_case("json") {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.compact().try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Log the outcome of an operator action with structured fields.
///
/// `action` is a stable identifier such as `"tenants::sync"`; never pass
/// request data through it.
#[inline]
pub fn log_action(action: &str, elapsed: Duration, success: bool) {
    let duration_ms = elapsed.as_millis() as u64;

    if success {
        info!(action, duration_ms, "action_succeeded");
    } else {
        warn!(action, duration_ms, "action_failed");
    }
}
