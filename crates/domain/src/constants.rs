//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Provider event marker
pub const APPOINTMENT_MARKER_KEY: &str = "cadence_appointment_id";
pub const UNTITLED_EVENT_TITLE: &str = "(No title)";
pub const DEFAULT_TIME_ZONE: &str = "America/Sao_Paulo";

// Change feed
pub const DEFAULT_HISTORY_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_MAX_PAGES: usize = 50;

// Push channels
pub const DEFAULT_CHANNEL_TTL_DAYS: i64 = 14;
pub const DEFAULT_RENEWAL_LEAD_HOURS: i64 = 48;
pub const CHANNEL_TYPE_WEB_HOOK: &str = "web_hook";

// Reminders
pub const DEFAULT_REMINDER_WINDOW_HOURS: i64 = 24;

// Background retry
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;

// OAuth
pub const TOKEN_REFRESH_SKEW_SECS: i64 = 60;
