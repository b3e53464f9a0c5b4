//! Configuration structures
//!
//! Every section has defaults so a partial file (or no file at all) still
//! yields a usable configuration. Provider and webhook settings are checked
//! lazily by the operations that need them.

use std::ops::RangeInclusive;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CHANNEL_TTL_DAYS, DEFAULT_HISTORY_WINDOW_DAYS, DEFAULT_MAX_PAGES,
    DEFAULT_REMINDER_WINDOW_HOURS, DEFAULT_RENEWAL_LEAD_HOURS, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_TIME_ZONE,
};
use crate::{CadenceError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub webhook: WebhookConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "cadence.db".into(), pool_size: 4 }
    }
}

/// Google Calendar access.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_base_url: String,
    pub token_url: String,
    pub calendar_id: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    /// Pre-issued bearer token; bypasses the refresh grant.
    pub access_token: Option<String>,
    pub time_zone: String,
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/calendar/v3".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            calendar_id: "primary".into(),
            client_id: None,
            client_secret: None,
            refresh_token: None,
            access_token: None,
            time_zone: DEFAULT_TIME_ZONE.into(),
            request_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_base_url", &self.api_base_url)
            .field("token_url", &self.token_url)
            .field("calendar_id", &self.calendar_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("time_zone", &self.time_zone)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// True when either a static token or a complete refresh-token grant is set.
    pub fn is_configured(&self) -> bool {
        has_value(self.access_token.as_deref())
            || (has_value(self.client_id.as_deref())
                && has_value(self.client_secret.as_deref())
                && has_value(self.refresh_token.as_deref()))
    }

    /// # Errors
    /// Returns `CadenceError::Config` naming the missing settings.
    pub fn validate(&self) -> Result<()> {
        if self.calendar_id.trim().is_empty() {
            return Err(CadenceError::Config("provider.calendar_id is empty".into()));
        }
        if self.is_configured() {
            return Ok(());
        }

        let missing: Vec<&str> = [
            ("provider.client_id", self.client_id.as_deref()),
            ("provider.client_secret", self.client_secret.as_deref()),
            ("provider.refresh_token", self.refresh_token.as_deref()),
        ]
        .into_iter()
        .filter(|(_, value)| !has_value(*value))
        .map(|(name, _)| name)
        .collect();

        Err(CadenceError::Config(format!(
            "calendar provider credentials missing: {}",
            missing.join(", ")
        )))
    }
}

/// Inbound push notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub bind_address: String,
    /// Public URL the provider posts notifications to.
    pub public_url: Option<String>,
    pub channel_ttl_days: i64,
    /// Verification token echoed back by the provider on every notification.
    pub channel_token: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            public_url: None,
            channel_ttl_days: DEFAULT_CHANNEL_TTL_DAYS,
            channel_token: None,
        }
    }
}

impl WebhookConfig {
    /// # Errors
    /// Returns `CadenceError::Config` when no public URL is configured.
    pub fn require_public_url(&self) -> Result<&str> {
        self.public_url.as_deref().filter(|url| !url.trim().is_empty()).ok_or_else(|| {
            CadenceError::Config("webhook.public_url is required to register channels".into())
        })
    }

    /// Requested push channel lifetime.
    ///
    /// # Errors
    /// `CadenceError::Config` outside 1..=365 days.
    pub fn channel_ttl(&self) -> Result<Duration> {
        bounded_days("webhook.channel_ttl_days", self.channel_ttl_days, 1..=365)
    }
}

/// Background synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub incremental_cron: String,
    pub renewal_cron: String,
    pub renewal_lead_hours: i64,
    pub reminder_cron: String,
    pub reminder_window_hours: i64,
    pub history_window_days: i64,
    pub max_pages: usize,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub job_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            incremental_cron: "0 */15 * * * *".into(),
            renewal_cron: "0 0 */6 * * *".into(),
            renewal_lead_hours: DEFAULT_RENEWAL_LEAD_HOURS,
            reminder_cron: "0 */10 * * * *".into(),
            reminder_window_hours: DEFAULT_REMINDER_WINDOW_HOURS,
            history_window_days: DEFAULT_HISTORY_WINDOW_DAYS,
            max_pages: DEFAULT_MAX_PAGES,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            job_timeout_secs: 300,
        }
    }
}

/// Window settings are range-checked here so they can be turned into
/// durations without overflowing.
impl SyncConfig {
    /// # Errors
    /// `CadenceError::Config` outside 0..=8760 hours.
    pub fn renewal_lead(&self) -> Result<Duration> {
        bounded_hours("sync.renewal_lead_hours", self.renewal_lead_hours, 0..=8760)
    }

    /// # Errors
    /// `CadenceError::Config` outside 1..=8760 hours.
    pub fn reminder_window(&self) -> Result<Duration> {
        bounded_hours("sync.reminder_window_hours", self.reminder_window_hours, 1..=8760)
    }

    /// How far back a full pull reaches.
    ///
    /// # Errors
    /// `CadenceError::Config` outside 1..=3650 days.
    pub fn history_window(&self) -> Result<Duration> {
        bounded_days("sync.history_window_days", self.history_window_days, 1..=3650)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), format: "text".into() }
    }
}

fn has_value(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn check_range(key: &str, value: i64, range: &RangeInclusive<i64>, unit: &str) -> Result<i64> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(CadenceError::Config(format!(
            "{key} must be between {} and {} {unit}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

fn bounded_days(key: &str, value: i64, range: RangeInclusive<i64>) -> Result<Duration> {
    check_range(key, value, &range, "days").map(Duration::days)
}

fn bounded_hours(key: &str, value: i64, range: RangeInclusive<i64>) -> Result<Duration> {
    check_range(key, value, &range, "hours").map(Duration::hours)
}
