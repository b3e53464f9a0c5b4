//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Read a config file: the explicit path, else `CADENCE_CONFIG`, else the
//!    first file found by [`probe_config_paths`]. No file means defaults.
//! 2. Apply `CADENCE_*` environment overrides on top.
//! 3. Supports JSON and TOML formats (by extension).
//!
//! ## Environment Variables
//! - `CADENCE_DB_PATH`, `CADENCE_DB_POOL_SIZE`
//! - `CADENCE_GOOGLE_API_BASE_URL`, `CADENCE_GOOGLE_TOKEN_URL`,
//!   `CADENCE_GOOGLE_CALENDAR_ID`, `CADENCE_GOOGLE_CLIENT_ID`,
//!   `CADENCE_GOOGLE_CLIENT_SECRET`, `CADENCE_GOOGLE_REFRESH_TOKEN`,
//!   `CADENCE_GOOGLE_ACCESS_TOKEN`, `CADENCE_TIME_ZONE`
//! - `CADENCE_WEBHOOK_BIND`, `CADENCE_WEBHOOK_PUBLIC_URL`,
//!   `CADENCE_WEBHOOK_TOKEN`, `CADENCE_CHANNEL_TTL_DAYS`
//! - `CADENCE_SYNC_ENABLED` (true/false), `CADENCE_SYNC_CRON`,
//!   `CADENCE_RENEWAL_CRON`, `CADENCE_REMINDER_CRON`, `CADENCE_MAX_PAGES`,
//!   `CADENCE_HISTORY_WINDOW_DAYS`
//! - `CADENCE_LOG_LEVEL`, `CADENCE_LOG_FORMAT`
//!
//! ## File Locations
//! `cadence.toml`, `cadence.json` and `config.toml` in the working directory,
//! then the same names next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use cadence_domain::{CadenceError, Config, Result};

const CONFIG_PATH_VAR: &str = "CADENCE_CONFIG";
const CANDIDATE_NAMES: [&str; 3] = ["cadence.toml", "cadence.json", "config.toml"];

/// Load configuration using the standard search order.
///
/// # Errors
/// Returns `CadenceError::Config` if a file exists but cannot be parsed, or
/// an environment override has an invalid value.
pub fn load() -> Result<Config> {
    load_with(None)
}

/// Load configuration from `path` (or the standard search order when `None`)
/// and apply environment overrides.
///
/// # Errors
/// Returns `CadenceError::Config` if the file is missing or invalid.
pub fn load_with(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.or_else(|| std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from));

    let mut config = match explicit {
        Some(path) => load_from_file(Some(path))?,
        None => match probe_config_paths() {
            Some(found) => load_from_file(Some(found))?,
            None => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Defaults plus environment overrides, ignoring any config file.
///
/// # Errors
/// Returns `CadenceError::Config` if an override has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `CadenceError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CadenceError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CadenceError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CadenceError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CadenceError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CadenceError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(CadenceError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Return the first existing config file in the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(CANDIDATE_NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(CANDIDATE_NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Overwrite config values with any `CADENCE_*` variables that are set.
///
/// # Errors
/// Returns `CadenceError::Config` when a numeric variable does not parse.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(path) = env_opt("CADENCE_DB_PATH") {
        config.database.path = path;
    }
    if let Some(size) = env_parse("CADENCE_DB_POOL_SIZE")? {
        config.database.pool_size = size;
    }

    let provider = &mut config.provider;
    if let Some(url) = env_opt("CADENCE_GOOGLE_API_BASE_URL") {
        provider.api_base_url = url;
    }
    if let Some(url) = env_opt("CADENCE_GOOGLE_TOKEN_URL") {
        provider.token_url = url;
    }
    if let Some(calendar) = env_opt("CADENCE_GOOGLE_CALENDAR_ID") {
        provider.calendar_id = calendar;
    }
    if let Some(tz) = env_opt("CADENCE_TIME_ZONE") {
        provider.time_zone = tz;
    }
    override_secret(&mut provider.client_id, "CADENCE_GOOGLE_CLIENT_ID");
    override_secret(&mut provider.client_secret, "CADENCE_GOOGLE_CLIENT_SECRET");
    override_secret(&mut provider.refresh_token, "CADENCE_GOOGLE_REFRESH_TOKEN");
    override_secret(&mut provider.access_token, "CADENCE_GOOGLE_ACCESS_TOKEN");

    if let Some(bind) = env_opt("CADENCE_WEBHOOK_BIND") {
        config.webhook.bind_address = bind;
    }
    override_secret(&mut config.webhook.public_url, "CADENCE_WEBHOOK_PUBLIC_URL");
    override_secret(&mut config.webhook.channel_token, "CADENCE_WEBHOOK_TOKEN");
    if let Some(days) = env_parse("CADENCE_CHANNEL_TTL_DAYS")? {
        config.webhook.channel_ttl_days = days;
    }

    config.sync.enabled = env_bool("CADENCE_SYNC_ENABLED", config.sync.enabled);
    if let Some(cron) = env_opt("CADENCE_SYNC_CRON") {
        config.sync.incremental_cron = cron;
    }
    if let Some(cron) = env_opt("CADENCE_RENEWAL_CRON") {
        config.sync.renewal_cron = cron;
    }
    if let Some(cron) = env_opt("CADENCE_REMINDER_CRON") {
        config.sync.reminder_cron = cron;
    }
    if let Some(pages) = env_parse("CADENCE_MAX_PAGES")? {
        config.sync.max_pages = pages;
    }
    if let Some(days) = env_parse("CADENCE_HISTORY_WINDOW_DAYS")? {
        config.sync.history_window_days = days;
    }

    if let Some(level) = env_opt("CADENCE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = env_opt("CADENCE_LOG_FORMAT") {
        config.logging.format = format;
    }

    Ok(())
}

fn override_secret(slot: &mut Option<String>, key: &str) {
    if let Some(value) = env_opt(key) {
        *slot = Some(value);
    }
}

/// Non-empty environment variable.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| CadenceError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::Builder;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for (key, value) in [("TEST_CADENCE_BOOL_1", "1"), ("TEST_CADENCE_BOOL_ON", "ON")] {
            std::env::set_var(key, value);
            assert!(env_bool(key, false));
            std::env::remove_var(key);
        }
        for (key, value) in [("TEST_CADENCE_BOOL_0", "0"), ("TEST_CADENCE_BOOL_NO", "no")] {
            std::env::set_var(key, value);
            assert!(!env_bool(key, true));
            std::env::remove_var(key);
        }

        std::env::remove_var("TEST_CADENCE_BOOL_MISSING");
        assert!(env_bool("TEST_CADENCE_BOOL_MISSING", true));
    }

    #[test]
    fn test_env_overrides_replace_file_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("CADENCE_DB_PATH", "/tmp/override.db");
        std::env::set_var("CADENCE_GOOGLE_REFRESH_TOKEN", "refresh");
        std::env::set_var("CADENCE_SYNC_ENABLED", "false");
        std::env::set_var("CADENCE_MAX_PAGES", "7");

        let config = load_from_env().expect("config loads");
        assert_eq!(config.database.path, "/tmp/override.db");
        assert_eq!(config.provider.refresh_token.as_deref(), Some("refresh"));
        assert!(!config.sync.enabled);
        assert_eq!(config.sync.max_pages, 7);

        std::env::remove_var("CADENCE_DB_PATH");
        std::env::remove_var("CADENCE_GOOGLE_REFRESH_TOKEN");
        std::env::remove_var("CADENCE_SYNC_ENABLED");
        std::env::remove_var("CADENCE_MAX_PAGES");
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("CADENCE_DB_POOL_SIZE", "not-a-number");
        let result = load_from_env();
        std::env::remove_var("CADENCE_DB_POOL_SIZE");

        assert!(matches!(result, Err(CadenceError::Config(_))));
    }

    #[test]
    fn test_blank_variables_are_ignored() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("CADENCE_GOOGLE_CALENDAR_ID", "  ");
        let config = load_from_env().expect("config loads");
        std::env::remove_var("CADENCE_GOOGLE_CALENDAR_ID");

        assert_eq!(config.provider.calendar_id, "primary");
    }

    #[test]
    fn test_partial_toml_file_keeps_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().expect("temp file");
        writeln!(file, "[webhook]\npublic_url = \"https://hooks.example.com/calendar/webhook\"")
            .expect("write config");

        let config = load_from_file(Some(file.path().to_path_buf())).expect("config loads");
        assert_eq!(
            config.webhook.public_url.as_deref(),
            Some("https://hooks.example.com/calendar/webhook")
        );
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.sync.incremental_cron, "0 */15 * * * *");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/cadence.toml")));
        assert!(matches!(result, Err(CadenceError::Config(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = parse_config("", Path::new("cadence.yaml"));
        assert!(matches!(result, Err(CadenceError::Config(_))));
    }
}
