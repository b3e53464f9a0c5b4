//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Cadence
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CadenceError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Calendar provider error: {0}")]
    Provider(ProviderError),
}

impl CadenceError {
    /// Whether a background job should try the failed operation again.
    ///
    /// Only transport-level provider failures and transient database
    /// contention qualify; everything else needs an operator or a code change.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(err) => err.should_retry(),
            Self::Network(_) => true,
            Self::Database(message) => message.contains("busy") || message.contains("locked"),
            _ => false,
        }
    }

    /// Short label used in structured logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
            Self::Provider(err) => err.category().as_str(),
        }
    }
}

/// Result type alias for Cadence operations
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Coarse classification of provider failures, used for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCategory {
    /// Credentials rejected or missing - never retried
    Authentication,
    /// Rate limiting, 5xx and transport failures - retryable
    Transient,
    /// The sync cursor is no longer accepted - triggers a full resync
    CursorExpired,
    /// The remote object does not exist - skip and continue
    NotFound,
    /// Request refused or response unreadable - non-retryable
    Client,
    /// Missing provider settings - fatal for the affected operation
    Config,
}

impl ProviderErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "provider_auth",
            Self::Transient => "provider_transient",
            Self::CursorExpired => "provider_cursor_expired",
            Self::NotFound => "provider_not_found",
            Self::Client => "provider_client",
            Self::Config => "provider_config",
        }
    }
}

/// Failures reported by the calendar provider boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("sync cursor expired")]
    CursorExpired,

    #[error("remote resource not found: {0}")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("malformed provider response: {0}")]
    Decode(String),

    #[error("provider not configured: {0}")]
    Config(String),
}

impl ProviderError {
    /// Get the error category for this error
    pub const fn category(&self) -> ProviderErrorCategory {
        match self {
            Self::Auth(_) => ProviderErrorCategory::Authentication,
            Self::Transient(_) => ProviderErrorCategory::Transient,
            Self::CursorExpired => ProviderErrorCategory::CursorExpired,
            Self::NotFound(_) => ProviderErrorCategory::NotFound,
            Self::Rejected(_) | Self::Decode(_) => ProviderErrorCategory::Client,
            Self::Config(_) => ProviderErrorCategory::Config,
        }
    }

    /// Check if this error should be retried
    pub const fn should_retry(&self) -> bool {
        matches!(self.category(), ProviderErrorCategory::Transient)
    }

    /// Missing remote objects are tolerated by every caller.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<ProviderError> for CadenceError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Config(message) => Self::Config(message),
            other => Self::Provider(other),
        }
    }
}

/// Result type alias for provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
