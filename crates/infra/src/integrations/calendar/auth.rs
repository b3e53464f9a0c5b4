//! Access tokens for the Calendar API.
//!
//! Either a static bearer token or the OAuth2 refresh-token grant. Granted
//! tokens are cached until shortly before they expire.

use cadence_domain::constants::TOKEN_REFRESH_SKEW_SECS;
use cadence_domain::{ProviderConfig, ProviderError, ProviderResult};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::TokenResponse;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Longest lifetime a granted token is trusted for.
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

enum Credentials {
    Static(String),
    RefreshGrant { client_id: String, client_secret: String, refresh_token: String },
}

struct CachedToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

pub struct AccessTokenSource {
    http: Client,
    token_url: String,
    credentials: Credentials,
    cache: Mutex<Option<CachedToken>>,
}

impl AccessTokenSource {
    /// # Errors
    /// `ProviderError::Config` when neither a static token nor a complete
    /// refresh grant is configured.
    pub fn from_config(config: &ProviderConfig, http: Client) -> ProviderResult<Self> {
        config.validate().map_err(|e| ProviderError::Config(e.to_string()))?;

        let credentials = match non_blank(config.access_token.as_deref()) {
            Some(token) => Credentials::Static(token.to_string()),
            None => Credentials::RefreshGrant {
                client_id: non_blank(config.client_id.as_deref()).unwrap_or_default().to_string(),
                client_secret: non_blank(config.client_secret.as_deref())
                    .unwrap_or_default()
                    .to_string(),
                refresh_token: non_blank(config.refresh_token.as_deref())
                    .unwrap_or_default()
                    .to_string(),
            },
        };

        Ok(Self { http, token_url: config.token_url.clone(), credentials, cache: Mutex::new(None) })
    }

    /// Current bearer token, refreshing it when missing or about to expire.
    pub async fn access_token(&self) -> ProviderResult<String> {
        let (client_id, client_secret, refresh_token) = match &self.credentials {
            Credentials::Static(token) => return Ok(token.clone()),
            Credentials::RefreshGrant { client_id, client_secret, refresh_token } => {
                (client_id, client_secret, refresh_token)
            }
        };

        let mut cache = self.cache.lock().await;
        let now = Utc::now();
        if let Some(token) = cache.as_ref().filter(|token| token.refresh_at > now) {
            return Ok(token.value.clone());
        }

        debug!(token_url = %self.token_url, "refreshing calendar access token");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Transient(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "token refresh rejected");
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                ProviderError::Transient(format!("token endpoint returned {status}"))
            } else {
                ProviderError::Auth(format!("token refresh failed ({status}): {body}"))
            });
        }

        let granted: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("invalid token response: {e}")))?;

        let refresh_at = refresh_deadline(now, granted.expires_in);
        let value = granted.access_token;
        *cache = Some(CachedToken { value: value.clone(), refresh_at });
        Ok(value)
    }

    /// Drop the cached token so the next call refreshes it.
    pub async fn invalidate(&self) {
        self.cache.lock().await.take();
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// When a token granted at `now` must be refreshed. Out-of-range lifetimes
/// are clamped, so a hostile `expires_in` can neither overflow nor pin a
/// token forever.
fn refresh_deadline(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let lifetime = expires_in
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        .clamp(TOKEN_REFRESH_SKEW_SECS, MAX_TOKEN_LIFETIME_SECS);
    now + Duration::seconds(lifetime - TOKEN_REFRESH_SKEW_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn granted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 15, 8, 0, 0).unwrap()
    }

    #[test]
    fn refresh_happens_before_expiry() {
        let now = granted_at();
        assert_eq!(refresh_deadline(now, Some(3600)), now + Duration::seconds(3540));
        assert_eq!(refresh_deadline(now, None), now + Duration::seconds(3540));
    }

    #[test]
    fn huge_lifetime_is_capped_at_a_day() {
        let now = granted_at();
        assert_eq!(refresh_deadline(now, Some(i64::MAX)), now + Duration::seconds(86_340));
    }

    #[test]
    fn negative_or_short_lifetime_refreshes_immediately() {
        let now = granted_at();
        assert_eq!(refresh_deadline(now, Some(i64::MIN)), now);
        assert_eq!(refresh_deadline(now, Some(10)), now);
    }
}
