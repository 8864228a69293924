//! Twitch OAuth2 client-credentials exchange for the IGDB catalog.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use medialog_core::error::AuthError;

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Tokens are assumed valid for a conservative fixed window instead of the
/// expiry the endpoint reports; an authentication failure on a dependent
/// call invalidates the slot early.
const ASSUMED_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct CachedToken {
    value: String,
    obtained_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.obtained_at.elapsed() < ASSUMED_TTL
    }
}

/// Process-wide bearer-token cache.
///
/// The slot lock is held across the credential exchange, so N concurrent
/// workers asking at once produce a single network round trip and all
/// observe the same token (or the same failure).
pub struct TwitchTokenCache {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
    slot: Mutex<Option<CachedToken>>,
}

impl TwitchTokenCache {
    pub fn new(client_id: String, client_secret: String, http: reqwest::Client) -> Self {
        Self {
            client_id,
            client_secret,
            http,
            slot: Mutex::new(None),
        }
    }

    /// Current bearer token, running the exchange if none is cached.
    pub async fn get(&self) -> Result<String, AuthError> {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }
        let value = self.exchange().await?;
        *slot = Some(CachedToken {
            value: value.clone(),
            obtained_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drop the cached token; the next caller triggers a fresh exchange.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    async fn exchange(&self) -> Result<String, AuthError> {
        debug!("exchanging client credentials for bearer token");
        let resp = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Rejected(format!("token endpoint unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(AuthError::Rejected(format!(
                "token endpoint returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AuthError::Rejected(format!("token response unparseable: {e}")))?;

        body["access_token"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AuthError::Rejected("token response missing access_token".into()))
    }
}
