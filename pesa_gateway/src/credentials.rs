//! Bearer credential caching for the gateway.
//!
//! Every gateway call needs a short-lived access token. Tokens are cached until shortly before they expire, and at
//! most one refresh is ever in flight: the cache lock is held for the duration of the refresh, so concurrent callers
//! queue behind it and then reuse the fresh token.
use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use log::*;
use pesa_common::Secret;
use tokio::sync::Mutex;

use crate::GatewayError;

/// Tokens are treated as expired this many seconds before the gateway says they are.
pub const DEFAULT_EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: Secret<String>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: String, expires_in: Duration) -> Self {
        Self { token: Secret::new(token), expires_at: Utc::now() + expires_in }
    }

    fn is_fresh(&self, skew: Duration) -> bool {
        Utc::now() + skew < self.expires_at
    }
}

#[derive(Debug)]
pub struct CredentialCache {
    current: Mutex<Option<AccessToken>>,
    skew: Duration,
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_EXPIRY_SKEW_SECS))
    }
}

impl CredentialCache {
    pub fn new(skew: Duration) -> Self {
        Self { current: Mutex::new(None), skew }
    }

    /// Returns the cached token if it is still fresh, otherwise calls `refresh` and caches the result.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, GatewayError>>,
    {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(self.skew)) {
            return Ok(token.token.reveal().clone());
        }
        debug!("📡️ Access token is missing or stale. Refreshing.");
        let token = refresh().await?;
        trace!("📡️ New access token expires at {}", token.expires_at);
        let result = token.token.reveal().clone();
        *current = Some(token);
        Ok(result)
    }

    /// Forget the cached token, e.g. after the gateway rejected it.
    pub async fn invalidate(&self) {
        let mut current = self.current.lock().await;
        if current.take().is_some() {
            info!("📡️ Cached access token invalidated");
        }
    }
}
