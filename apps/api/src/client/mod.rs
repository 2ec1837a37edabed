#![allow(dead_code)]

//! Bearer-auth client for the hosted backend.
//!
//! Recovers locally from exactly one class of failure: an expired access
//! token. One logical request runs the [`Phase`] machine below; anything
//! other than a 401 on the first attempt goes straight back to the caller,
//! and a request is never refreshed-and-retried more than once.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Method, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::oauth::TokenPair;
use crate::session::Session;
use crate::storage::StorageError;

const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Remaining lifetime (ms) under which `ensure_fresh` refreshes ahead of time.
const REFRESH_MARGIN_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Error)]
pub enum ClientError {
    /// No usable credentials remain; the caller should send the user back to
    /// the login surface.
    #[error("Not authenticated")]
    AuthRequired,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token refresh rejected (status {0})")]
    RefreshRejected(u16),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A request to the hosted backend, described as data so a retry can rebuild
/// it byte-for-byte.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Lifecycle of one logical request. At most one `Refresh` per request: the
/// only edge into `Refresh` is from `Attempt`, and `Retry` is terminal.
enum Phase {
    Attempt,
    Refresh,
    Retry { access_token: String },
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    refresh_url: String,
    session: Session,
}

impl ApiClient {
    /// `base_url` is the hosted backend root; `refresh_url` is the full URL
    /// of the token refresh endpoint.
    pub fn new(base_url: impl Into<String>, refresh_url: impl Into<String>, session: Session) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            refresh_url: refresh_url.into(),
            session,
        }
    }

    /// Sends `req` with the session's access token, transparently refreshing
    /// once on a 401 and replaying the request with the new token.
    ///
    /// Terminal responses come back as `Ok`, including a post-retry 401 and
    /// every non-401 failure status. `Err(ClientError::AuthRequired)` means
    /// the refresh itself failed and the session has been cleared.
    pub async fn send(&self, req: ApiRequest) -> Result<Response, ClientError> {
        self.ensure_fresh().await?;

        let mut phase = Phase::Attempt;
        loop {
            phase = match phase {
                Phase::Attempt => {
                    let access_token = self
                        .session
                        .access_token()
                        .await?
                        .ok_or(ClientError::AuthRequired)?;
                    let response = self.dispatch(&req, &access_token).await?;
                    if response.status() == StatusCode::UNAUTHORIZED {
                        debug!("{} {} returned 401; refreshing access token", req.method, req.path);
                        Phase::Refresh
                    } else {
                        return Ok(response);
                    }
                }
                Phase::Refresh => match self.refresh().await {
                    Ok(access_token) => Phase::Retry { access_token },
                    Err(err) => {
                        warn!("Token refresh failed: {err}; clearing session");
                        self.session.clear().await?;
                        return Err(ClientError::AuthRequired);
                    }
                },
                Phase::Retry { access_token } => {
                    // Terminal either way; a second 401 is the caller's to see.
                    return Ok(self.dispatch(&req, &access_token).await?);
                }
            };
        }
    }

    /// Refreshes ahead of expiry when the recorded lifetime is inside the
    /// margin. Absent expiry metadata means nothing to do, and a failed
    /// proactive refresh is left for the 401 path to handle.
    pub async fn ensure_fresh(&self) -> Result<(), ClientError> {
        let Some(expires_at) = self.session.expires_at().await? else {
            return Ok(());
        };
        if Utc::now().timestamp_millis() < expires_at - REFRESH_MARGIN_MS {
            return Ok(());
        }
        if self.session.refresh_token().await?.is_none() {
            return Ok(());
        }

        debug!("Access token inside refresh margin; refreshing proactively");
        if let Err(err) = self.refresh().await {
            warn!("Proactive token refresh failed: {err}");
        }
        Ok(())
    }

    async fn dispatch(&self, req: &ApiRequest, access_token: &str) -> Result<Response, reqwest::Error> {
        let mut builder = self
            .http
            .request(req.method.clone(), format!("{}{}", self.base_url, req.path))
            .bearer_auth(access_token);
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }
        builder.send().await
    }

    /// Calls the refresh endpoint with the stored refresh token and persists
    /// the resulting pair. Returns the new access token.
    async fn refresh(&self) -> Result<String, ClientError> {
        let refresh_token = self
            .session
            .refresh_token()
            .await?
            .ok_or(ClientError::AuthRequired)?;

        let response = self
            .http
            .post(&self.refresh_url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::RefreshRejected(status.as_u16()));
        }

        let pair: TokenPair = response.json().await?;
        self.session.store_tokens(&pair).await?;
        Ok(pair.access_token)
    }
}
