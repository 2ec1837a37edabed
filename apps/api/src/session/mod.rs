#![allow(dead_code)]

//! Session context: the token slot shared by the API client.
//!
//! The browser original kept `access_token` and `refresh_token` in two
//! `localStorage` keys read by ambient helpers. Here the slot is an explicit
//! object handed to whoever needs it, over any [`KeyValueStore`].

use std::sync::Arc;

use chrono::Utc;

use crate::oauth::TokenPair;
use crate::storage::{KeyValueStore, StorageError};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Unix-millis expiry derived from `expires_in` at store time.
pub const EXPIRES_AT_KEY: &str = "token_expires_at";

#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.store.get(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.store.get(REFRESH_TOKEN_KEY).await
    }

    /// Expiry recorded at the last token write, if any. An unparsable value
    /// reads as absent.
    pub async fn expires_at(&self) -> Result<Option<i64>, StorageError> {
        Ok(self
            .store
            .get(EXPIRES_AT_KEY)
            .await?
            .and_then(|v| v.parse().ok()))
    }

    /// Persists a freshly issued pair.
    ///
    /// The provider only includes a refresh token when it issues or rotates
    /// one; an already-stored refresh token survives a pair without one.
    pub async fn store_tokens(&self, pair: &TokenPair) -> Result<(), StorageError> {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token).await?;
        if let Some(ref refresh_token) = pair.refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh_token).await?;
        }
        let expires_at = Utc::now().timestamp_millis() + (pair.expires_in as i64) * 1000;
        self.store
            .set(EXPIRES_AT_KEY, &expires_at.to_string())
            .await
    }

    /// Drops every token key. The caller treats the session as logged out.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(ACCESS_TOKEN_KEY).await?;
        self.store.remove(REFRESH_TOKEN_KEY).await?;
        self.store.remove(EXPIRES_AT_KEY).await
    }
}
