/// Google OAuth client — the single point of entry for all provider token
/// calls in Daymark.
///
/// ARCHITECTURAL RULE: No other module may call the Google token endpoint
/// directly. Both HTTP handlers and any background refresh go through here.
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound on a single token call; the provider is normally sub-second.
const TOKEN_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx from the provider. `body` holds the provider's error payload,
    /// parsed as JSON when possible, as a raw string otherwise.
    #[error("Token endpoint error (status {status})")]
    Api { status: u16, body: Value },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Token pair issued by the provider.
///
/// `scope` is normalized from the provider's space-delimited string into
/// individual entries. `refresh_token` is only present when the provider
/// issues or rotates one, and is skipped in serialization otherwise so a
/// plain refresh response carries no `refresh_token` key at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Vec<String>,
    pub token_type: String,
}

/// Wire shape of the provider's token response, before scope normalization.
#[derive(Debug, Deserialize)]
struct ProviderTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: u64,
    scope: Option<String>,
    token_type: String,
}

impl From<ProviderTokenResponse> for TokenPair {
    fn from(raw: ProviderTokenResponse) -> Self {
        TokenPair {
            access_token: raw.access_token,
            refresh_token: raw.refresh_token,
            expires_in: raw.expires_in,
            scope: split_scope(raw.scope.as_deref()),
            token_type: raw.token_type,
        }
    }
}

/// The provider client shared by both token endpoints.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl GoogleOAuthClient {
    pub fn new(client_id: String, client_secret: String, token_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(TOKEN_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            client_id,
            client_secret,
            token_url,
        }
    }

    /// Exchanges an authorization code plus PKCE verifier for a token pair.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenPair, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        self.token_request(&params).await
    }

    /// Exchanges a stored refresh token for a new access token.
    ///
    /// Google normally leaves the refresh token untouched; if the provider
    /// rotates it, the rotated token comes back in the pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, OAuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        self.token_request(&params).await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenPair, OAuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Token endpoint returned {status}: {body}");
            let details = match serde_json::from_str::<Value>(&body) {
                Ok(parsed) => parsed,
                Err(_) => Value::String(body),
            };
            return Err(OAuthError::Api {
                status: status.as_u16(),
                body: details,
            });
        }

        let raw: ProviderTokenResponse = serde_json::from_str(&body)?;
        debug!("Token call succeeded (expires_in={}s)", raw.expires_in);
        Ok(raw.into())
    }
}

/// Splits the provider's space-delimited scope string into entries.
/// An absent or empty scope normalizes to an empty list.
fn split_scope(scope: Option<&str>) -> Vec<String> {
    scope
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client(token_url: String) -> GoogleOAuthClient {
        GoogleOAuthClient::new("client-id".to_string(), "client-secret".to_string(), token_url)
    }

    #[test]
    fn test_split_scope_space_delimited() {
        assert_eq!(split_scope(Some("a b c")), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_scope_absent_is_empty() {
        assert!(split_scope(None).is_empty());
        assert!(split_scope(Some("")).is_empty());
    }

    #[test]
    fn test_refresh_token_key_skipped_when_absent() {
        let pair = TokenPair {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_in: 3600,
            scope: vec!["a".to_string()],
            token_type: "Bearer".to_string(),
        };
        let serialized = serde_json::to_value(&pair).unwrap();
        assert!(serialized.get("refresh_token").is_none());
    }

    #[tokio::test]
    async fn test_exchange_normalizes_scope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::UrlEncoded(
                "grant_type".into(),
                "authorization_code".into(),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "access_token": "tok",
                    "expires_in": 3600,
                    "scope": "a b c",
                    "token_type": "Bearer"
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = test_client(format!("{}/token", server.url()));
        let pair = client
            .exchange_code("abc", "v", "https://app/cb")
            .await
            .unwrap();

        assert_eq!(pair.access_token, "tok");
        assert_eq!(pair.refresh_token, None);
        assert_eq!(pair.expires_in, 3600);
        assert_eq!(pair.scope, vec!["a", "b", "c"]);
        assert_eq!(pair.token_type, "Bearer");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_passes_through_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(
                json!({
                    "access_token": "tok",
                    "refresh_token": "rt",
                    "expires_in": 3599,
                    "scope": "openid",
                    "token_type": "Bearer"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(format!("{}/token", server.url()));
        let pair = client
            .exchange_code("abc", "v", "https://app/cb")
            .await
            .unwrap();

        assert_eq!(pair.refresh_token.as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn test_provider_rejection_preserves_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(json!({"error": "invalid_grant"}).to_string())
            .create_async()
            .await;

        let client = test_client(format!("{}/token", server.url()));
        let err = client
            .refresh("expired-refresh-token")
            .await
            .unwrap_err();

        match err {
            OAuthError::Api { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, json!({"error": "invalid_grant"}));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_non_json_error_body_kept_as_string() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = test_client(format!("{}/token", server.url()));
        let err = client.refresh("rt").await.unwrap_err();

        match err {
            OAuthError::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, Value::String("upstream unavailable".to_string()));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_sends_refresh_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "rt".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "client-id".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "access_token": "fresh",
                    "expires_in": 3600,
                    "scope": "openid",
                    "token_type": "Bearer"
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = test_client(format!("{}/token", server.url()));
        let pair = client.refresh("rt").await.unwrap();

        assert_eq!(pair.access_token, "fresh");
        assert_eq!(pair.refresh_token, None);
        mock.assert_async().await;
    }
}
