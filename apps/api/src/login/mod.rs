#![allow(dead_code)]

//! Authorization bootstrap: everything the client needs before it can call
//! the exchange endpoint.
//!
//! The verifier and CSRF state generated here are held by the client until
//! the provider redirects back with a code; the verifier then travels to
//! `/exchange-google-token` as `code_verifier`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use url::Url;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Scopes the coaching app asks for at login.
pub const DEFAULT_SCOPES: &str = "openid email profile";

pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

/// 32 random bytes for the verifier; challenge is SHA-256 of the verifier,
/// both base64url without padding (the S256 method).
pub fn generate_pkce() -> PkcePair {
    let mut buf = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    let verifier = URL_SAFE_NO_PAD.encode(buf);

    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

    PkcePair {
        verifier,
        challenge,
    }
}

pub fn random_state() -> String {
    let mut buf = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// A prepared login redirect: the URL to open plus the secrets to hold onto
/// until the provider calls back.
pub struct LoginRequest {
    pub authorization_url: String,
    pub pkce: PkcePair,
    pub state: String,
}

/// Builds the Google authorization URL.
///
/// `access_type=offline` and `prompt=consent` make the provider issue a
/// refresh token with the first exchange.
pub fn begin_login(client_id: &str, redirect_uri: &str) -> Result<LoginRequest, url::ParseError> {
    let pkce = generate_pkce();
    let state = random_state();

    let mut url = Url::parse(AUTH_URL)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", DEFAULT_SCOPES)
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("state", &state)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");

    Ok(LoginRequest {
        authorization_url: url.into(),
        pkce,
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_pkce_verifier_and_challenge_differ() {
        let pkce = generate_pkce();
        assert!(!pkce.verifier.is_empty());
        assert!(!pkce.challenge.is_empty());
        assert_ne!(pkce.verifier, pkce.challenge);
    }

    #[test]
    fn test_pkce_challenge_is_sha256_of_verifier() {
        let pkce = generate_pkce();
        let mut hasher = Sha256::new();
        hasher.update(pkce.verifier.as_bytes());
        let expected = URL_SAFE_NO_PAD.encode(hasher.finalize());
        assert_eq!(pkce.challenge, expected);
    }

    #[test]
    fn test_random_state_is_unique() {
        assert_ne!(random_state(), random_state());
    }

    #[test]
    fn test_begin_login_builds_offline_authorization_url() {
        let login = begin_login("client-id", "https://app/cb").unwrap();

        let url = Url::parse(&login.authorization_url).unwrap();
        assert_eq!(url.host_str(), Some("accounts.google.com"));

        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(params.get("client_id").map(String::as_str), Some("client-id"));
        assert_eq!(
            params.get("redirect_uri").map(String::as_str),
            Some("https://app/cb")
        );
        assert_eq!(
            params.get("code_challenge").map(String::as_str),
            Some(login.pkce.challenge.as_str())
        );
        assert_eq!(
            params.get("code_challenge_method").map(String::as_str),
            Some("S256")
        );
        assert_eq!(params.get("state").map(String::as_str), Some(login.state.as_str()));
        assert_eq!(params.get("access_type").map(String::as_str), Some("offline"));
        assert_eq!(params.get("prompt").map(String::as_str), Some("consent"));
    }
}
