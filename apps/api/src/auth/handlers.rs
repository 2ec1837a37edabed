use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::oauth::{GoogleOAuthClient, TokenPair};
use crate::state::AppState;

/// Fields arrive as `Option` and are validated by hand so a missing field is
/// a 400 with a structured body, not a framework-level 422.
#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub code: Option<String>,
    pub code_verifier: Option<String>,
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// POST /exchange-google-token
///
/// Pure protocol translator: validates the body, forwards the code + PKCE
/// verifier to the provider, and returns the normalized token pair. Nothing
/// is persisted here.
pub async fn handle_exchange(
    State(state): State<AppState>,
    Json(req): Json<ExchangeRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let code = require_field(req.code.as_deref(), "code")?;
    let code_verifier = require_field(req.code_verifier.as_deref(), "code_verifier")?;
    let redirect_uri = require_field(req.redirect_uri.as_deref(), "redirect_uri")?;
    let oauth = require_oauth(&state)?;

    let pair = oauth.exchange_code(code, code_verifier, redirect_uri).await?;
    Ok(Json(pair))
}

/// POST /refresh-google-token
pub async fn handle_refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let refresh_token = require_field(req.refresh_token.as_deref(), "refresh_token")?;
    let oauth = require_oauth(&state)?;

    let pair = oauth.refresh(refresh_token).await?;
    Ok(Json(pair))
}

fn require_field<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{name} is required"))),
    }
}

fn require_oauth(state: &AppState) -> Result<&GoogleOAuthClient, AppError> {
    state.oauth.as_ref().ok_or_else(|| {
        AppError::Configuration("Google OAuth client credentials are not configured".to_string())
    })
}
