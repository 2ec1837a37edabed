use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::oauth::OAuthError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every failure crossing the HTTP boundary serializes as
/// `{"error": <message>, "details"?: <json>}`; never a partial response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider rejected the token call. The response status mirrors the
    /// provider's status and its error body rides along as `details`.
    #[error("Upstream token endpoint returned status {status}")]
    Upstream { status: u16, details: Value },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<OAuthError> for AppError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::Api { status, body } => AppError::Upstream {
                status,
                details: body,
            },
            OAuthError::Http(e) => AppError::Internal(e.into()),
            OAuthError::Parse(e) => AppError::Internal(e.into()),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::Validation(msg) => json!({ "error": msg }),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                json!({ "error": msg })
            }
            AppError::Upstream {
                status: upstream_status,
                details,
            } => {
                tracing::error!("Upstream rejected token call with status {upstream_status}");
                json!({
                    "error": "Upstream token endpoint returned an error",
                    "details": details,
                })
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                json!({ "error": e.to_string() })
            }
        };

        (status, Json(body)).into_response()
    }
}
