use crate::config::Config;
use crate::oauth::GoogleOAuthClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `None` until both Google client credentials are configured; the token
    /// endpoints answer with a configuration error in that state.
    pub oauth: Option<GoogleOAuthClient>,
}
