mod auth;
mod client;
mod config;
mod errors;
mod login;
mod oauth;
mod progress;
mod routes;
mod session;
mod state;
mod storage;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::oauth::GoogleOAuthClient;
use crate::routes::{build_router, cors_layer};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (only PORT parse failures abort startup)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("daymark_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Daymark API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the Google OAuth client when credentials are present.
    // Without them the service still serves /health, and the token endpoints
    // report a configuration error per request.
    let oauth = match (
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    ) {
        (Some(client_id), Some(client_secret)) => {
            info!("Google OAuth client initialized");
            Some(GoogleOAuthClient::new(
                client_id,
                client_secret,
                config.google_token_url.clone(),
            ))
        }
        _ => {
            warn!(
                "GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET not set; \
                 token endpoints will answer with a configuration error"
            );
            None
        }
    };

    // Build app state
    let state = AppState {
        config: config.clone(),
        oauth,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
