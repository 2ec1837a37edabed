pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/exchange-google-token", post(handlers::handle_exchange))
        .route("/refresh-google-token", post(handlers::handle_refresh))
        .with_state(state)
}

/// Browser clients call these endpoints cross-origin and send no cookies;
/// preflights get a literal `Access-Control-Allow-Origin: *`.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
