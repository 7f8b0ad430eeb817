//! API route handlers.

pub mod auth;

use crate::auth::middleware::AppState;
use crate::middleware::security_headers;
use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Login flow
        .route("/api/auth/nonce", post(auth::request_nonce))
        .route("/api/auth/verify", post(auth::verify_signature))
        .route("/api/auth/logout", post(auth::logout))
        // Session-gated
        .route("/api/dashboard", get(auth::dashboard))
}

/// Full application: API routes, static login page, and middleware layers.
pub fn app(state: AppState) -> Router {
    // Single-origin deployment: CorsLayer::new() allows no cross-origin requests
    let cors = CorsLayer::new();

    api_router()
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state)
}
