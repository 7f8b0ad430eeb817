//! Auth API endpoints.

use crate::auth::middleware::{check_rate_limit, client_ip, AppState, AuthSession, JsonBody};
use crate::error::AppError;
use crate::models::{
    DashboardResponse, NonceRequest, NonceResponse, VerifyRequest, VerifyResponse,
};
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::net::SocketAddr;

/// POST /api/auth/nonce — Issue a login nonce for an address
pub async fn request_nonce(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<NonceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip = client_ip(&headers, addr, state.config.trusted_proxy_count);
    check_rate_limit(&state, "auth/nonce", ip).await?;

    let nonce = state.issuer.issue(req.address()).await?;

    Ok(Json(NonceResponse { nonce }))
}

/// POST /api/auth/verify — Verify the signed nonce and start a session
pub async fn verify_signature(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip = client_ip(&headers, addr, state.config.trusted_proxy_count);
    check_rate_limit(&state, "auth/verify", ip).await?;

    let address = state
        .verifier
        .verify(req.address(), req.signature())
        .await?
        .into_granted()?;

    let session = state.sessions.establish(&address).await?;

    tracing::info!(action = "auth_success", address = %address, "Session established");

    Ok(Json(VerifyResponse {
        success: true,
        address,
        token: session.token,
    }))
}

/// GET /api/dashboard — Requires an authenticated session
pub async fn dashboard(session: AuthSession) -> Result<impl IntoResponse, AppError> {
    Ok(Json(DashboardResponse {
        message: format!(
            "Hello {}, you are authenticated with your wallet.",
            session.address
        ),
        address: session.address,
    }))
}

/// POST /api/auth/logout — Invalidate current session
pub async fn logout(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.end(&session.token).await?;

    tracing::info!(action = "logout", address = %session.address, "Session ended");

    Ok(StatusCode::NO_CONTENT)
}
