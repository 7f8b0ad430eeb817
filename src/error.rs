//! Error types and Axum response conversions.

use crate::auth::recover::RecoveryError;
use crate::storage::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures of the challenge-response protocol.
///
/// None of these are retried automatically; each tells the caller what to
/// fix in the request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or empty request fields.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Verify attempted before any challenge was issued for the address.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// The signature could not be decoded or no key could be recovered.
    #[error("Recover failed: {0}")]
    RecoveryFailure(#[from] RecoveryError),

    /// Recovery succeeded but the signer is not the claimed address.
    #[error("Invalid signature")]
    InvalidSignature,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Rate limited")]
    RateLimited,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Payload too large".to_string(),
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => AppError::BadRequest(msg),
            AuthError::UnknownIdentity(_) => {
                AppError::NotFound("Identity not found".to_string())
            }
            AuthError::RecoveryFailure(e) => {
                AppError::BadRequest(format!("Recover failed: {}", e))
            }
            AuthError::InvalidSignature => {
                AppError::Unauthorized("Invalid signature".to_string())
            }
            AuthError::Store(e) => AppError::from(e),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}
