//! Shared application state, the session extractor, and rate limiting.

use super::issuer::ChallengeIssuer;
use super::session::SessionManager;
use super::verifier::ResponseVerifier;
use crate::config::Config;
use crate::error::AppError;
use crate::storage::{IdentityStore, MemoryStore, RateLimiter, RedisStore, SessionStore};
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
};
use serde::de::DeserializeOwned;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: ChallengeIssuer,
    pub verifier: ResponseVerifier,
    pub sessions: SessionManager,
    pub limiter: Arc<dyn RateLimiter>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the protocol components over arbitrary stores.
    pub fn new(
        config: Config,
        identities: Arc<dyn IdentityStore>,
        sessions: Arc<dyn SessionStore>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            issuer: ChallengeIssuer::new(identities.clone()),
            verifier: ResponseVerifier::new(identities, config.nonce_policy),
            sessions: SessionManager::new(sessions, config.session_ttl_secs),
            limiter,
            config: Arc::new(config),
        }
    }

    /// All state in Redis.
    pub fn redis(config: Config, store: RedisStore) -> Self {
        let store = Arc::new(store);
        Self::new(config, store.clone(), store.clone(), store)
    }

    /// All state in process memory. Lost on restart.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store.clone(), store)
    }
}

/// Authenticated session extractor.
///
/// Extracts session from `Authorization: Bearer {token}` header.
/// Returns 401 Unauthorized if missing or invalid.
pub struct AuthSession {
    pub address: String,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))?
            .to_string();

        let session = state
            .sessions
            .resolve(&token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        Ok(AuthSession {
            address: session.address,
            token,
        })
    }
}

/// JSON request body that reports every failure as an `AppError`.
///
/// An empty body reads as `T::default()` and no content type is required,
/// so a missing field and a missing body are rejected the same way by
/// validation.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge
            } else {
                AppError::BadRequest(e.body_text())
            }
        })?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }

        serde_json::from_slice(&body)
            .map(JsonBody)
            .map_err(|_| AppError::BadRequest("Invalid JSON body".to_string()))
    }
}

/// Resolve the client IP used for rate limiting.
///
/// With `trusted_proxy_count == 0` this is the socket peer. Otherwise each
/// trusted proxy is assumed to append its peer to `X-Forwarded-For`, and the
/// client is the entry added by the outermost one. Headers too short to
/// contain that entry fall back to the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, trusted_proxy_count: usize) -> IpAddr {
    if trusted_proxy_count == 0 {
        return peer.ip();
    }

    let forwarded: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect();

    forwarded
        .len()
        .checked_sub(trusted_proxy_count)
        .and_then(|i| forwarded[i].parse().ok())
        .unwrap_or_else(|| peer.ip())
}

/// Count a request from `ip` against the per-minute auth limit.
///
/// Returns `AppError::RateLimited` once the limit is exceeded. The client IP
/// is only logged as a hash.
pub async fn check_rate_limit(
    state: &AppState,
    endpoint: &str,
    ip: IpAddr,
) -> Result<(), AppError> {
    let key = format!("ratelimit:auth:{}", ip);
    let allowed = state
        .limiter
        .hit(&key, state.config.rate_limit_auth_per_min, 60)
        .await
        .map_err(|e| AppError::Internal(format!("Rate limit check failed: {}", e)))?;

    if !allowed {
        let mut hasher = std::hash::DefaultHasher::new();
        ip.hash(&mut hasher);
        let ip_hash = format!("{:x}", hasher.finish());
        tracing::warn!(action = "rate_limited", endpoint = endpoint, ip_hash = %ip_hash, "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use crate::models::VerifyRequest;

    fn state(limit: u32) -> AppState {
        AppState::in_memory(Config {
            rate_limit_auth_per_min: limit,
            ..Config::default()
        })
    }

    async fn extract(state: &AppState, header: Option<&str>) -> Result<AuthSession, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header("authorization", h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthSession::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn test_extracts_live_session() {
        let state = state(5);
        let session = state.sessions.establish("0xabc").await.unwrap();

        let auth = extract(&state, Some(&format!("Bearer {}", session.token)))
            .await
            .unwrap();
        assert_eq!(auth.address, "0xabc");
        assert_eq!(auth.token, session.token);
    }

    #[tokio::test]
    async fn test_rejects_missing_and_malformed() {
        let state = state(5);

        assert!(matches!(
            extract(&state, None).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            extract(&state, Some("Basic abc")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            extract(&state, Some("Bearer unknown")).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_ended_session() {
        let state = state(5);
        let session = state.sessions.establish("0xabc").await.unwrap();
        state.sessions.end(&session.token).await.unwrap();

        assert!(matches!(
            extract(&state, Some(&format!("Bearer {}", session.token))).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_check_rate_limit() {
        let state = state(2);
        let ip: IpAddr = "192.0.2.1".parse().unwrap();

        assert!(check_rate_limit(&state, "test", ip).await.is_ok());
        assert!(check_rate_limit(&state, "test", ip).await.is_ok());
        assert!(matches!(
            check_rate_limit(&state, "test", ip).await,
            Err(AppError::RateLimited)
        ));

        // Other clients have their own window
        let other: IpAddr = "192.0.2.2".parse().unwrap();
        assert!(check_rate_limit(&state, "test", other).await.is_ok());
    }

    async fn parse_body(
        content_type: Option<&str>,
        body: &str,
    ) -> Result<VerifyRequest, AppError> {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        JsonBody::<VerifyRequest>::from_request(req, &()).await.map(|b| b.0)
    }

    #[tokio::test]
    async fn test_json_body_empty_reads_as_default() {
        let req = parse_body(None, "").await.unwrap();
        assert_eq!(req.address(), "");
        assert_eq!(req.signature(), "");

        let req = parse_body(Some("application/json"), "  ").await.unwrap();
        assert_eq!(req.address(), "");
    }

    #[tokio::test]
    async fn test_json_body_null_fields_read_as_empty() {
        let body = r#"{"address":"0xabc","signature":null}"#;
        let req = parse_body(Some("application/json"), body).await.unwrap();
        assert_eq!(req.address(), "0xabc");
        assert_eq!(req.signature(), "");

        // Content type is not required
        let req = parse_body(None, r#"{"address":null}"#).await.unwrap();
        assert_eq!(req.address(), "");
    }

    #[tokio::test]
    async fn test_json_body_malformed_is_bad_request() {
        assert!(matches!(
            parse_body(Some("application/json"), "{not json").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_body(None, r#"{"address": 5}"#).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_client_ip_without_proxies_is_peer() {
        let peer: SocketAddr = "192.0.2.10:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7".parse().unwrap());

        // Spoofed header is ignored when no proxy is trusted
        assert_eq!(client_ip(&headers, peer, 0), peer.ip());
    }

    #[test]
    fn test_client_ip_behind_trusted_proxies() {
        let peer: SocketAddr = "10.0.0.2:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "198.51.100.9, 203.0.113.7, 10.0.0.1".parse().unwrap(),
        );

        // Two proxies: the leftmost spoofable entry is skipped
        assert_eq!(
            client_ip(&headers, peer, 2),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            client_ip(&headers, peer, 1),
            "10.0.0.1".parse::<IpAddr>().unwrap()
        );
        // Header shorter than the proxy chain falls back to the peer
        assert_eq!(client_ip(&headers, peer, 4), peer.ip());
        assert_eq!(client_ip(&HeaderMap::new(), peer, 1), peer.ip());
    }
}
