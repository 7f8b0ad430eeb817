//! Storage layer for identities, sessions, and rate-limit counters.
//!
//! Every backend must make per-key read-modify-write atomic: issuing a nonce
//! and rotating it after a successful login touch exactly one identity and
//! never race with each other. Two backends are provided:
//! - [`redis::RedisStore`] for deployments (Lua scripts, one key per identity)
//! - [`memory::MemoryStore`] for development and tests (sharded `DashMap`)

pub mod memory;
pub mod redis;

use crate::models::{StoredIdentity, StoredSession};
use async_trait::async_trait;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Storage failures. Always surfaced as internal errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keyed store of identity records (address -> nonce).
///
/// Addresses passed in are already normalized.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch an identity record.
    async fn get(&self, address: &str) -> Result<Option<StoredIdentity>, StoreError>;

    /// Create the identity if missing and overwrite its nonce, atomically.
    ///
    /// Returns `true` when the record was created by this call.
    async fn upsert_nonce(&self, address: &str, nonce: &str) -> Result<bool, StoreError>;

    /// Replace the nonce with `next` only if it still equals `expected`.
    ///
    /// Returns `false` when the record is missing or its nonce has moved on.
    async fn rotate_nonce(
        &self,
        address: &str,
        expected: &str,
        next: &str,
    ) -> Result<bool, StoreError>;
}

/// Bearer-token session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn store_session(&self, session: &StoredSession, ttl_secs: u64)
        -> Result<(), StoreError>;

    async fn get_session(&self, token: &str) -> Result<Option<StoredSession>, StoreError>;

    /// Returns true if the session existed.
    async fn delete_session(&self, token: &str) -> Result<bool, StoreError>;
}

/// Fixed-window request counter.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one hit against `key`. Returns `true` while under `max` per window.
    async fn hit(&self, key: &str, max: u32, window_secs: u64) -> Result<bool, StoreError>;
}

/// Current UNIX time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
