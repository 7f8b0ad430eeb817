//! Session establishment for verified identities.

use super::nonce::generate_session_token;
use crate::models::StoredSession;
use crate::storage::{unix_now, SessionStore, StoreError};
use std::sync::Arc;

/// Creates, resolves, and ends bearer-token sessions.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl_secs: u64,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Start a session for an address that has just been verified.
    pub async fn establish(&self, address: &str) -> Result<StoredSession, StoreError> {
        let now = unix_now();
        let session = StoredSession {
            token: generate_session_token(),
            address: address.to_string(),
            created_at: now,
            expires_at: now + self.ttl_secs,
        };
        self.store.store_session(&session, self.ttl_secs).await?;
        Ok(session)
    }

    /// Look up a live session.
    pub async fn resolve(&self, token: &str) -> Result<Option<StoredSession>, StoreError> {
        self.store.get_session(token).await
    }

    /// End a session. Returns true if it existed.
    pub async fn end(&self, token: &str) -> Result<bool, StoreError> {
        self.store.delete_session(token).await
    }
}
