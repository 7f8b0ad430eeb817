//! In-process stores for development and tests.
//!
//! `DashMap` shards its locks, and the entry API holds the shard lock for the
//! duration of a read-modify-write, which gives the same per-key atomicity as
//! the Redis Lua scripts.
//!
//! Redis expires sessions and rate windows with key TTLs. Here every
//! `SWEEP_INTERVAL`th write drops the expired ones, so entries that are
//! never read again do not accumulate.

use super::{unix_now, IdentityStore, RateLimiter, SessionStore, StoreError};
use crate::models::{StoredIdentity, StoredSession};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Writes between expiry sweeps.
pub const SWEEP_INTERVAL: u64 = 256;

#[derive(Debug)]
struct Window {
    started: Instant,
    length: Duration,
    count: u32,
}

impl Window {
    fn expired(&self) -> bool {
        self.started.elapsed() >= self.length
    }
}

/// Memory-backed identity, session, and rate-limit storage.
///
/// Cloning shares the underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    identities: Arc<DashMap<String, StoredIdentity>>,
    sessions: Arc<DashMap<String, StoredSession>>,
    windows: Arc<DashMap<String, Window>>,
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identity records.
    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of rate-limit windows, including expired ones not yet swept.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Drop expired sessions and rate-limit windows.
    pub fn sweep(&self) {
        let now = unix_now();
        self.sessions.retain(|_, s| s.expires_at > now);
        self.windows.retain(|_, w| !w.expired());
    }

    /// Count a write and sweep on every `SWEEP_INTERVAL`th one.
    ///
    /// Must not be called while holding a map reference.
    fn note_write(&self) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_INTERVAL == 0 {
            self.sweep();
            tracing::debug!(
                sessions = self.sessions.len(),
                windows = self.windows.len(),
                "Swept expired entries"
            );
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn get(&self, address: &str) -> Result<Option<StoredIdentity>, StoreError> {
        Ok(self.identities.get(address).map(|r| r.value().clone()))
    }

    async fn upsert_nonce(&self, address: &str, nonce: &str) -> Result<bool, StoreError> {
        match self.identities.entry(address.to_string()) {
            Entry::Occupied(mut e) => {
                e.get_mut().nonce = Some(nonce.to_string());
                Ok(false)
            }
            Entry::Vacant(e) => {
                e.insert(StoredIdentity {
                    address: address.to_string(),
                    nonce: Some(nonce.to_string()),
                    created_at: unix_now(),
                });
                Ok(true)
            }
        }
    }

    async fn rotate_nonce(
        &self,
        address: &str,
        expected: &str,
        next: &str,
    ) -> Result<bool, StoreError> {
        let Some(mut identity) = self.identities.get_mut(address) else {
            return Ok(false);
        };
        if identity.nonce.as_deref() != Some(expected) {
            return Ok(false);
        }
        identity.nonce = Some(next.to_string());
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn store_session(
        &self,
        session: &StoredSession,
        _ttl_secs: u64,
    ) -> Result<(), StoreError> {
        self.note_write();
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<StoredSession>, StoreError> {
        // Expired entries are dropped lazily on read
        let session = self.sessions.get(token).map(|r| r.value().clone());
        match session {
            Some(s) if s.expires_at <= unix_now() => {
                self.sessions.remove(token);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.remove(token).is_some())
    }
}

#[async_trait]
impl RateLimiter for MemoryStore {
    async fn hit(&self, key: &str, max: u32, window_secs: u64) -> Result<bool, StoreError> {
        self.note_write();

        let length = Duration::from_secs(window_secs);
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: Instant::now(),
            length,
            count: 0,
        });

        if entry.expired() {
            entry.started = Instant::now();
            entry.length = length;
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);

        Ok(entry.count <= max)
    }
}
