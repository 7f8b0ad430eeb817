//! Redis-backed stores.
//!
//! Redis key patterns:
//! - `identity:{address}` — identity hash (`nonce`, `created_at`)
//! - `session:{token}` — session data (JSON)
//! - `ratelimit:{scope}:{ip}` — request counter with window TTL
//!
//! Identity hashes are only ever written by Lua scripts, so each nonce
//! update is atomic for that one key without any cross-identity locking.
//!
//! ## Zeroizing Session Data
//!
//! Session JSON read back from Redis is wrapped in `Zeroizing` so the copy
//! holding the bearer token is cleared from application memory on drop.
//! Redis keeps its own copy; this only covers the process.

use super::{unix_now, IdentityStore, RateLimiter, SessionStore, StoreError};
use crate::models::{StoredIdentity, StoredSession};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use zeroize::Zeroizing;

/// Create-if-missing, then overwrite the nonce. Returns 1 if created.
const UPSERT_NONCE_SCRIPT: &str = r"
local created = redis.call('HSETNX', KEYS[1], 'created_at', ARGV[2])
redis.call('HSET', KEYS[1], 'nonce', ARGV[1])
return created
";

/// Compare-and-swap on the nonce field. Returns 1 if swapped.
const ROTATE_NONCE_SCRIPT: &str = r"
local current = redis.call('HGET', KEYS[1], 'nonce')
if current and current == ARGV[1] then
    redis.call('HSET', KEYS[1], 'nonce', ARGV[2])
    return 1
end
return 0
";

/// Count a hit and start the window TTL on the first one, in one step so a
/// counter can never be left without an expiry. Returns the new count.
const RATE_LIMIT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('TTL', KEYS[1]) == -1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

fn identity_key(address: &str) -> String {
    format!("identity:{}", address)
}

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// Stores backed by a single Redis deployment.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// Open a client from a `redis://` URL.
    pub fn open(url: &str) -> Result<Self, StoreError> {
        Ok(Self::new(redis::Client::open(url)?))
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Round-trip a PING to fail fast at startup.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for RedisStore {
    async fn get(&self, address: &str) -> Result<Option<StoredIdentity>, StoreError> {
        let mut con = self.connection().await?;
        let (nonce, created_at): (Option<String>, Option<u64>) = redis::cmd("HMGET")
            .arg(identity_key(address))
            .arg("nonce")
            .arg("created_at")
            .query_async(&mut con)
            .await?;

        Ok(created_at.map(|created_at| StoredIdentity {
            address: address.to_string(),
            nonce: nonce.filter(|n| !n.is_empty()),
            created_at,
        }))
    }

    async fn upsert_nonce(&self, address: &str, nonce: &str) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let created: i32 = redis::Script::new(UPSERT_NONCE_SCRIPT)
            .key(identity_key(address))
            .arg(nonce)
            .arg(unix_now())
            .invoke_async(&mut con)
            .await?;
        Ok(created == 1)
    }

    async fn rotate_nonce(
        &self,
        address: &str,
        expected: &str,
        next: &str,
    ) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let swapped: i32 = redis::Script::new(ROTATE_NONCE_SCRIPT)
            .key(identity_key(address))
            .arg(expected)
            .arg(next)
            .invoke_async(&mut con)
            .await?;
        Ok(swapped == 1)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn store_session(
        &self,
        session: &StoredSession,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        let json = serde_json::to_string(session)?;
        con.set_ex::<_, _, ()>(session_key(&session.token), json, ttl_secs)
            .await?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<StoredSession>, StoreError> {
        let mut con = self.connection().await?;
        let json: Option<String> = con.get(session_key(token)).await?;

        match json {
            Some(data) => {
                let data = Zeroizing::new(data);
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let deleted: i32 = con.del(session_key(token)).await?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl RateLimiter for RedisStore {
    async fn hit(&self, key: &str, max: u32, window_secs: u64) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        let count: u32 = redis::Script::new(RATE_LIMIT_SCRIPT)
            .key(key)
            .arg(window_secs)
            .invoke_async(&mut con)
            .await?;

        Ok(count <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Connect to the test Redis, or `None` to skip.
    async fn test_store() -> Option<RedisStore> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let store = match RedisStore::open(&redis_url) {
            Ok(s) => s,
            Err(_) => {
                eprintln!("Skipping test: Redis not available");
                return None;
            }
        };

        if store.ping().await.is_err() {
            eprintln!("Skipping test: Redis connection failed");
            return None;
        }
        Some(store)
    }

    async fn cleanup(store: &RedisStore, key: &str) {
        if let Ok(mut con) = store.connection().await {
            let _: Result<(), _> = con.del(key).await;
        }
    }

    #[tokio::test]
    async fn test_upsert_then_rotate() {
        let Some(store) = test_store().await else {
            return;
        };
        let address = "0xtest-redis-upsert-rotate";
        cleanup(&store, &identity_key(address)).await;

        assert!(store.get(address).await.unwrap().is_none());

        assert!(store.upsert_nonce(address, "n1").await.unwrap());
        assert!(!store.upsert_nonce(address, "n2").await.unwrap());

        let identity = store.get(address).await.unwrap().unwrap();
        assert_eq!(identity.nonce.as_deref(), Some("n2"));

        // Stale expectation must not swap
        assert!(!store.rotate_nonce(address, "n1", "n3").await.unwrap());
        assert!(store.rotate_nonce(address, "n2", "n3").await.unwrap());

        let identity = store.get(address).await.unwrap().unwrap();
        assert_eq!(identity.nonce.as_deref(), Some("n3"));

        cleanup(&store, &identity_key(address)).await;
    }

    #[tokio::test]
    async fn test_rotate_missing_identity() {
        let Some(store) = test_store().await else {
            return;
        };
        let address = "0xtest-redis-missing";
        cleanup(&store, &identity_key(address)).await;

        assert!(!store.rotate_nonce(address, "n1", "n2").await.unwrap());
        assert!(store.get(address).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let Some(store) = test_store().await else {
            return;
        };
        let session = StoredSession {
            token: "test-redis-session-token".to_string(),
            address: "0xabc".to_string(),
            created_at: unix_now(),
            expires_at: unix_now() + 60,
        };

        store.store_session(&session, 60).await.unwrap();
        let loaded = store.get_session(&session.token).await.unwrap().unwrap();
        assert_eq!(loaded.address, "0xabc");

        assert!(store.delete_session(&session.token).await.unwrap());
        assert!(!store.delete_session(&session.token).await.unwrap());
        assert!(store.get_session(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let Some(store) = test_store().await else {
            return;
        };
        let key = "test:ratelimit:unit";
        cleanup(&store, key).await;

        assert!(store.hit(key, 3, 60).await.unwrap());
        assert!(store.hit(key, 3, 60).await.unwrap());
        assert!(store.hit(key, 3, 60).await.unwrap());
        // Fourth request should fail (over limit)
        assert!(!store.hit(key, 3, 60).await.unwrap());

        let mut con = store.connection().await.unwrap();
        let ttl: i64 = con.ttl(key).await.unwrap();
        assert!(ttl > 0 && ttl <= 60);

        cleanup(&store, key).await;
    }

    #[tokio::test]
    async fn test_rate_limit_repairs_missing_ttl() {
        let Some(store) = test_store().await else {
            return;
        };
        let key = "test:ratelimit:no-ttl";
        cleanup(&store, key).await;

        // A counter left behind without an expiry
        let mut con = store.connection().await.unwrap();
        let _: () = con.set(key, 5).await.unwrap();

        assert!(store.hit(key, 10, 60).await.unwrap());
        let ttl: i64 = con.ttl(key).await.unwrap();
        assert!(ttl > 0 && ttl <= 60);

        cleanup(&store, key).await;
    }
}
