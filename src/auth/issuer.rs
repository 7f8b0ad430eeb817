//! Challenge issuance.

use super::address::normalize_address;
use super::nonce::generate_nonce;
use crate::error::AuthError;
use crate::storage::IdentityStore;
use std::sync::Arc;

/// Issues a fresh login nonce for a claimed address.
///
/// The first challenge for an unseen address creates its identity record;
/// there is no separate registration step.
#[derive(Clone)]
pub struct ChallengeIssuer {
    store: Arc<dyn IdentityStore>,
}

impl ChallengeIssuer {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Store a new nonce for `claimed_address` and return it.
    ///
    /// Any nonce issued earlier for the same address stops being redeemable.
    pub async fn issue(&self, claimed_address: &str) -> Result<String, AuthError> {
        let address = normalize_address(claimed_address)?;
        let nonce = generate_nonce();

        let created = self.store.upsert_nonce(&address, &nonce).await?;
        if created {
            tracing::info!(action = "identity_created", address = %address, "New identity");
        }
        tracing::debug!(action = "nonce_issued", address = %address, "Challenge issued");

        Ok(nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn issuer() -> (ChallengeIssuer, MemoryStore) {
        let store = MemoryStore::new();
        (ChallengeIssuer::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_issue_stores_nonce() {
        let (issuer, store) = issuer();

        let nonce = issuer.issue("0xABCdef").await.unwrap();
        assert_eq!(nonce.len(), 32);

        let identity = store.get("0xabcdef").await.unwrap().unwrap();
        assert_eq!(identity.address, "0xabcdef");
        assert_eq!(identity.nonce, Some(nonce));
    }

    #[tokio::test]
    async fn test_issue_is_case_insensitive() {
        let (issuer, store) = issuer();

        issuer.issue("0xABC").await.unwrap();
        let second = issuer.issue("0xabc").await.unwrap();

        assert_eq!(store.identity_count(), 1);
        let identity = store.get("0xabc").await.unwrap().unwrap();
        assert_eq!(identity.nonce, Some(second));
    }

    #[tokio::test]
    async fn test_reissue_overwrites() {
        let (issuer, store) = issuer();

        let first = issuer.issue("0xabc").await.unwrap();
        let second = issuer.issue("0xabc").await.unwrap();
        assert_ne!(first, second);

        let identity = store.get("0xabc").await.unwrap().unwrap();
        assert_eq!(identity.nonce, Some(second));
        assert_eq!(store.identity_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_address_rejected() {
        let (issuer, store) = issuer();

        assert!(matches!(
            issuer.issue("").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            issuer.issue("  ").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert_eq!(store.identity_count(), 0);
    }
}
