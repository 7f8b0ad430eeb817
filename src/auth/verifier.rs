//! Challenge response verification.
//!
//! The verifier only decides. Establishing a session for a granted
//! verification is the caller's job.

use super::address::normalize_address;
use super::message::challenge_message;
use super::nonce::generate_nonce;
use super::recover::recover_address;
use crate::error::AuthError;
use crate::storage::IdentityStore;
use std::sync::Arc;

/// What happens to a nonce after a signature that does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoncePolicy {
    /// Mismatched signatures leave the nonce redeemable, so a client can
    /// retry without requesting a new challenge. Pair with rate limiting.
    #[default]
    RetainOnFailure,
    /// Any attempt that reaches signature recovery consumes the nonce.
    SingleUse,
}

impl NoncePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoncePolicy::RetainOnFailure => "retain",
            NoncePolicy::SingleUse => "single-use",
        }
    }
}

impl std::fmt::Display for NoncePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NoncePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retain" => Ok(NoncePolicy::RetainOnFailure),
            "single-use" => Ok(NoncePolicy::SingleUse),
            _ => Err(format!("Invalid nonce policy: {}", s)),
        }
    }
}

/// Outcome of a verification that got as far as signer recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Normalized claimed address.
    pub address: String,
    /// Address recovered from the signature.
    pub recovered: String,
    pub granted: bool,
}

impl Verification {
    /// The verified address, or `InvalidSignature` for a rejection.
    pub fn into_granted(self) -> Result<String, AuthError> {
        if self.granted {
            Ok(self.address)
        } else {
            Err(AuthError::InvalidSignature)
        }
    }
}

/// Checks a signature over the stored challenge for a claimed address.
#[derive(Clone)]
pub struct ResponseVerifier {
    store: Arc<dyn IdentityStore>,
    policy: NoncePolicy,
}

impl ResponseVerifier {
    pub fn new(store: Arc<dyn IdentityStore>, policy: NoncePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> NoncePolicy {
        self.policy
    }

    /// Verify `signature` against the challenge currently stored for
    /// `claimed_address`.
    ///
    /// On a match the nonce is rotated before the grant is returned. The
    /// rotation is a compare-and-swap against the nonce that was signed, so
    /// if a concurrent issue or login replaced it first the attempt is
    /// rejected and one signature can never be redeemed twice.
    pub async fn verify(
        &self,
        claimed_address: &str,
        signature: &str,
    ) -> Result<Verification, AuthError> {
        let address = normalize_address(claimed_address)?;
        let signature = signature.trim();
        if signature.is_empty() {
            return Err(AuthError::InvalidInput("Missing signature".to_string()));
        }

        let identity = self
            .store
            .get(&address)
            .await?
            .ok_or_else(|| AuthError::UnknownIdentity(address.clone()))?;
        let nonce = identity
            .nonce
            .ok_or_else(|| AuthError::UnknownIdentity(address.clone()))?;

        let message = challenge_message(&nonce);
        let recovered = recover_address(&message, signature)?;

        let granted = if recovered == address {
            let rotated = self
                .store
                .rotate_nonce(&address, &nonce, &generate_nonce())
                .await?;
            if !rotated {
                tracing::warn!(action = "auth_superseded", address = %address, "Nonce changed during verification");
            }
            rotated
        } else {
            if self.policy == NoncePolicy::SingleUse {
                self.store
                    .rotate_nonce(&address, &nonce, &generate_nonce())
                    .await?;
            }
            false
        };

        if granted {
            tracing::info!(action = "auth_verified", address = %address, "Signature verified");
        } else {
            tracing::warn!(action = "auth_failed", address = %address, recovered = %recovered, "Invalid signature");
        }

        Ok(Verification {
            address,
            recovered,
            granted,
        })
    }
}
