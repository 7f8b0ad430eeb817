//! Challenge message format and personal-message digest.
//!
//! The message is a protocol constant shared with the browser signer. Any
//! drift between the two sides makes every recovery yield an unrelated
//! address, so logins fail as `InvalidSignature` rather than erroring.

use sha3::{Digest, Keccak256};

/// Version 1 challenge template: `"Login nonce: " + nonce`.
pub const LOGIN_MESSAGE_PREFIX: &str = "Login nonce: ";

/// EIP-191 version 0x45 prefix applied by `personal_sign`.
const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Build the exact text the wallet is asked to sign.
pub fn challenge_message(nonce: &str) -> String {
    format!("{}{}", LOGIN_MESSAGE_PREFIX, nonce)
}

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Digest signed by `personal_sign` / `eth_sign` for a text message.
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}
