//! Client-side wallet helpers: key generation and `personal_sign`.
//!
//! The server never holds user keys. These exist for the `keygen` and
//! `sign` subcommands and for exercising the login flow in tests.

use super::message::personal_message_hash;
use super::recover::address_of;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

/// Generate a random secp256k1 secret key.
pub fn generate_secret_key() -> SecretKey {
    loop {
        let mut seed = [0u8; 32];
        rand::fill(&mut seed);
        // Out-of-range scalars are astronomically rare; draw again
        if let Ok(key) = SecretKey::from_slice(&seed) {
            seed.fill(0);
            return key;
        }
    }
}

/// Parse a hex secret key, with or without `0x`.
pub fn parse_secret_key(hex_str: &str) -> Result<SecretKey, String> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(hex_str).map_err(|e| format!("Invalid secret key hex: {}", e))?;
    SecretKey::from_slice(&bytes).map_err(|e| format!("Invalid secret key: {}", e))
}

/// Address controlled by `secret_key`.
pub fn address_of_secret(secret_key: &SecretKey) -> String {
    let secp = Secp256k1::signing_only();
    address_of(&PublicKey::from_secret_key(&secp, secret_key))
}

/// Sign `message` as a wallet's `personal_sign` would.
///
/// Returns `0x`-prefixed hex of `r || s || v` with `v` in {27, 28}.
pub fn sign_message(secret_key: &SecretKey, message: &str) -> String {
    let secp = Secp256k1::signing_only();
    let digest = Message::from_digest(personal_message_hash(message));
    let (recid, compact) = secp
        .sign_ecdsa_recoverable(&digest, secret_key)
        .serialize_compact();

    let mut bytes = [0u8; 65];
    bytes[..64].copy_from_slice(&compact);
    bytes[64] = 27 + i32::from(recid) as u8;
    format!("0x{}", hex::encode(bytes))
}
