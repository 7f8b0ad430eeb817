//! Nonce and session token generation.

use base64::{engine::general_purpose, Engine as _};
use rand::Rng;

/// Random bytes per login nonce.
pub const NONCE_BYTES: usize = 16;

/// Generate a cryptographically random login nonce.
///
/// Returns 32 lowercase hex characters from 16 random bytes.
pub fn generate_nonce() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; NONCE_BYTES];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

/// Generate a cryptographically random session token.
///
/// Returns a base64-encoded string (44 characters) from 32 random bytes.
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    general_purpose::STANDARD.encode(bytes)
}
