//! secp256k1 signer recovery for personal-message signatures.

use super::message::{keccak256, personal_message_hash};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1};

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Reasons signer recovery can fail.
///
/// The display text is returned to the client as-is, so it only describes
/// the submitted signature.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("invalid signature hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid signature length: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("invalid signature: {0}")]
    Secp256k1(#[from] secp256k1::Error),
}

/// Derive the wallet address for a public key.
///
/// The address is the last 20 bytes of keccak256 over the uncompressed
/// point without its `0x04` tag, rendered lowercase with a `0x` prefix.
pub fn address_of(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Decode a hex signature (with or without `0x`) into its compact form.
fn parse_signature(signature: &str) -> Result<RecoverableSignature, RecoveryError> {
    let hex_str = signature
        .strip_prefix("0x")
        .or_else(|| signature.strip_prefix("0X"))
        .unwrap_or(signature);
    let bytes = hex::decode(hex_str)?;

    if bytes.len() != SIGNATURE_LEN {
        return Err(RecoveryError::InvalidLength(bytes.len()));
    }

    // Wallets emit v as 27/28; some libraries use 0/1
    let v = bytes[64];
    let recid = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(RecoveryError::InvalidRecoveryId(v)),
    };
    let recid = RecoveryId::try_from(i32::from(recid))?;

    Ok(RecoverableSignature::from_compact(&bytes[..64], recid)?)
}

/// Recover the lowercase address that signed `message` via `personal_sign`.
pub fn recover_address(message: &str, signature: &str) -> Result<String, RecoveryError> {
    let signature = parse_signature(signature)?;
    let digest = Message::from_digest(personal_message_hash(message));

    let secp = Secp256k1::verification_only();
    let public_key = secp.recover_ecdsa(&digest, &signature)?;

    Ok(address_of(&public_key))
}
