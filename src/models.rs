//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models represent persisted records.

use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Models
// ============================================================================

/// Request for a login nonce.
///
/// Absent and `null` fields both read as empty, so validation reports them
/// as bad input instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct NonceRequest {
    #[serde(default)]
    pub address: Option<String>,
}

impl NonceRequest {
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or("")
    }
}

/// Response containing the nonce to embed in the signed message.
#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub nonce: String, // 32 hex chars
}

/// Request to verify a signed challenge.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub signature: Option<String>, // 0x-prefixed hex, 65 bytes
}

impl VerifyRequest {
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or("")
    }

    pub fn signature(&self) -> &str {
        self.signature.as_deref().unwrap_or("")
    }
}

/// Response after successful verification.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub address: String,
    pub token: String,
}

/// Response for the authenticated dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub address: String,
    pub message: String,
}

// ============================================================================
// Storage Models
// ============================================================================

/// Identity record. One per wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub address: String, // lowercase
    pub nonce: Option<String>,
    pub created_at: u64,
}

/// Session data as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub address: String,
    pub created_at: u64,
    pub expires_at: u64,
}
