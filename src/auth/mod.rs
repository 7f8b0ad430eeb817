//! Wallet authentication: nonce challenges, signature recovery, and sessions.
//!
//! Login is two requests. [`ChallengeIssuer::issue`] stores a fresh nonce for
//! the claimed address; the wallet signs [`challenge_message`] for it; then
//! [`ResponseVerifier::verify`] recovers the signer and rotates the nonce on
//! a match. Sessions are created separately by [`SessionManager`].

pub mod address;
pub mod issuer;
pub mod message;
pub mod middleware;
pub mod nonce;
pub mod recover;
pub mod session;
pub mod verifier;
pub mod wallet;

pub use address::normalize_address;
pub use issuer::ChallengeIssuer;
pub use message::{challenge_message, personal_message_hash, LOGIN_MESSAGE_PREFIX};
pub use middleware::{check_rate_limit, AppState, AuthSession};
pub use nonce::{generate_nonce, generate_session_token};
pub use recover::{recover_address, RecoveryError};
pub use session::SessionManager;
pub use verifier::{NoncePolicy, ResponseVerifier, Verification};
