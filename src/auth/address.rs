//! Wallet address normalization.

use crate::error::AuthError;

/// Normalize a claimed wallet address.
///
/// Addresses are case-insensitive identities: the checksummed and lowercase
/// forms name the same account. Every lookup, storage key, and comparison
/// goes through this function.
pub fn normalize_address(raw: &str) -> Result<String, AuthError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidInput("Missing address".to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_checksummed_address() {
        assert_eq!(
            normalize_address("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23").unwrap(),
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(normalize_address("  0xABC \n").unwrap(), "0xabc");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            normalize_address(""),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize_address("   "),
            Err(AuthError::InvalidInput(_))
        ));
    }
}
