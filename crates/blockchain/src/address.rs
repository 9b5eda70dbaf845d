use shared::{Error, Result};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::debug;

/// Returns true when `candidate` is a base-58 string that decodes to a 32-byte
/// public key. Never panics.
pub fn is_valid_address(candidate: &str) -> bool {
    parse_address(candidate).is_ok()
}

/// Parse a Solana address
pub fn parse_address(candidate: &str) -> Result<Pubkey> {
    Pubkey::from_str(candidate).map_err(|e| {
        debug!("Rejected address {:?}: {}", candidate, e);
        Error::InvalidInput(format!("Invalid Solana address format: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_program_address_is_valid() {
        assert!(is_valid_address("11111111111111111111111111111111"));
    }

    #[test]
    fn test_token_program_addresses_are_valid() {
        assert!(is_valid_address(&spl_token::id().to_string()));
        assert!(is_valid_address(&spl_token_2022::id().to_string()));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("invalid_address"));
        // '0', 'O', 'I' and 'l' are not in the base-58 alphabet
        assert!(!is_valid_address("0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl"));
        // decodes, but to fewer than 32 bytes
        assert!(!is_valid_address("1111"));
        assert!(!is_valid_address(" 11111111111111111111111111111111"));
    }

    #[test]
    fn test_parse_address_error_kind() {
        match parse_address("not_a_valid_address") {
            Err(Error::InvalidInput(msg)) => {
                assert!(msg.contains("Invalid Solana address format"))
            }
            other => panic!("Expected InvalidInput error, got {:?}", other),
        }
    }
}
