use blockchain::{address::parse_address, amount::to_raw_amount};
use rust_decimal::Decimal;
use shared::{Error, Result};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::create::CreateTokenRequest;

/// Recipient and amount that passed every local check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub recipient: Pubkey,
    pub amount: Decimal,
}

/// Input checks that run before anything touches the network
///
/// Every failure is `Error::InvalidInput` carrying the message shown to the user.
pub struct TransferValidator;

impl TransferValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, sender: &Pubkey, recipient: &str, amount: Decimal) -> Result<ValidatedTransfer> {
        if recipient.trim().is_empty() {
            return Err(invalid("Please enter a receiver address"));
        }

        let recipient = parse_address(recipient).map_err(|_| invalid("Invalid address"))?;

        if amount <= Decimal::ZERO {
            return Err(invalid("Amount must be greater than 0"));
        }

        if recipient == *sender {
            return Err(invalid("Cannot send to yourself"));
        }

        debug!("Transfer of {} to {} passed validation", amount, recipient);
        Ok(ValidatedTransfer { recipient, amount })
    }
}

impl Default for TransferValidator {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TokenValidator;

impl TokenValidator {
    pub fn new() -> Self {
        Self
    }

    /// Returns the raw initial supply in base units
    pub fn validate(&self, request: &CreateTokenRequest) -> Result<u64> {
        if request.name.trim().is_empty() || request.symbol.trim().is_empty() {
            return Err(invalid("Token name and symbol are required"));
        }

        to_raw_amount(Decimal::from(request.initial_supply), request.decimals)
            .ok_or_else(|| invalid("Initial supply is too large for the chosen decimals"))
    }
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidInput(message.to_string())
}
