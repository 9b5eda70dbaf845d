use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::{hash::Hash, pubkey::Pubkey};

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_SYMBOL: &str = "UNK";

/// Token program a mint and its accounts belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramVariant {
    /// SPL Token
    Legacy,
    /// Token-2022, the metadata-capable program
    Extended,
}

impl ProgramVariant {
    pub const ALL: [ProgramVariant; 2] = [ProgramVariant::Legacy, ProgramVariant::Extended];

    pub fn program_id(&self) -> Pubkey {
        match self {
            ProgramVariant::Legacy => spl_token::id(),
            ProgramVariant::Extended => spl_token_2022::id(),
        }
    }

    pub fn from_program_id(program_id: &Pubkey) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.program_id() == *program_id)
    }
}

/// Recent blockhash plus the last block height at which it is still accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Token account as reported by a parsed owner query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTokenAccount {
    pub account: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
    pub decimals: u8,
}

/// Metadata embedded in a mint account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// Off-chain JSON document a metadata URI points to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffChainMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

/// A nonzero token balance decorated for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHolding {
    #[serde(with = "pubkey_string")]
    pub mint: Pubkey,
    pub balance: Decimal,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub program: ProgramVariant,
    /// Token account holding the balance
    #[serde(with = "pubkey_string")]
    pub account: Pubkey,
    pub decimals: u8,
}

impl TokenHolding {
    /// Whether display fields came from sentinels rather than metadata
    pub fn has_unknown_metadata(&self) -> bool {
        self.name == UNKNOWN_NAME && self.symbol == UNKNOWN_SYMBOL && self.image.is_empty()
    }
}

mod pubkey_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pubkey::from_str(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_variant_round_trips_through_program_id() {
        for variant in ProgramVariant::ALL {
            assert_eq!(
                ProgramVariant::from_program_id(&variant.program_id()),
                Some(variant)
            );
        }
        assert_eq!(ProgramVariant::from_program_id(&Pubkey::new_unique()), None);
    }

    #[test]
    fn test_holding_serializes_keys_as_base58() {
        let mint = Pubkey::new_unique();
        let holding = TokenHolding {
            mint,
            balance: Decimal::new(15, 1),
            name: UNKNOWN_NAME.to_string(),
            symbol: UNKNOWN_SYMBOL.to_string(),
            image: String::new(),
            program: ProgramVariant::Extended,
            account: Pubkey::new_unique(),
            decimals: 9,
        };

        let json = serde_json::to_value(&holding).unwrap();
        assert_eq!(json["mint"], mint.to_string());
        assert!(holding.has_unknown_metadata());
    }
}
