use async_trait::async_trait;
use shared::{Error, Result};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use std::str::FromStr;

use crate::types::{Checkpoint, OnChainMetadata, ParsedTokenAccount, ProgramVariant};

/// What the network reported for a sent transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// Included at the requested commitment. `err` is the program error, if any,
    /// exactly as the network returned it.
    Included { err: Option<serde_json::Value> },
    /// The checkpoint's last valid block height passed without inclusion
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: CommitmentConfig,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: CommitmentConfig::confirmed(),
        }
    }
}

/// Parse `processed`, `confirmed` or `finalized`
pub fn parse_commitment(level: &str) -> Result<CommitmentConfig> {
    CommitmentConfig::from_str(level.trim())
        .map_err(|e| Error::Config(format!("Unknown commitment level '{}': {}", level, e)))
}

/// Network RPC collaborator
///
/// Read methods may be retried by implementations. `send_transaction` and
/// `request_airdrop` are non-idempotent and are attempted exactly once.
#[async_trait]
pub trait NetworkRpc: Send + Sync {
    /// Native balance in lamports
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64>;

    async fn get_latest_checkpoint(&self, commitment: CommitmentConfig) -> Result<Checkpoint>;

    /// Wait until `signature` reaches `commitment` or `checkpoint` expires.
    ///
    /// Callers race this against their own deadline.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        checkpoint: &Checkpoint,
        commitment: CommitmentConfig,
    ) -> Result<Confirmation>;

    async fn get_block_height(&self, commitment: CommitmentConfig) -> Result<u64>;

    /// Parsed token accounts of `owner` under one token program
    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        variant: ProgramVariant,
    ) -> Result<Vec<ParsedTokenAccount>>;

    /// Metadata embedded in the mint account, if the program supports it
    async fn get_mint_metadata(
        &self,
        mint: &Pubkey,
        variant: ProgramVariant,
    ) -> Result<Option<OnChainMetadata>>;

    async fn account_exists(&self, address: &Pubkey) -> Result<bool>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    /// Simulate without signature verification. Returns the serialized program
    /// error when the simulation fails.
    async fn simulate_transaction(&self, transaction: &Transaction) -> Result<Option<String>>;

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        options: &SendOptions,
    ) -> Result<Signature>;

    async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> Result<Signature>;

    /// URL of the endpoint queried first
    fn endpoint(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commitment_levels() {
        assert_eq!(parse_commitment("processed").unwrap(), CommitmentConfig::processed());
        assert_eq!(parse_commitment("confirmed").unwrap(), CommitmentConfig::confirmed());
        assert_eq!(parse_commitment(" finalized ").unwrap(), CommitmentConfig::finalized());
    }

    #[test]
    fn test_parse_commitment_rejects_unknown_level() {
        assert!(matches!(parse_commitment("eventually"), Err(Error::Config(_))));
    }
}
