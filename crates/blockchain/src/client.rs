use anyhow::Context;
use async_trait::async_trait;
use futures::future::BoxFuture;
use shared::{config::SolanaConfig, Error, Result};
use solana_account_decoder::UiAccountData;
use solana_client::{
    client_error::Result as ClientResult,
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSendTransactionConfig,
    rpc_request::TokenAccountsFilter,
    rpc_response::RpcKeyedAccount,
};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use spl_token_2022::{
    extension::{BaseStateWithExtensions, StateWithExtensions},
    state::Mint,
};
use spl_token_metadata_interface::state::TokenMetadata;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::retry::{retry_with_backoff, RetryConfig};
use crate::rpc::{parse_commitment, Confirmation, NetworkRpc, SendOptions};
use crate::types::{Checkpoint, OnChainMetadata, ParsedTokenAccount, ProgramVariant};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Upper bound on one confirmation poll loop, independent of caller deadlines
const DEFAULT_MAX_CONFIRM_LIFETIME: Duration = Duration::from_secs(120);

/// Solana client wrapper for blockchain interactions
pub struct SolanaClient {
    primary_client: RpcClient,
    fallback_client: Option<RpcClient>,
    retry_config: RetryConfig,
    poll_interval: Duration,
    max_confirm_lifetime: Duration,
}

impl SolanaClient {
    /// Create a new Solana client with primary and optional fallback RPC endpoints
    pub fn new(rpc_url: String, fallback_url: Option<String>, commitment: CommitmentConfig) -> Self {
        info!("Initializing Solana client with primary RPC: {}", rpc_url);

        let primary_client = RpcClient::new_with_commitment(rpc_url, commitment);

        let fallback_client = fallback_url.map(|url| {
            info!("Configuring fallback RPC: {}", url);
            RpcClient::new_with_commitment(url, commitment)
        });

        Self {
            primary_client,
            fallback_client,
            retry_config: RetryConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_confirm_lifetime: DEFAULT_MAX_CONFIRM_LIFETIME,
        }
    }

    pub fn from_config(config: &SolanaConfig) -> Result<Self> {
        let commitment = parse_commitment(&config.commitment)?;
        Ok(Self::new(
            config.rpc_url.clone(),
            config.rpc_fallback_url.clone(),
            commitment,
        ))
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_confirm_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_confirm_lifetime = lifetime;
        self
    }

    /// Get the primary RPC client (for advanced operations)
    pub fn primary_client(&self) -> &RpcClient {
        &self.primary_client
    }

    /// Run a read-only query with retry, switching to the fallback endpoint
    /// once the primary has exhausted its attempts.
    async fn read<T, F>(&self, operation_name: &str, query: F) -> Result<T>
    where
        F: for<'c> Fn(&'c RpcClient) -> BoxFuture<'c, ClientResult<T>>,
    {
        let primary = retry_with_backoff(operation_name, &self.retry_config, || {
            query(&self.primary_client)
        })
        .await;

        let primary_err = match primary {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        warn!("Primary RPC failed for {}: {}", operation_name, primary_err);

        let Some(fallback) = &self.fallback_client else {
            return Err(Error::SolanaRpc(format!("Primary RPC failed: {}", primary_err)));
        };

        debug!("Attempting fallback RPC for {}", operation_name);
        retry_with_backoff(operation_name, &self.retry_config, || query(fallback))
            .await
            .map_err(|e| {
                error!("Both primary and fallback RPC failed for {}: {}", operation_name, e);
                Error::SolanaRpc(format!("Fallback RPC failed: {}", e))
            })
    }
}

#[async_trait]
impl NetworkRpc for SolanaClient {
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64> {
        let owner = *owner;
        debug!("Fetching SOL balance for address: {}", owner);
        self.read("get_balance", move |client| {
            Box::pin(async move { client.get_balance(&owner).await })
        })
        .await
    }

    async fn get_latest_checkpoint(&self, commitment: CommitmentConfig) -> Result<Checkpoint> {
        let (blockhash, last_valid_block_height) = self
            .read("get_latest_blockhash", move |client| {
                Box::pin(async move { client.get_latest_blockhash_with_commitment(commitment).await })
            })
            .await?;

        Ok(Checkpoint {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        checkpoint: &Checkpoint,
        commitment: CommitmentConfig,
    ) -> Result<Confirmation> {
        let started = Instant::now();
        debug!("Polling confirmation for {} at {:?}", signature, commitment.commitment);

        loop {
            let statuses = self
                .primary_client
                .get_signature_statuses(&[*signature])
                .await
                .map_err(|e| Error::SolanaRpc(format!("Failed to get signature status: {}", e)))?
                .value;

            if let Some(Some(status)) = statuses.into_iter().next() {
                if status.satisfies_commitment(commitment) {
                    let err = status.err.map(|err| {
                        serde_json::to_value(&err)
                            .unwrap_or_else(|_| serde_json::Value::String(err.to_string()))
                    });
                    return Ok(Confirmation::Included { err });
                }
            }

            let block_height = self
                .primary_client
                .get_block_height_with_commitment(commitment)
                .await
                .map_err(|e| Error::SolanaRpc(format!("Failed to get block height: {}", e)))?;
            if block_height > checkpoint.last_valid_block_height {
                debug!(
                    "Block height {} passed last valid height {} for {}",
                    block_height, checkpoint.last_valid_block_height, signature
                );
                return Ok(Confirmation::Expired);
            }

            if started.elapsed() >= self.max_confirm_lifetime {
                return Err(Error::SolanaRpc(format!(
                    "Stopped polling {} after {:?}",
                    signature, self.max_confirm_lifetime
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_block_height(&self, commitment: CommitmentConfig) -> Result<u64> {
        self.read("get_block_height", move |client| {
            Box::pin(async move { client.get_block_height_with_commitment(commitment).await })
        })
        .await
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        variant: ProgramVariant,
    ) -> Result<Vec<ParsedTokenAccount>> {
        let owner = *owner;
        let program_id = variant.program_id();
        debug!("Fetching {:?} token accounts for address: {}", variant, owner);

        let accounts = self
            .read("get_token_accounts_by_owner", move |client| {
                Box::pin(async move {
                    client
                        .get_token_accounts_by_owner(&owner, TokenAccountsFilter::ProgramId(program_id))
                        .await
                })
            })
            .await?;

        let mut token_accounts = Vec::with_capacity(accounts.len());
        for account in &accounts {
            match parse_token_account_from_ui(account) {
                Ok(token_account) => token_accounts.push(token_account),
                Err(e) => {
                    warn!("Failed to parse token account {}: {}", account.pubkey, e);
                    continue;
                }
            }
        }

        debug!("Retrieved {} {:?} token accounts", token_accounts.len(), variant);
        Ok(token_accounts)
    }

    async fn get_mint_metadata(
        &self,
        mint: &Pubkey,
        variant: ProgramVariant,
    ) -> Result<Option<OnChainMetadata>> {
        if variant == ProgramVariant::Legacy {
            return Ok(None);
        }

        let mint = *mint;
        let account = self
            .read("get_mint_account", move |client| {
                Box::pin(async move {
                    client
                        .get_account_with_commitment(&mint, client.commitment())
                        .await
                })
            })
            .await?
            .value;

        match account {
            Some(account) => decode_embedded_metadata(&account.data)
                .map_err(|e| Error::NetworkQueryFailed(format!("Mint {}: {:#}", mint, e))),
            None => Ok(None),
        }
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        let address = *address;
        let response = self
            .read("get_account", move |client| {
                Box::pin(async move {
                    client
                        .get_account_with_commitment(&address, client.commitment())
                        .await
                })
            })
            .await?;
        Ok(response.value.is_some())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.read("get_minimum_balance_for_rent_exemption", move |client| {
            Box::pin(async move { client.get_minimum_balance_for_rent_exemption(data_len).await })
        })
        .await
    }

    async fn simulate_transaction(&self, transaction: &Transaction) -> Result<Option<String>> {
        let response = self
            .primary_client
            .simulate_transaction(transaction)
            .await
            .map_err(|e| Error::SolanaRpc(format!("Simulation request failed: {}", e)))?;

        match response.value.err {
            Some(err) => {
                if let Some(logs) = &response.value.logs {
                    debug!("Simulation logs: {:?}", logs);
                }
                Ok(Some(
                    serde_json::to_string(&err).unwrap_or_else(|_| err.to_string()),
                ))
            }
            None => Ok(None),
        }
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        options: &SendOptions,
    ) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(options.preflight_commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };

        self.primary_client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| {
                error!("Transaction send failed: {}", e);
                Error::SolanaRpc(e.to_string())
            })
    }

    async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> Result<Signature> {
        info!("Requesting airdrop of {} lamports to {}", lamports, recipient);
        self.primary_client
            .request_airdrop(recipient, lamports)
            .await
            .map_err(|e| Error::SolanaRpc(e.to_string()))
    }

    fn endpoint(&self) -> String {
        self.primary_client.url()
    }
}

/// Parse token account from RPC UI response
fn parse_token_account_from_ui(account: &RpcKeyedAccount) -> anyhow::Result<ParsedTokenAccount> {
    let UiAccountData::Json(parsed_account) = &account.account.data else {
        return Err(anyhow::anyhow!("Expected JSON parsed account data"));
    };

    let info = parsed_account
        .parsed
        .get("info")
        .ok_or_else(|| anyhow::anyhow!("Missing info field"))?;

    let mint = info
        .get("mint")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing mint field"))?;

    let token_amount = info
        .get("tokenAmount")
        .ok_or_else(|| anyhow::anyhow!("Missing tokenAmount field"))?;

    let amount = token_amount
        .get("amount")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing amount field"))?
        .parse::<u64>()
        .context("Failed to parse amount")?;

    let decimals = token_amount
        .get("decimals")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| anyhow::anyhow!("Missing decimals field"))?;

    Ok(ParsedTokenAccount {
        account: Pubkey::from_str(&account.pubkey).context("Invalid token account address")?,
        mint: Pubkey::from_str(mint).context("Invalid mint address")?,
        amount,
        decimals: u8::try_from(decimals).context("Decimals out of range")?,
    })
}

/// Read the variable-length `TokenMetadata` extension out of raw mint data
fn decode_embedded_metadata(data: &[u8]) -> anyhow::Result<Option<OnChainMetadata>> {
    let mint = StateWithExtensions::<Mint>::unpack(data).context("Account is not a mint")?;

    match mint.get_variable_len_extension::<TokenMetadata>() {
        Ok(metadata) => Ok(Some(OnChainMetadata {
            name: metadata.name,
            symbol: metadata.symbol,
            uri: metadata.uri,
        })),
        Err(_) => Ok(None),
    }
}
