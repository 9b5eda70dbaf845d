//! Wallet-level actions: balance, devnet airdrop, message signing and explorer links.

use blockchain::{
    amount::{lamports_to_sol, sol_to_lamports},
    with_deadline, Confirmation, SignerError,
};
use rust_decimal::Decimal;
use shared::{Error, Result};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tracing::{debug, error, info, warn};

use crate::send::TransferAsset;
use crate::TokenService;

/// Smallest airdrop the faucet is asked for, in SOL
pub const MIN_AIRDROP_SOL: Decimal = Decimal::from_parts(1, 0, 0, false, 1);
/// Largest airdrop the faucet is asked for, in SOL
pub const MAX_AIRDROP_SOL: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
/// SOL left behind by "max" so the transfer can still pay its fee
pub const NATIVE_FEE_RESERVE_SOL: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const EXPLORER_URL: &str = "https://explorer.solana.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub signature: Signature,
    pub message: String,
}

pub fn clamp_airdrop(sol: Decimal) -> Decimal {
    sol.max(MIN_AIRDROP_SOL).min(MAX_AIRDROP_SOL)
}

/// Explorer cluster name for an RPC endpoint
pub fn cluster_for_endpoint(endpoint: &str) -> &'static str {
    let endpoint = endpoint.to_ascii_lowercase();
    if endpoint.contains("devnet") {
        "devnet"
    } else if endpoint.contains("testnet") {
        "testnet"
    } else {
        "mainnet-beta"
    }
}

impl TokenService {
    /// Native balance of the connected wallet in SOL
    pub async fn refresh_balance(&self) -> Result<Decimal> {
        let owner = self.require_wallet()?;
        let lamports = self.reported(self.rpc.get_balance(&owner).await, "Failed to fetch balance")?;
        let sol = lamports_to_sol(lamports);
        debug!("Balance of {}: {} SOL", owner, sol);
        Ok(sol)
    }

    /// Ask the faucet for `sol` (clamped to the faucet's range) and wait for it
    /// to land within the confirmation deadline.
    pub async fn request_airdrop(&self, sol: Decimal) -> Result<Signature> {
        let _guard = self.airdropping.begin()?;
        let owner = self.require_wallet()?;

        let amount = clamp_airdrop(sol);
        if amount != sol {
            debug!("Airdrop of {} SOL clamped to {}", sol, amount);
        }
        let lamports = sol_to_lamports(amount)
            .ok_or_else(|| Error::Internal(format!("Airdrop amount {} out of range", amount)))?;

        let commitment = self.settings.submit.commitment;
        let checkpoint = self.reported(
            self.rpc.get_latest_checkpoint(commitment).await,
            "Failed to fetch recent blockhash",
        )?;

        let toast = self
            .notifier
            .loading(&format!("Requesting airdrop of {} SOL...", amount.normalize()));

        let signature = match self.rpc.request_airdrop(&owner, lamports).await {
            Ok(signature) => signature,
            Err(e) => {
                error!("Airdrop request for {} failed: {}", owner, e);
                self.notifier.dismiss(toast);
                self.notifier.error(airdrop_error_message(&e));
                return Err(e);
            }
        };

        self.notifier.update_loading(toast, "Confirming airdrop...");
        let confirmed = with_deadline(
            "airdrop confirmation",
            self.settings.submit.confirm_timeout,
            self.rpc.confirm_transaction(&signature, &checkpoint, commitment),
        )
        .await;
        self.notifier.dismiss(toast);

        match confirmed {
            Ok(Ok(Confirmation::Included { err: None })) => {
                info!("Airdrop of {} SOL to {} confirmed: {}", amount, owner, signature);
                self.notifier.success("Airdrop successful");
                Ok(signature)
            }
            Ok(Ok(Confirmation::Included { err: Some(details) })) => {
                error!("Airdrop {} failed on chain: {}", signature, details);
                self.notifier.error("Airdrop failed");
                Err(Error::ExecutionError {
                    signature: signature.to_string(),
                    details: details.to_string(),
                })
            }
            Ok(Ok(Confirmation::Expired)) => {
                warn!("Airdrop {} expired", signature);
                self.notifier.error("Airdrop failed");
                Err(Error::Expired {
                    signature: signature.to_string(),
                })
            }
            Ok(Err(e)) => {
                warn!("Airdrop {} confirmation failed: {}", signature, e);
                self.notifier.error("Airdrop failed");
                Err(e)
            }
            Err(elapsed) => {
                warn!("{}", elapsed);
                self.notifier
                    .error("Airdrop request timed out. The network may be congested.");
                Err(Error::ConfirmationTimeout {
                    signature: signature.to_string(),
                })
            }
        }
    }

    /// Sign a free-form message with the wallet and verify the result locally
    pub async fn sign_message(&self, message: &str) -> Result<SignedMessage> {
        let _guard = self.signing.begin()?;
        let signer_key = self.require_wallet()?;

        if !self.signer.supports_message_signing() {
            return self.reject(Error::Unsupported(
                "Wallet does not support message signing".to_string(),
            ));
        }
        if message.trim().is_empty() {
            return self.reject(Error::InvalidInput("Please enter a message to sign".to_string()));
        }

        let signed = with_deadline(
            "wallet sign_message",
            self.settings.submit.sign_timeout,
            self.signer.sign_message(message.as_bytes()),
        )
        .await;

        let signature = match signed {
            Ok(Ok(signature)) => signature,
            Ok(Err(SignerError::UserRejected)) => {
                self.notifier.error("Message signing rejected by user");
                return Err(Error::UserRejected);
            }
            Ok(Err(SignerError::Timeout)) | Err(_) => {
                self.notifier.error("Message signing timed out. Please try again.");
                return Err(Error::SigningTimeout);
            }
            Ok(Err(e)) => {
                error!("Message signing failed: {}", e);
                self.notifier.error("An error occurred while signing the message");
                return Err(e.into());
            }
        };

        if !signature.verify(signer_key.as_ref(), message.as_bytes()) {
            self.notifier.error("Signature verification failed");
            return Err(Error::Internal("Signature verification failed".to_string()));
        }

        info!("Message signed by {}", signer_key);
        self.notifier
            .success(&format!("Message signed successfully. Signature: {}", signature));
        Ok(SignedMessage {
            signature,
            message: message.to_string(),
        })
    }

    /// Explorer page for an address on the cluster the RPC client points at
    pub fn explorer_url(&self, address: &Pubkey) -> String {
        match cluster_for_endpoint(&self.rpc.endpoint()) {
            "mainnet-beta" => format!("{}/address/{}", EXPLORER_URL, address),
            cluster => format!("{}/address/{}?cluster={}", EXPLORER_URL, address, cluster),
        }
    }

    /// Largest amount the "max" button fills in for `asset`
    pub async fn max_sendable(&self, asset: &TransferAsset) -> Result<Decimal> {
        match asset {
            TransferAsset::Native => {
                let balance = self.refresh_balance().await?;
                Ok((balance - NATIVE_FEE_RESERVE_SOL).max(Decimal::ZERO))
            }
            TransferAsset::Token(holding) => Ok(holding.balance),
        }
    }
}

fn airdrop_error_message(err: &Error) -> &'static str {
    let text = err.to_string().to_lowercase();
    if text.contains("timeout") || text.contains("timed out") {
        "Airdrop request timed out. The network may be congested."
    } else if text.contains("429") {
        "Too many airdrop requests. Please try again later."
    } else if text.contains("insufficient") {
        "Airdrop failed: Insufficient funds in the faucet."
    } else {
        "An error occurred while requesting airdrop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sol(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    #[test]
    fn test_airdrop_limits() {
        assert_eq!(MIN_AIRDROP_SOL, sol("0.1"));
        assert_eq!(MAX_AIRDROP_SOL, sol("5"));
        assert_eq!(NATIVE_FEE_RESERVE_SOL, sol("0.01"));
    }

    #[test]
    fn test_clamp_airdrop() {
        assert_eq!(clamp_airdrop(sol("0")), sol("0.1"));
        assert_eq!(clamp_airdrop(sol("-3")), sol("0.1"));
        assert_eq!(clamp_airdrop(sol("2.5")), sol("2.5"));
        assert_eq!(clamp_airdrop(sol("50")), sol("5"));
    }

    #[test]
    fn test_cluster_for_endpoint() {
        assert_eq!(cluster_for_endpoint("https://api.devnet.solana.com"), "devnet");
        assert_eq!(cluster_for_endpoint("https://api.testnet.solana.com"), "testnet");
        assert_eq!(cluster_for_endpoint("https://api.mainnet-beta.solana.com"), "mainnet-beta");
    }

    #[test]
    fn test_airdrop_error_classification() {
        let message = |e: Error| airdrop_error_message(&e);

        assert_eq!(
            message(Error::SolanaRpc("request timed out".to_string())),
            "Airdrop request timed out. The network may be congested."
        );
        assert_eq!(
            message(Error::SolanaRpc("HTTP status 429 Too Many Requests".to_string())),
            "Too many airdrop requests. Please try again later."
        );
        assert_eq!(
            message(Error::SolanaRpc("faucet has insufficient funds".to_string())),
            "Airdrop failed: Insufficient funds in the faucet."
        );
        assert_eq!(
            message(Error::SolanaRpc("connection refused".to_string())),
            "An error occurred while requesting airdrop"
        );
    }
}
