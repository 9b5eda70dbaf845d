use async_trait::async_trait;
use shared::Error;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info};

use crate::builder::PendingTransaction;
use crate::rpc::{NetworkRpc, SendOptions};

/// Errors reported by a wallet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("User rejected the request")]
    UserRejected,

    /// The wallet gave up waiting on its own
    #[error("Wallet request timed out")]
    Timeout,

    #[error("Wallet not connected")]
    NotConnected,

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Failed(String),
}

impl From<SignerError> for Error {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::UserRejected => Error::UserRejected,
            SignerError::Timeout => Error::SigningTimeout,
            SignerError::NotConnected => Error::NotConnected,
            SignerError::Unsupported(msg) => Error::Unsupported(msg),
            SignerError::Failed(msg) => Error::Internal(msg),
        }
    }
}

/// Wallet collaborator holding the user's key
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Connected identity, `None` while disconnected
    fn public_key(&self) -> Option<Pubkey>;

    async fn connect(&self) -> Result<Pubkey, SignerError>;

    fn supports_message_signing(&self) -> bool {
        false
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Signature, SignerError> {
        Err(SignerError::Unsupported(
            "Wallet does not support message signing".to_string(),
        ))
    }

    /// Sign `transaction` as fee payer and broadcast it through `rpc`
    async fn send_transaction(
        &self,
        transaction: &PendingTransaction,
        rpc: &dyn NetworkRpc,
        options: &SendOptions,
    ) -> Result<Signature, SignerError>;
}

/// Signs with a local keypair without prompting
pub struct KeypairSigner {
    keypair: Keypair,
    connected: AtomicBool,
}

impl KeypairSigner {
    /// Starts disconnected
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            connected: AtomicBool::new(false),
        }
    }

    pub fn connected(keypair: Keypair) -> Self {
        Self {
            keypair,
            connected: AtomicBool::new(true),
        }
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn public_key(&self) -> Option<Pubkey> {
        self.is_connected().then(|| self.keypair.pubkey())
    }

    async fn connect(&self) -> Result<Pubkey, SignerError> {
        self.connected.store(true, Ordering::SeqCst);
        info!("Keypair wallet connected: {}", self.keypair.pubkey());
        Ok(self.keypair.pubkey())
    }

    fn supports_message_signing(&self) -> bool {
        true
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        if !self.is_connected() {
            return Err(SignerError::NotConnected);
        }
        Ok(self.keypair.sign_message(message))
    }

    async fn send_transaction(
        &self,
        transaction: &PendingTransaction,
        rpc: &dyn NetworkRpc,
        options: &SendOptions,
    ) -> Result<Signature, SignerError> {
        if !self.is_connected() {
            return Err(SignerError::NotConnected);
        }

        let mut signed = transaction
            .to_transaction()
            .map_err(|e| SignerError::Failed(e.to_string()))?;
        let blockhash = signed.message.recent_blockhash;
        signed
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| SignerError::Failed(e.to_string()))?;

        if !signed.is_signed() {
            return Err(SignerError::Failed(
                "Transaction is missing required signatures".to_string(),
            ));
        }

        debug!("Keypair wallet broadcasting transaction");
        rpc.send_transaction(&signed, options)
            .await
            .map_err(|e| SignerError::Failed(e.to_string()))
    }
}
