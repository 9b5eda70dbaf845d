//! Token dashboard workflows: create, send, airdrop, sign, and keep holdings fresh.
//!
//! `TokenService` owns the collaborators and runs one workflow per user action.
//! Validation and balance pre-flight errors are reported here; everything after
//! the wallet is involved is reported by the `SubmissionCoordinator`.

use blockchain::{
    HttpMetadataSource, HoldingsFetcher, NetworkRpc, SolanaClient, SubmissionCoordinator,
    SubmitOptions, TransactionBuilder, WalletSigner,
};
use notification::NotificationSink;
use shared::{Config, Error, Result};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod create;
pub mod guard;
pub mod metadata;
pub mod monitor;
pub mod send;
pub mod validation;
pub mod wallet;

pub use create::{CreateTokenReport, CreateTokenRequest};
pub use guard::{InFlight, InFlightGuard};
pub use metadata::{
    MetadataDocument, MetadataFallbackChain, MetadataStore, MetadataTier, PinataStore,
    ResolvedMetadata,
};
pub use monitor::{BalanceMonitor, HoldingsSnapshot, MonitorHandle};
pub use send::{TransferAsset, TransferReport, TransferRequest};
pub use validation::{TokenValidator, TransferValidator};
pub use wallet::SignedMessage;

/// Settings every workflow reads
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub submit: SubmitOptions,
    /// Gateway host used in metadata URIs
    pub gateway: String,
    /// Last-resort metadata identifier
    pub default_metadata_cid: Option<String>,
    pub metadata_fetch_timeout: Duration,
    pub balance_poll_interval: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            submit: SubmitOptions::default(),
            gateway: shared::config::DEFAULT_GATEWAY.to_string(),
            default_metadata_cid: None,
            metadata_fetch_timeout: Duration::from_secs(10),
            balance_poll_interval: Duration::from_secs(30),
        }
    }
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            submit: SubmitOptions::from_config(config)?,
            gateway: config.metadata.gateway_url.clone(),
            default_metadata_cid: config.metadata.default_metadata_hash.clone(),
            metadata_fetch_timeout: Duration::from_millis(config.metadata.fetch_timeout_ms),
            balance_poll_interval: Duration::from_secs(config.monitoring.balance_poll_interval_secs),
        })
    }
}

/// Token service running user-initiated workflows
pub struct TokenService {
    rpc: Arc<dyn NetworkRpc>,
    signer: Arc<dyn WalletSigner>,
    notifier: Arc<dyn NotificationSink>,
    metadata_store: Arc<dyn MetadataStore>,
    holdings: Arc<HoldingsFetcher>,
    coordinator: SubmissionCoordinator,
    transaction_builder: TransactionBuilder,
    validator: TransferValidator,
    token_validator: TokenValidator,
    settings: ServiceSettings,
    creating: InFlight,
    sending: InFlight,
    airdropping: InFlight,
    signing: InFlight,
}

impl TokenService {
    pub fn new(
        rpc: Arc<dyn NetworkRpc>,
        signer: Arc<dyn WalletSigner>,
        notifier: Arc<dyn NotificationSink>,
        metadata_store: Arc<dyn MetadataStore>,
        holdings: Arc<HoldingsFetcher>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            coordinator: SubmissionCoordinator::new(signer.clone(), rpc.clone(), notifier.clone()),
            rpc,
            signer,
            notifier,
            metadata_store,
            holdings,
            transaction_builder: TransactionBuilder::new(),
            validator: TransferValidator::new(),
            token_validator: TokenValidator::new(),
            settings,
            creating: InFlight::new("create_token"),
            sending: InFlight::new("send"),
            airdropping: InFlight::new("airdrop"),
            signing: InFlight::new("sign_message"),
        }
    }

    /// Wire the Solana RPC client, HTTP metadata source and Pinata store from configuration
    pub fn from_config(
        config: &Config,
        signer: Arc<dyn WalletSigner>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let settings = ServiceSettings::from_config(config)?;
        let rpc: Arc<dyn NetworkRpc> = Arc::new(SolanaClient::from_config(&config.solana)?);
        let source = Arc::new(HttpMetadataSource::new(settings.metadata_fetch_timeout)?);
        let holdings = Arc::new(
            HoldingsFetcher::new(rpc.clone(), source).with_fetch_timeout(settings.metadata_fetch_timeout),
        );
        let store = Arc::new(PinataStore::new(config.metadata.pinata_jwt.clone())?);

        info!("Token service configured against {}", rpc.endpoint());
        Ok(Self::new(rpc, signer, notifier, store, holdings, settings))
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn rpc(&self) -> Arc<dyn NetworkRpc> {
        self.rpc.clone()
    }

    pub fn holdings_fetcher(&self) -> Arc<HoldingsFetcher> {
        self.holdings.clone()
    }

    /// Connected identity, reporting `Wallet not connected` otherwise
    fn require_wallet(&self) -> Result<Pubkey> {
        self.signer.public_key().ok_or_else(|| {
            self.notifier.error("Wallet not connected");
            Error::NotConnected
        })
    }

    /// Report a failed network or preparation step under `context`
    fn reported<T>(&self, result: Result<T>, context: &str) -> Result<T> {
        result.map_err(|e| {
            self.notifier.error(&format!("{}: {}", context, e));
            e
        })
    }

    /// Report a pre-flight failure and hand it back
    fn reject<T>(&self, err: Error) -> Result<T> {
        let message = match &err {
            Error::InvalidInput(msg)
            | Error::InsufficientBalance(msg)
            | Error::Unsupported(msg) => msg.clone(),
            other => other.to_string(),
        };
        self.notifier.error(&message);
        Err(err)
    }
}
