//! In-memory collaborators for tests and local development.

use async_trait::async_trait;
use shared::{Error, Result};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::info;

use crate::builder::PendingTransaction;
use crate::metadata_source::OffChainMetadataSource;
use crate::rpc::{Confirmation, NetworkRpc, SendOptions};
use crate::signer::{SignerError, WalletSigner};
use crate::types::{Checkpoint, OffChainMetadata, OnChainMetadata, ParsedTokenAccount, ProgramVariant};

/// How `MockRpc::confirm_transaction` answers
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmBehavior {
    Confirm,
    ExecutionError(serde_json::Value),
    Expire,
    /// Never answers
    Hang,
    RpcError(String),
}

#[derive(Default)]
struct MockRpcState {
    balances: HashMap<Pubkey, u64>,
    token_accounts: HashMap<(Pubkey, ProgramVariant), Vec<ParsedTokenAccount>>,
    failing_variants: HashSet<ProgramVariant>,
    mint_metadata: HashMap<Pubkey, OnChainMetadata>,
    failing_mints: HashSet<Pubkey>,
    existing_accounts: HashSet<Pubkey>,
    confirm: Option<ConfirmBehavior>,
    simulation_error: Option<String>,
    simulation_unavailable: bool,
    send_error: Option<String>,
    airdrop_error: Option<String>,
    rent_lamports: u64,
    checkpoint_requests: usize,
    simulations: usize,
    sent: Vec<Transaction>,
    airdrops: Vec<(Pubkey, u64)>,
}

/// Scriptable `NetworkRpc` that records every write
pub struct MockRpc {
    state: Mutex<MockRpcState>,
}

impl Default for MockRpc {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRpc {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockRpcState {
                rent_lamports: 1_461_600,
                ..MockRpcState::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockRpcState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_balance(self, owner: Pubkey, lamports: u64) -> Self {
        self.set_balance(owner, lamports);
        self
    }

    pub fn with_token_account(self, owner: Pubkey, variant: ProgramVariant, account: ParsedTokenAccount) -> Self {
        self.state()
            .token_accounts
            .entry((owner, variant))
            .or_default()
            .push(account);
        self
    }

    pub fn with_failing_variant(self, variant: ProgramVariant) -> Self {
        self.state().failing_variants.insert(variant);
        self
    }

    pub fn with_mint_metadata(self, mint: Pubkey, metadata: OnChainMetadata) -> Self {
        self.state().mint_metadata.insert(mint, metadata);
        self
    }

    pub fn with_failing_mint(self, mint: Pubkey) -> Self {
        self.state().failing_mints.insert(mint);
        self
    }

    pub fn with_existing_account(self, address: Pubkey) -> Self {
        self.state().existing_accounts.insert(address);
        self
    }

    pub fn with_confirm_behavior(self, behavior: ConfirmBehavior) -> Self {
        self.state().confirm = Some(behavior);
        self
    }

    pub fn with_simulation_error(self, error: &str) -> Self {
        self.state().simulation_error = Some(error.to_string());
        self
    }

    /// Simulation requests themselves fail
    pub fn with_simulation_unavailable(self) -> Self {
        self.state().simulation_unavailable = true;
        self
    }

    pub fn with_send_error(self, error: &str) -> Self {
        self.state().send_error = Some(error.to_string());
        self
    }

    pub fn with_airdrop_error(self, error: &str) -> Self {
        self.state().airdrop_error = Some(error.to_string());
        self
    }

    pub fn set_balance(&self, owner: Pubkey, lamports: u64) {
        self.state().balances.insert(owner, lamports);
    }

    pub fn set_confirm_behavior(&self, behavior: ConfirmBehavior) {
        self.state().confirm = Some(behavior);
    }

    pub fn checkpoint_requests(&self) -> usize {
        self.state().checkpoint_requests
    }

    pub fn simulations(&self) -> usize {
        self.state().simulations
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.state().sent.clone()
    }

    pub fn airdrop_requests(&self) -> Vec<(Pubkey, u64)> {
        self.state().airdrops.clone()
    }

    /// Transactions sent plus airdrops requested
    pub fn network_writes(&self) -> usize {
        let state = self.state();
        state.sent.len() + state.airdrops.len()
    }
}

#[async_trait]
impl NetworkRpc for MockRpc {
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64> {
        Ok(self.state().balances.get(owner).copied().unwrap_or(0))
    }

    async fn get_latest_checkpoint(&self, _commitment: CommitmentConfig) -> Result<Checkpoint> {
        self.state().checkpoint_requests += 1;
        Ok(Checkpoint {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 1_000,
        })
    }

    async fn confirm_transaction(
        &self,
        _signature: &Signature,
        _checkpoint: &Checkpoint,
        _commitment: CommitmentConfig,
    ) -> Result<Confirmation> {
        let behavior = self.state().confirm.clone().unwrap_or(ConfirmBehavior::Confirm);
        match behavior {
            ConfirmBehavior::Confirm => Ok(Confirmation::Included { err: None }),
            ConfirmBehavior::ExecutionError(details) => Ok(Confirmation::Included { err: Some(details) }),
            ConfirmBehavior::Expire => Ok(Confirmation::Expired),
            ConfirmBehavior::Hang => std::future::pending().await,
            ConfirmBehavior::RpcError(msg) => Err(Error::SolanaRpc(msg)),
        }
    }

    async fn get_block_height(&self, _commitment: CommitmentConfig) -> Result<u64> {
        Ok(900)
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        variant: ProgramVariant,
    ) -> Result<Vec<ParsedTokenAccount>> {
        let state = self.state();
        if state.failing_variants.contains(&variant) {
            return Err(Error::SolanaRpc(format!("{:?} query unavailable", variant)));
        }
        Ok(state
            .token_accounts
            .get(&(*owner, variant))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_mint_metadata(
        &self,
        mint: &Pubkey,
        _variant: ProgramVariant,
    ) -> Result<Option<OnChainMetadata>> {
        let state = self.state();
        if state.failing_mints.contains(mint) {
            return Err(Error::NetworkQueryFailed(format!("Mint {} unreadable", mint)));
        }
        Ok(state.mint_metadata.get(mint).cloned())
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(self.state().existing_accounts.contains(address))
    }

    async fn get_minimum_balance_for_rent_exemption(&self, _data_len: usize) -> Result<u64> {
        Ok(self.state().rent_lamports)
    }

    async fn simulate_transaction(&self, _transaction: &Transaction) -> Result<Option<String>> {
        let mut state = self.state();
        state.simulations += 1;
        if state.simulation_unavailable {
            return Err(Error::SolanaRpc("simulation unavailable".to_string()));
        }
        Ok(state.simulation_error.clone())
    }

    async fn send_transaction(&self, transaction: &Transaction, _options: &SendOptions) -> Result<Signature> {
        let mut state = self.state();
        if let Some(err) = &state.send_error {
            return Err(Error::SolanaRpc(err.clone()));
        }
        state.sent.push(transaction.clone());
        Ok(transaction
            .signatures
            .first()
            .copied()
            .filter(|s| *s != Signature::default())
            .unwrap_or_else(Signature::new_unique))
    }

    async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> Result<Signature> {
        let mut state = self.state();
        if let Some(err) = &state.airdrop_error {
            return Err(Error::SolanaRpc(err.clone()));
        }
        state.airdrops.push((*recipient, lamports));
        *state.balances.entry(*recipient).or_insert(0) += lamports;
        Ok(Signature::new_unique())
    }

    fn endpoint(&self) -> String {
        "https://api.devnet.solana.com".to_string()
    }
}

/// How `MockSigner` answers signing requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignBehavior {
    Approve,
    Reject,
    /// The wallet reports its own timeout
    Timeout,
    /// Never answers
    Hang,
    Fail(String),
}

/// Scriptable wallet backed by a real keypair
pub struct MockSigner {
    keypair: Keypair,
    connected: AtomicBool,
    message_signing: bool,
    behavior: Mutex<SignBehavior>,
    handed_over: Mutex<Vec<Vec<Instruction>>>,
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSigner {
    /// Connected, approving, and able to sign messages
    pub fn new() -> Self {
        Self {
            keypair: Keypair::new(),
            connected: AtomicBool::new(true),
            message_signing: true,
            behavior: Mutex::new(SignBehavior::Approve),
            handed_over: Mutex::new(Vec::new()),
        }
    }

    pub fn disconnected() -> Self {
        let signer = Self::new();
        signer.connected.store(false, Ordering::SeqCst);
        signer
    }

    pub fn without_message_signing(mut self) -> Self {
        self.message_signing = false;
        self
    }

    pub fn with_behavior(self, behavior: SignBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    pub fn set_behavior(&self, behavior: SignBehavior) {
        *self.behavior.lock().unwrap_or_else(|p| p.into_inner()) = behavior;
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Operation lists of every transaction handed to the wallet
    pub fn handed_over(&self) -> Vec<Vec<Instruction>> {
        self.handed_over.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn behavior(&self) -> SignBehavior {
        self.behavior.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl WalletSigner for MockSigner {
    fn public_key(&self) -> Option<Pubkey> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.keypair.pubkey())
    }

    async fn connect(&self) -> std::result::Result<Pubkey, SignerError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.keypair.pubkey())
    }

    fn supports_message_signing(&self) -> bool {
        self.message_signing
    }

    async fn sign_message(&self, message: &[u8]) -> std::result::Result<Signature, SignerError> {
        if !self.message_signing {
            return Err(SignerError::Unsupported(
                "Wallet does not support message signing".to_string(),
            ));
        }
        match self.behavior() {
            SignBehavior::Approve => Ok(self.keypair.sign_message(message)),
            SignBehavior::Reject => Err(SignerError::UserRejected),
            SignBehavior::Timeout => Err(SignerError::Timeout),
            SignBehavior::Hang => std::future::pending().await,
            SignBehavior::Fail(msg) => Err(SignerError::Failed(msg)),
        }
    }

    async fn send_transaction(
        &self,
        transaction: &PendingTransaction,
        rpc: &dyn NetworkRpc,
        options: &SendOptions,
    ) -> std::result::Result<Signature, SignerError> {
        self.handed_over
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(transaction.operations().to_vec());

        match self.behavior() {
            SignBehavior::Approve => {}
            SignBehavior::Reject => return Err(SignerError::UserRejected),
            SignBehavior::Timeout => return Err(SignerError::Timeout),
            SignBehavior::Hang => return std::future::pending().await,
            SignBehavior::Fail(msg) => return Err(SignerError::Failed(msg)),
        }

        let mut signed = transaction
            .to_transaction()
            .map_err(|e| SignerError::Failed(e.to_string()))?;
        let blockhash = signed.message.recent_blockhash;
        signed
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| SignerError::Failed(e.to_string()))?;

        info!("Mock wallet signed transaction with {} operation(s)", transaction.operations().len());
        rpc.send_transaction(&signed, options)
            .await
            .map_err(|e| SignerError::Failed(e.to_string()))
    }
}

/// Serves fixed documents keyed by URI
#[derive(Default)]
pub struct MockMetadataSource {
    documents: HashMap<String, OffChainMetadata>,
}

impl MockMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, uri: &str, document: OffChainMetadata) -> Self {
        self.documents.insert(uri.to_string(), document);
        self
    }
}

#[async_trait]
impl OffChainMetadataSource for MockMetadataSource {
    async fn fetch(&self, uri: &str) -> Result<OffChainMetadata> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::NetworkQueryFailed(format!("GET {} returned 404 Not Found", uri)))
    }
}
