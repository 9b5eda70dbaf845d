use blockchain::{ProgressLabels, SubmissionOutcome};
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use solana_sdk::{
    instruction::Instruction,
    program_error::ProgramError,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id, instruction::create_associated_token_account,
};
use spl_token_2022::{
    extension::{metadata_pointer, ExtensionType},
    state::Mint,
};
use spl_token_metadata_interface::state::TokenMetadata;
use std::sync::Arc;
use tracing::{info, warn};

use crate::metadata::{metadata_uri, MetadataDocument, MetadataFallbackChain, MetadataTier};
use crate::TokenService;

pub const DEFAULT_DECIMALS: u8 = 9;
pub const DEFAULT_INITIAL_SUPPLY: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTokenRequest {
    pub name: String,
    pub symbol: String,
    pub description: String,
    /// Empty means a placeholder image
    pub image_url: String,
    pub decimals: u8,
    /// Whole tokens minted to the creator
    pub initial_supply: u64,
}

impl CreateTokenRequest {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            description: String::new(),
            image_url: String::new(),
            decimals: DEFAULT_DECIMALS,
            initial_supply: DEFAULT_INITIAL_SUPPLY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTokenReport {
    pub mint: Pubkey,
    pub metadata_uri: String,
    pub metadata_tier: MetadataTier,
    /// Creator's associated token account receiving the supply
    pub token_account: Pubkey,
    /// Step 1: create and initialize the mint
    pub mint_outcome: SubmissionOutcome,
    /// Step 2: create the token account and mint the supply. `None` when step 1
    /// did not confirm.
    pub supply_outcome: Option<SubmissionOutcome>,
}

impl CreateTokenReport {
    pub fn is_complete(&self) -> bool {
        self.mint_outcome.is_confirmed()
            && self
                .supply_outcome
                .as_ref()
                .map(SubmissionOutcome::is_confirmed)
                .unwrap_or(false)
    }
}

impl TokenService {
    /// Create a Token-2022 mint with embedded metadata and mint the initial supply
    /// to the creator.
    ///
    /// Metadata is resolved before any on-chain work. The supply is only minted
    /// once the mint itself is confirmed.
    pub async fn create_token(&self, request: CreateTokenRequest) -> Result<CreateTokenReport> {
        let _guard = self.creating.begin()?;
        let payer = self.require_wallet()?;

        let raw_supply = match self.token_validator.validate(&request) {
            Ok(raw) => raw,
            Err(e) => return self.reject(e),
        };

        let name = request.name.trim().to_string();
        let symbol = request.symbol.trim().to_string();
        let document = MetadataDocument::new(&name, &symbol, &request.description, &request.image_url);
        let chain = MetadataFallbackChain::standard(
            self.metadata_store.clone(),
            document,
            self.settings.default_metadata_cid.clone(),
        );
        let resolved = match chain.resolve().await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.notifier.error("Failed to create metadata. Please try again later.");
                return Err(e);
            }
        };
        let uri = metadata_uri(&self.settings.gateway, &resolved.cid);
        info!("Token metadata at {} ({:?})", uri, resolved.tier);

        let mint = Arc::new(Keypair::new());
        let program_id = spl_token_2022::id();
        let operations = self.reported(
            self.mint_operations(&payer, &mint.pubkey(), &name, &symbol, &uri, request.decimals)
                .await,
            "Failed to prepare token",
        )?;

        let checkpoint = self.reported(
            self.rpc
                .get_latest_checkpoint(self.settings.submit.commitment)
                .await,
            "Failed to fetch recent blockhash",
        )?;
        let pending = self
            .transaction_builder
            .build(operations, payer, checkpoint)
            .with_co_signer(mint.clone());

        let labels = ProgressLabels::default().with_success(format!(
            "Token mint created successfully! Mint address: {}",
            mint.pubkey()
        ));
        let mint_outcome = self
            .coordinator
            .submit_with_labels(pending, &self.settings.submit, &labels)
            .await?;

        let token_account = get_associated_token_address_with_program_id(&payer, &mint.pubkey(), &program_id);
        let mut report = CreateTokenReport {
            mint: mint.pubkey(),
            metadata_uri: uri,
            metadata_tier: resolved.tier,
            token_account,
            mint_outcome,
            supply_outcome: None,
        };

        if !report.mint_outcome.is_confirmed() {
            warn!(
                "Mint {} not confirmed ({:?}); skipping supply step",
                report.mint,
                report.mint_outcome.state()
            );
            return Ok(report);
        }

        let mint_to = spl_token_2022::instruction::mint_to(
            &program_id,
            &mint.pubkey(),
            &token_account,
            &payer,
            &[],
            raw_supply,
        )
        .map_err(program_error);
        let operations = vec![
            create_associated_token_account(&payer, &payer, &mint.pubkey(), &program_id),
            self.reported(mint_to, "Failed to prepare minting")?,
        ];

        // The first checkpoint may already be close to expiry
        let checkpoint = self.reported(
            self.rpc
                .get_latest_checkpoint(self.settings.submit.commitment)
                .await,
            "Failed to fetch recent blockhash",
        )?;
        let pending = self.transaction_builder.build(operations, payer, checkpoint);

        let labels = ProgressLabels {
            sending: "Sending minting transaction...".to_string(),
            confirming: "Confirming minting transaction...".to_string(),
            success: format!("{} tokens minted successfully!", request.initial_supply),
            failure_prefix: "Minting transaction failed: ".to_string(),
        };
        report.supply_outcome = Some(
            self.coordinator
                .submit_with_labels(pending, &self.settings.submit, &labels)
                .await?,
        );

        info!(
            "Token {} created, supply step {:?}",
            report.mint,
            report.supply_outcome.as_ref().map(SubmissionOutcome::state)
        );
        Ok(report)
    }

    /// create account, metadata pointer, initialize mint, write metadata
    async fn mint_operations(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        name: &str,
        symbol: &str,
        uri: &str,
        decimals: u8,
    ) -> Result<Vec<Instruction>> {
        let program_id = spl_token_2022::id();

        let mint_len = ExtensionType::try_calculate_account_len::<Mint>(&[ExtensionType::MetadataPointer])
            .map_err(program_error)?;
        let metadata_len = TokenMetadata {
            name: name.to_string(),
            symbol: symbol.to_string(),
            uri: uri.to_string(),
            ..TokenMetadata::default()
        }
        .tlv_size_of()
        .map_err(program_error)?;

        // Space covers the base mint only; the metadata write reallocates, so
        // rent is paid up front for both.
        let lamports = self
            .rpc
            .get_minimum_balance_for_rent_exemption(mint_len + metadata_len)
            .await?;

        Ok(vec![
            system_instruction::create_account(payer, mint, lamports, mint_len as u64, &program_id),
            metadata_pointer::instruction::initialize(&program_id, mint, Some(*payer), Some(*mint))
                .map_err(program_error)?,
            spl_token_2022::instruction::initialize_mint(&program_id, mint, payer, None, decimals)
                .map_err(program_error)?,
            spl_token_metadata_interface::instruction::initialize(
                &program_id,
                mint,
                payer,
                mint,
                payer,
                name.to_string(),
                symbol.to_string(),
                uri.to_string(),
            ),
        ])
    }
}

fn program_error(err: ProgramError) -> Error {
    Error::Internal(format!("Failed to build token instruction: {}", err))
}
