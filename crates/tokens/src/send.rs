use blockchain::{
    amount::{lamports_to_sol, to_raw_amount, SOL_DECIMALS},
    ProgressLabels, SubmissionOutcome, TokenHolding,
};
use rust_decimal::Decimal;
use shared::{Error, Result};
use solana_sdk::{
    commitment_config::CommitmentConfig, instruction::Instruction, pubkey::Pubkey,
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};
use tracing::{info, warn};

use crate::validation::ValidatedTransfer;
use crate::TokenService;

/// Lamports kept aside for the network fee when checking balances
pub const FEE_ESTIMATE_LAMPORTS: u64 = 10_000;

/// What is being sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferAsset {
    Native,
    Token(TokenHolding),
}

impl TransferAsset {
    pub fn decimals(&self) -> u8 {
        match self {
            TransferAsset::Native => SOL_DECIMALS,
            TransferAsset::Token(holding) => holding.decimals,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            TransferAsset::Native => "SOL",
            TransferAsset::Token(holding) => &holding.symbol,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub asset: TransferAsset,
    /// Recipient address as typed by the user
    pub recipient: String,
    /// Human-readable amount
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub recipient: Pubkey,
    pub amount: Decimal,
    pub outcome: SubmissionOutcome,
}

impl TokenService {
    /// Send SOL or a held token to another wallet.
    ///
    /// Input and balance checks run before anything is built. The transaction
    /// is simulated first and a reported program error aborts before signing.
    pub async fn send(&self, request: TransferRequest) -> Result<TransferReport> {
        let _guard = self.sending.begin()?;
        let sender = self.require_wallet()?;

        let transfer = match self.validator.validate(&sender, &request.recipient, request.amount) {
            Ok(transfer) => transfer,
            Err(e) => return self.reject(e),
        };

        // Amounts below one base unit round to zero
        let raw = match to_raw_amount(transfer.amount, request.asset.decimals()) {
            Some(raw) if raw > 0 => raw,
            _ => return self.reject(Error::InvalidInput("Invalid amount".to_string())),
        };

        let lamports = self.reported(self.rpc.get_balance(&sender).await, "Failed to fetch balance")?;
        if let Err(e) = check_funds(&request.asset, &transfer, raw, lamports) {
            return self.reject(e);
        }

        let checkpoint = self.reported(
            self.rpc.get_latest_checkpoint(CommitmentConfig::finalized()).await,
            "Failed to fetch recent blockhash",
        )?;

        let operations = match &request.asset {
            TransferAsset::Native => {
                vec![system_instruction::transfer(&sender, &transfer.recipient, raw)]
            }
            TransferAsset::Token(holding) => {
                self.token_operations(&sender, &transfer, holding, raw).await?
            }
        };

        let pending = self.transaction_builder.build(operations, sender, checkpoint);

        let compiled = self.reported(pending.to_transaction(), "Failed to prepare transaction")?;
        match self.rpc.simulate_transaction(&compiled).await {
            Ok(Some(err)) => {
                self.notifier.error(&format!("Simulation failed: {}", err));
                return Err(Error::SimulationFailed(err));
            }
            Ok(None) => {}
            Err(e) => warn!("Simulation unavailable, sending anyway: {}", e),
        }

        let labels = ProgressLabels {
            sending: "Signing transaction...".to_string(),
            confirming: "Processing transaction...".to_string(),
            success: format!(
                "Sent {} {} to {}",
                transfer.amount.normalize(),
                request.asset.symbol(),
                shorten(&transfer.recipient)
            ),
            failure_prefix: "Transaction failed: ".to_string(),
        };
        let outcome = self
            .coordinator
            .submit_with_labels(pending, &self.settings.submit, &labels)
            .await?;

        info!(
            "Transfer of {} {} to {} ended {:?}",
            transfer.amount,
            request.asset.symbol(),
            transfer.recipient,
            outcome.state()
        );
        Ok(TransferReport {
            recipient: transfer.recipient,
            amount: transfer.amount,
            outcome,
        })
    }

    /// Create the recipient's token account when missing, then transfer
    async fn token_operations(
        &self,
        sender: &Pubkey,
        transfer: &ValidatedTransfer,
        holding: &TokenHolding,
        raw: u64,
    ) -> Result<Vec<Instruction>> {
        let program_id = holding.program.program_id();
        let destination =
            get_associated_token_address_with_program_id(&transfer.recipient, &holding.mint, &program_id);

        let mut operations = Vec::with_capacity(2);
        let exists = self.reported(
            self.rpc.account_exists(&destination).await,
            "Failed to look up recipient token account",
        )?;
        if !exists {
            info!("Creating token account {} for recipient", destination);
            operations.push(create_associated_token_account_idempotent(
                sender,
                &transfer.recipient,
                &holding.mint,
                &program_id,
            ));
        }

        let transfer_checked = spl_token_2022::instruction::transfer_checked(
            &program_id,
            &holding.account,
            &holding.mint,
            &destination,
            sender,
            &[],
            raw,
            holding.decimals,
        )
        .map_err(|e| Error::Internal(format!("Failed to build transfer: {}", e)));
        operations.push(self.reported(transfer_checked, "Failed to prepare transaction")?);

        Ok(operations)
    }
}

/// `raw` is the amount in the asset's base units
fn check_funds(asset: &TransferAsset, transfer: &ValidatedTransfer, raw: u64, lamports: u64) -> Result<()> {
    let sol = lamports_to_sol(lamports);
    match asset {
        TransferAsset::Native => {
            if transfer.amount > sol {
                return Err(Error::InsufficientBalance(format!("Insufficient balance: {} SOL", sol.normalize())));
            }
            match raw.checked_add(FEE_ESTIMATE_LAMPORTS) {
                Some(needed) if needed <= lamports => Ok(()),
                _ => Err(Error::InsufficientBalance(
                    "Insufficient SOL balance for transfer plus fees".to_string(),
                )),
            }
        }
        TransferAsset::Token(holding) => {
            if transfer.amount > holding.balance {
                return Err(Error::InsufficientBalance(format!(
                    "Insufficient balance: {} {}",
                    holding.balance.normalize(),
                    holding.symbol
                )));
            }
            if lamports < FEE_ESTIMATE_LAMPORTS {
                return Err(Error::InsufficientBalance(
                    "Insufficient SOL for transaction fees".to_string(),
                ));
            }
            Ok(())
        }
    }
}

fn shorten(address: &Pubkey) -> String {
    let text = address.to_string();
    format!("{}...{}", &text[..4], &text[text.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockchain::ProgramVariant;
    use std::str::FromStr;

    fn lamports(amount: &str) -> u64 {
        to_raw_amount(Decimal::from_str(amount).unwrap(), SOL_DECIMALS).unwrap()
    }

    fn units(amount: &str) -> u64 {
        to_raw_amount(Decimal::from_str(amount).unwrap(), 6).unwrap()
    }

    fn transfer(amount: &str) -> ValidatedTransfer {
        ValidatedTransfer {
            recipient: Pubkey::new_unique(),
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    fn holding(balance: &str) -> TokenHolding {
        TokenHolding {
            mint: Pubkey::new_unique(),
            balance: Decimal::from_str(balance).unwrap(),
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            image: String::new(),
            program: ProgramVariant::Extended,
            account: Pubkey::new_unique(),
            decimals: 6,
        }
    }

    #[test]
    fn test_native_needs_amount_plus_fee() {
        let two_sol = 2_000_000_000;

        assert!(check_funds(&TransferAsset::Native, &transfer("1.5"), lamports("1.5"), two_sol).is_ok());
        assert_eq!(
            check_funds(&TransferAsset::Native, &transfer("3"), lamports("3"), two_sol).unwrap_err(),
            Error::InsufficientBalance("Insufficient balance: 2 SOL".to_string())
        );
        assert_eq!(
            check_funds(&TransferAsset::Native, &transfer("2"), lamports("2"), two_sol).unwrap_err(),
            Error::InsufficientBalance("Insufficient SOL balance for transfer plus fees".to_string())
        );
    }

    #[test]
    fn test_token_needs_balance_and_fee() {
        let asset = TransferAsset::Token(holding("10"));

        assert!(check_funds(&asset, &transfer("10"), units("10"), FEE_ESTIMATE_LAMPORTS).is_ok());
        assert_eq!(
            check_funds(&asset, &transfer("10.5"), units("10.5"), 1_000_000_000).unwrap_err(),
            Error::InsufficientBalance("Insufficient balance: 10 TST".to_string())
        );
        assert_eq!(
            check_funds(&asset, &transfer("1"), units("1"), 0).unwrap_err(),
            Error::InsufficientBalance("Insufficient SOL for transaction fees".to_string())
        );
    }

    #[test]
    fn test_shorten() {
        let address = Pubkey::new_unique();
        let text = address.to_string();
        let short = shorten(&address);

        assert!(short.starts_with(&text[..4]));
        assert!(short.ends_with(&text[text.len() - 4..]));
        assert_eq!(short.len(), 11);
    }
}
