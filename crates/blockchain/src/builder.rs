use shared::{Error, Result};
use solana_sdk::{
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::sync::Arc;
use tracing::debug;

use crate::types::Checkpoint;

/// An assembled transaction waiting for the wallet's signature
///
/// Built fresh for each submission against a checkpoint fetched right before
/// building. Consumed by `SubmissionCoordinator::submit`.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    operations: Vec<Instruction>,
    fee_payer: Pubkey,
    checkpoint: Checkpoint,
    co_signers: Vec<Arc<Keypair>>,
}

impl PendingTransaction {
    pub fn operations(&self) -> &[Instruction] {
        &self.operations
    }

    pub fn fee_payer(&self) -> &Pubkey {
        &self.fee_payer
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Public keys of the extra keypairs that sign alongside the wallet
    pub fn co_signers(&self) -> Vec<Pubkey> {
        self.co_signers.iter().map(|k| k.pubkey()).collect()
    }

    /// Attach a keypair that must partially sign, such as a freshly generated mint
    pub fn with_co_signer(mut self, signer: Arc<Keypair>) -> Self {
        self.co_signers.push(signer);
        self
    }

    /// Compile the message against the checkpoint and apply co-signer signatures.
    ///
    /// The fee payer's signature slot is left empty for the wallet.
    pub fn to_transaction(&self) -> Result<Transaction> {
        let message = Message::new_with_blockhash(
            &self.operations,
            Some(&self.fee_payer),
            &self.checkpoint.blockhash,
        );
        let mut transaction = Transaction::new_unsigned(message);

        if !self.co_signers.is_empty() {
            let keypairs: Vec<&Keypair> = self.co_signers.iter().map(|k| k.as_ref()).collect();
            transaction
                .try_partial_sign(&keypairs[..], self.checkpoint.blockhash)
                .map_err(|e| Error::Internal(format!("Co-signer could not sign: {}", e)))?;
        }

        Ok(transaction)
    }
}

/// Assembles instructions into a `PendingTransaction`
///
/// Never touches the network and never reorders operations: programs rely on
/// account creation preceding initialization preceding metadata writes.
pub struct TransactionBuilder;

impl TransactionBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        operations: Vec<Instruction>,
        fee_payer: Pubkey,
        checkpoint: Checkpoint,
    ) -> PendingTransaction {
        debug!(
            "Building transaction with {} operation(s) for fee payer {}",
            operations.len(),
            fee_payer
        );

        PendingTransaction {
            operations,
            fee_payer,
            checkpoint,
            co_signers: Vec::new(),
        }
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{hash::Hash, signature::Signature, system_instruction};

    fn checkpoint() -> Checkpoint {
        Checkpoint {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 1_000,
        }
    }

    #[test]
    fn test_build_keeps_fields() {
        let payer = Pubkey::new_unique();
        let cp = checkpoint();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 5);

        let pending = TransactionBuilder::new().build(vec![ix.clone()], payer, cp);

        assert_eq!(pending.operations(), &[ix]);
        assert_eq!(pending.fee_payer(), &payer);
        assert_eq!(pending.checkpoint(), &cp);
        assert!(pending.co_signers().is_empty());
    }

    #[test]
    fn test_to_transaction_uses_checkpoint_blockhash() {
        let payer = Pubkey::new_unique();
        let cp = checkpoint();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 5);

        let tx = TransactionBuilder::default()
            .build(vec![ix], payer, cp)
            .to_transaction()
            .unwrap();

        assert_eq!(tx.message.recent_blockhash, cp.blockhash);
        assert_eq!(tx.message.account_keys[0], payer);
        assert_eq!(tx.signatures, vec![Signature::default()]);
    }

    #[test]
    fn test_co_signer_signs_but_fee_payer_slot_stays_empty() {
        let payer = Pubkey::new_unique();
        let mint = Arc::new(Keypair::new());
        let ix = system_instruction::create_account(&payer, &mint.pubkey(), 1_000, 82, &spl_token::id());

        let pending = TransactionBuilder::new()
            .build(vec![ix], payer, checkpoint())
            .with_co_signer(mint.clone());
        assert_eq!(pending.co_signers(), vec![mint.pubkey()]);

        let tx = pending.to_transaction().unwrap();
        let mint_index = tx
            .message
            .account_keys
            .iter()
            .position(|k| *k == mint.pubkey())
            .unwrap();

        assert_eq!(tx.signatures[0], Signature::default());
        assert_ne!(tx.signatures[mint_index], Signature::default());
        assert!(tx.signatures[mint_index].verify(mint.pubkey().as_ref(), &tx.message_data()));
    }

    #[test]
    fn test_foreign_co_signer_is_rejected() {
        let payer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 5);

        let result = TransactionBuilder::new()
            .build(vec![ix], payer, checkpoint())
            .with_co_signer(Arc::new(Keypair::new()))
            .to_transaction();

        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
