//! Transaction submission and confirmation.
//!
//! ```text
//! Building -> Signing -> Sent -> Confirming -> { Confirmed | Failed | TimedOut | Expired }
//! ```
//!
//! Submissions are non-idempotent and cost fees, so an ambiguous outcome is
//! reported as `TimedOut` with whatever signature is known and is never
//! resubmitted here. Retrying is left to an explicit user action.

use notification::{NotificationSink, ToastId};
use shared::{Config, Error, Result};
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::builder::PendingTransaction;
use crate::deadline::with_deadline;
use crate::rpc::{parse_commitment, Confirmation, NetworkRpc, SendOptions};
use crate::signer::{SignerError, WalletSigner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Building,
    Signing,
    Sent,
    Confirming,
    Confirmed,
    Failed,
    TimedOut,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    UserRejected,
    SigningTimeout,
    SendFailed(String),
    /// Network-reported program error, serialized verbatim
    ExecutionError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Confirmed {
        signature: Signature,
    },
    Failed {
        reason: FailureReason,
        signature: Option<Signature>,
    },
    /// Sent (or possibly sent) but unconfirmed. The transaction may still land.
    TimedOut {
        signature: Option<Signature>,
    },
    Expired {
        signature: Signature,
    },
}

impl SubmissionOutcome {
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            SubmissionOutcome::Confirmed { signature } | SubmissionOutcome::Expired { signature } => {
                Some(signature)
            }
            SubmissionOutcome::Failed { signature, .. } | SubmissionOutcome::TimedOut { signature } => {
                signature.as_ref()
            }
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, SubmissionOutcome::Confirmed { .. })
    }

    pub fn state(&self) -> SubmissionState {
        match self {
            SubmissionOutcome::Confirmed { .. } => SubmissionState::Confirmed,
            SubmissionOutcome::Failed { .. } => SubmissionState::Failed,
            SubmissionOutcome::TimedOut { .. } => SubmissionState::TimedOut,
            SubmissionOutcome::Expired { .. } => SubmissionState::Expired,
        }
    }

    /// Collapse into the shared error taxonomy, keeping the signature
    pub fn into_result(self) -> Result<Signature> {
        match self {
            SubmissionOutcome::Confirmed { signature } => Ok(signature),
            SubmissionOutcome::Failed { reason, signature } => Err(match reason {
                FailureReason::UserRejected => Error::UserRejected,
                FailureReason::SigningTimeout => Error::SigningTimeout,
                FailureReason::SendFailed(msg) => Error::SolanaRpc(msg),
                FailureReason::ExecutionError(details) => Error::ExecutionError {
                    signature: signature.map(|s| s.to_string()).unwrap_or_default(),
                    details,
                },
            }),
            SubmissionOutcome::TimedOut { signature } => Err(Error::ConfirmationTimeout {
                signature: signature
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
            SubmissionOutcome::Expired { signature } => Err(Error::Expired {
                signature: signature.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub confirm_timeout: Duration,
    /// Bound on the wallet signing and broadcasting.
    ///
    /// A wallet that never answers is cut off by this bound alone and ends as
    /// `TimedOut { signature: None }`; `confirm_timeout` only starts once a
    /// signature exists. Both default to 60 s.
    pub sign_timeout: Duration,
    pub commitment: CommitmentConfig,
    pub skip_preflight: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            confirm_timeout: Duration::from_millis(60_000),
            sign_timeout: Duration::from_millis(60_000),
            commitment: CommitmentConfig::confirmed(),
            skip_preflight: false,
        }
    }
}

impl SubmitOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            confirm_timeout: Duration::from_millis(config.submission.confirm_timeout_ms),
            sign_timeout: Duration::from_millis(config.submission.sign_timeout_ms),
            commitment: parse_commitment(&config.solana.commitment)?,
            skip_preflight: false,
        })
    }
}

/// Toast texts for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLabels {
    pub sending: String,
    pub confirming: String,
    pub success: String,
    /// Prefix for send and execution failures
    pub failure_prefix: String,
}

impl Default for ProgressLabels {
    fn default() -> Self {
        Self {
            sending: "Sending transaction...".to_string(),
            confirming: "Confirming transaction...".to_string(),
            success: "Transaction confirmed".to_string(),
            failure_prefix: "Transaction failed: ".to_string(),
        }
    }
}

impl ProgressLabels {
    pub fn with_success(mut self, success: impl Into<String>) -> Self {
        self.success = success.into();
        self
    }
}

pub struct SubmissionCoordinator {
    signer: Arc<dyn WalletSigner>,
    rpc: Arc<dyn NetworkRpc>,
    notifier: Arc<dyn NotificationSink>,
}

impl SubmissionCoordinator {
    pub fn new(
        signer: Arc<dyn WalletSigner>,
        rpc: Arc<dyn NetworkRpc>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            signer,
            rpc,
            notifier,
        }
    }

    pub async fn submit(
        &self,
        transaction: PendingTransaction,
        options: &SubmitOptions,
    ) -> Result<SubmissionOutcome> {
        self.submit_with_labels(transaction, options, &ProgressLabels::default())
            .await
    }

    /// Sign, send and confirm `transaction`, driving one loading toast and
    /// exactly one terminal toast.
    ///
    /// Returns `Err(NotConnected)` when no wallet is connected; every other
    /// result is a `SubmissionOutcome`.
    pub async fn submit_with_labels(
        &self,
        transaction: PendingTransaction,
        options: &SubmitOptions,
        labels: &ProgressLabels,
    ) -> Result<SubmissionOutcome> {
        if self.signer.public_key().is_none() {
            self.notifier.error("Wallet not connected");
            return Err(Error::NotConnected);
        }

        let checkpoint = *transaction.checkpoint();
        let toast = self.notifier.loading(&labels.sending);
        debug!(
            "Submission {:?}: {} operation(s)",
            SubmissionState::Signing,
            transaction.operations().len()
        );

        let send_options = SendOptions {
            skip_preflight: options.skip_preflight,
            preflight_commitment: options.commitment,
        };
        let sent = with_deadline(
            "wallet send_transaction",
            options.sign_timeout,
            self.signer
                .send_transaction(&transaction, self.rpc.as_ref(), &send_options),
        )
        .await;

        let signature = match sent {
            Ok(Ok(signature)) => signature,
            Ok(Err(SignerError::NotConnected)) => {
                self.notifier.dismiss(toast);
                self.notifier.error("Wallet not connected");
                return Err(Error::NotConnected);
            }
            Ok(Err(err)) => {
                let reason = match err {
                    SignerError::UserRejected => FailureReason::UserRejected,
                    SignerError::Timeout => FailureReason::SigningTimeout,
                    other => FailureReason::SendFailed(other.to_string()),
                };
                return Ok(self.finish(
                    toast,
                    SubmissionOutcome::Failed {
                        reason,
                        signature: None,
                    },
                    labels,
                ));
            }
            // The wallet may already have broadcast
            Err(_) => {
                return Ok(self.finish(toast, SubmissionOutcome::TimedOut { signature: None }, labels));
            }
        };

        info!("Transaction sent: {}", signature);
        debug!("Submission {:?}: {}", SubmissionState::Confirming, signature);
        self.notifier.update_loading(toast, &labels.confirming);

        let confirmation = with_deadline(
            "confirm_transaction",
            options.confirm_timeout,
            self.rpc
                .confirm_transaction(&signature, &checkpoint, options.commitment),
        )
        .await;

        let outcome = match confirmation {
            Ok(Ok(Confirmation::Included { err: None })) => SubmissionOutcome::Confirmed { signature },
            Ok(Ok(Confirmation::Included { err: Some(details) })) => SubmissionOutcome::Failed {
                reason: FailureReason::ExecutionError(details.to_string()),
                signature: Some(signature),
            },
            Ok(Ok(Confirmation::Expired)) => SubmissionOutcome::Expired { signature },
            Ok(Err(e)) => {
                warn!("Confirmation status unknown for {}: {}", signature, e);
                SubmissionOutcome::TimedOut {
                    signature: Some(signature),
                }
            }
            Err(_) => SubmissionOutcome::TimedOut {
                signature: Some(signature),
            },
        };

        Ok(self.finish(toast, outcome, labels))
    }

    fn finish(&self, toast: ToastId, outcome: SubmissionOutcome, labels: &ProgressLabels) -> SubmissionOutcome {
        self.notifier.dismiss(toast);

        match &outcome {
            SubmissionOutcome::Confirmed { signature } => {
                info!("Transaction confirmed: {}", signature);
                self.notifier.success(&labels.success);
            }
            SubmissionOutcome::Failed { reason, signature } => {
                warn!("Transaction failed ({:?}): {:?}", signature, reason);
                let message = match reason {
                    FailureReason::UserRejected => "Transaction rejected by user".to_string(),
                    FailureReason::SigningTimeout => {
                        "Transaction signing timed out. Please try again.".to_string()
                    }
                    FailureReason::SendFailed(msg) => format!("{}{}", labels.failure_prefix, msg),
                    FailureReason::ExecutionError(details) => {
                        format!("{}{}", labels.failure_prefix, details)
                    }
                };
                self.notifier.error(&message);
            }
            SubmissionOutcome::TimedOut {
                signature: Some(signature),
            } => {
                warn!("Confirmation timed out for {}", signature);
                self.notifier.info(&format!(
                    "Transaction sent but confirmation timed out. Signature: {}",
                    signature
                ));
            }
            SubmissionOutcome::TimedOut { signature: None } => {
                warn!("Wallet did not answer before the signing deadline");
                self.notifier.info(
                    "The wallet did not respond in time. Check its activity before trying again.",
                );
            }
            SubmissionOutcome::Expired { signature } => {
                warn!("Transaction {} expired before confirmation", signature);
                self.notifier.error(&format!(
                    "Transaction expired before confirmation. Signature: {}",
                    signature
                ));
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_signature_and_state() {
        let sig = Signature::new_unique();

        let confirmed = SubmissionOutcome::Confirmed { signature: sig };
        assert_eq!(confirmed.signature(), Some(&sig));
        assert!(confirmed.is_confirmed());
        assert_eq!(confirmed.state(), SubmissionState::Confirmed);

        let hung = SubmissionOutcome::TimedOut { signature: None };
        assert_eq!(hung.signature(), None);
        assert_eq!(hung.state(), SubmissionState::TimedOut);
    }

    #[test]
    fn test_into_result_keeps_signature() {
        let sig = Signature::new_unique();

        assert_eq!(
            SubmissionOutcome::TimedOut { signature: Some(sig) }.into_result(),
            Err(Error::ConfirmationTimeout {
                signature: sig.to_string()
            })
        );
        assert_eq!(
            SubmissionOutcome::Failed {
                reason: FailureReason::ExecutionError("{\"InstructionError\":[0,\"Custom\"]}".to_string()),
                signature: Some(sig),
            }
            .into_result(),
            Err(Error::ExecutionError {
                signature: sig.to_string(),
                details: "{\"InstructionError\":[0,\"Custom\"]}".to_string(),
            })
        );
        assert_eq!(
            SubmissionOutcome::Failed {
                reason: FailureReason::UserRejected,
                signature: None
            }
            .into_result(),
            Err(Error::UserRejected)
        );
    }

    #[test]
    fn test_default_options() {
        let options = SubmitOptions::default();
        assert_eq!(options.confirm_timeout, Duration::from_secs(60));
        assert_eq!(options.sign_timeout, Duration::from_secs(60));
        assert_eq!(options.commitment, CommitmentConfig::confirmed());
        assert!(!options.skip_preflight);
    }
}
