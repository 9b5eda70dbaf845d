pub mod address;
pub mod amount;
pub mod builder;
pub mod client;
pub mod deadline;
pub mod holdings;
pub mod metadata_source;
pub mod mock;
pub mod retry;
pub mod rpc;
pub mod signer;
pub mod submission;
pub mod types;

pub use address::{is_valid_address, parse_address};
pub use builder::{PendingTransaction, TransactionBuilder};
pub use client::SolanaClient;
pub use deadline::{with_deadline, DeadlineElapsed};
pub use holdings::HoldingsFetcher;
pub use metadata_source::{HttpMetadataSource, OffChainMetadataSource};
pub use retry::{retry_with_backoff, RetryConfig};
pub use rpc::{parse_commitment, Confirmation, NetworkRpc, SendOptions};
pub use signer::{KeypairSigner, SignerError, WalletSigner};
pub use submission::{
    FailureReason, ProgressLabels, SubmissionCoordinator, SubmissionOutcome, SubmissionState,
    SubmitOptions,
};
pub use types::*;
