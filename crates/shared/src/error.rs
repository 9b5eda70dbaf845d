use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Request rejected by user")]
    UserRejected,

    #[error("Signing timed out")]
    SigningTimeout,

    /// Sent but not confirmed in time. The transaction may still land.
    #[error("Transaction sent but confirmation timed out: {signature}")]
    ConfirmationTimeout { signature: String },

    #[error("Transaction {signature} failed: {details}")]
    ExecutionError { signature: String, details: String },

    #[error("Transaction expired before confirmation: {signature}")]
    Expired { signature: String },

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Metadata upload failed: {0}")]
    MetadataUploadFailed(String),

    #[error("Network query failed: {0}")]
    NetworkQueryFailed(String),

    #[error("Solana RPC error: {0}")]
    SolanaRpc(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Operation already in progress: {0}")]
    OperationInProgress(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
