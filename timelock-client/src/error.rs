//! Error types for the timelock client and its HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;

/// Input rejected before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Unlock time {unlock_timestamp} is not in the future (now {now})")]
    UnlockTimeNotInFuture { unlock_timestamp: i64, now: i64 },

    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("Amount {input:?} has more than {decimals} decimal places")]
    TooManyDecimals { input: String, decimals: u8 },
}

/// Malformed vault account bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Account discriminator does not match Vault")]
    WrongDiscriminator,

    #[error("Account data truncated: needed {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("Invalid option tag {0} for mint")]
    InvalidOptionTag(u8),

    #[error("Malformed account data: {0}")]
    Malformed(String),
}

/// Failure reported by the RPC collaborator
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Preflight simulation failed: {0}")]
    Simulation(String),
}

/// Failure reported by the signer collaborator
#[derive(Debug, Clone, Error)]
pub enum SignerError {
    #[error("Signer declined: {0}")]
    Declined(String),

    #[error("Signer returned {actual} signatures for {expected} transactions")]
    SignatureCount { expected: usize, actual: usize },

    #[error("Signature does not verify against the fee payer")]
    InvalidSignature,

    #[error("No wallet connected")]
    NotConnected,
}

/// Caller-facing error taxonomy
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to broadcast transaction: {0}")]
    Broadcast(String),

    #[error("Transaction simulation failed: {0}")]
    Simulation(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Transaction expired: block height passed {last_valid_block_height}")]
    Expired { last_valid_block_height: u64 },

    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },

    #[error("A mutation for vault {vault} is already pending")]
    AlreadyPending { vault: Pubkey },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Failed to compile transaction message: {0}")]
    Compile(String),
}

impl ClientError {
    /// Network-level failures the caller may retry from a fresh draft
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Broadcast(_) | ClientError::Expired { .. } | ClientError::Rpc(_)
        )
    }

    /// Stable machine-readable code, one per taxonomy kind
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "VALIDATION_ERROR",
            ClientError::Broadcast(_) => "BROADCAST_ERROR",
            ClientError::Simulation(_) => "SIMULATION_ERROR",
            ClientError::Signing(_) => "SIGNING_ERROR",
            ClientError::Expired { .. } => "EXPIRED",
            ClientError::TransactionFailed { .. } => "TRANSACTION_FAILED",
            ClientError::AlreadyPending { .. } => "ALREADY_PENDING",
            ClientError::Rpc(_) => "RPC_ERROR",
            ClientError::Compile(_) => "COMPILE_ERROR",
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// HTTP service error types
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid public key: {0}")]
    InvalidPubkey(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub retryable: bool,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServiceError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ServiceError::InvalidPubkey(_) => (StatusCode::BAD_REQUEST, "INVALID_PUBKEY"),
            ServiceError::Client(err) => {
                let status = match err {
                    ClientError::Validation(_) | ClientError::Signing(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    ClientError::AlreadyPending { .. } => StatusCode::CONFLICT,
                    ClientError::Simulation(_) | ClientError::TransactionFailed { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    ClientError::Expired { .. } => StatusCode::GATEWAY_TIMEOUT,
                    ClientError::Broadcast(_) | ClientError::Rpc(_) => StatusCode::BAD_GATEWAY,
                    ClientError::Compile(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let retryable = matches!(&self, ServiceError::Client(err) if err.is_retryable());

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            retryable,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
