//! Unsigned transaction endpoints
//!
//! Each handler validates its inputs, builds the instruction for the
//! requesting wallet and returns a recency-anchored transaction. The
//! wallet signs and broadcasts it; the service never holds keys.

use axum::{extract::State, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine};
use solana_sdk::pubkey::Pubkey;
use tracing::info;

use super::{parse_amount, parse_pubkey, AppState};
use crate::{
    client::PreparedTransaction,
    constants::TOKEN_PROGRAM_ID,
    error::ServiceError,
    instructions::VaultOperation,
    types::{
        InitializeSolLockRequest, InitializeSplLockRequest, TransactionResponse,
        WithdrawSolLockRequest, WithdrawSplLockRequest,
    },
};

type Result<T> = std::result::Result<T, ServiceError>;

/// Create transactions router
pub fn transactions_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/transactions/initialize-sol-lock",
            post(initialize_sol_lock),
        )
        .route(
            "/api/transactions/initialize-spl-lock",
            post(initialize_spl_lock),
        )
        .route("/api/transactions/withdraw-sol-lock", post(withdraw_sol_lock))
        .route("/api/transactions/withdraw-spl-lock", post(withdraw_spl_lock))
        .with_state(state)
}

fn token_program(value: Option<&str>) -> Result<Pubkey> {
    value.map_or(Ok(TOKEN_PROGRAM_ID), |program| {
        parse_pubkey("token_program", program)
    })
}

async fn prepare(
    state: &AppState,
    signer: &Pubkey,
    operation: VaultOperation,
) -> Result<Json<TransactionResponse>> {
    let PreparedTransaction {
        transaction,
        vault,
        last_valid_block_height,
    } = state.client.prepare_transaction(signer, &operation).await?;

    let bytes = bincode::serialize(&transaction)
        .map_err(|e| ServiceError::Internal(format!("Failed to serialize transaction: {e}")))?;

    info!(
        operation = operation.name(),
        signer = %signer,
        vault = %vault,
        size = bytes.len(),
        "Built unsigned transaction"
    );

    Ok(Json(TransactionResponse {
        transaction: STANDARD.encode(&bytes),
        vault: vault.to_string(),
        last_valid_block_height,
    }))
}

/// POST /api/transactions/initialize-sol-lock
async fn initialize_sol_lock(
    State(state): State<AppState>,
    Json(req): Json<InitializeSolLockRequest>,
) -> Result<Json<TransactionResponse>> {
    let signer = parse_pubkey("signer", &req.signer)?;
    let operation = VaultOperation::InitializeSolLock {
        amount: parse_amount(&req.amount)?,
        unlock_timestamp: req.unlock_timestamp,
    };

    prepare(&state, &signer, operation).await
}

/// POST /api/transactions/initialize-spl-lock
async fn initialize_spl_lock(
    State(state): State<AppState>,
    Json(req): Json<InitializeSplLockRequest>,
) -> Result<Json<TransactionResponse>> {
    let signer = parse_pubkey("signer", &req.signer)?;
    let operation = VaultOperation::InitializeSplLock {
        amount: parse_amount(&req.amount)?,
        unlock_timestamp: req.unlock_timestamp,
        mint: parse_pubkey("mint", &req.mint)?,
        token_program: token_program(req.token_program.as_deref())?,
    };

    prepare(&state, &signer, operation).await
}

/// POST /api/transactions/withdraw-sol-lock
async fn withdraw_sol_lock(
    State(state): State<AppState>,
    Json(req): Json<WithdrawSolLockRequest>,
) -> Result<Json<TransactionResponse>> {
    let signer = parse_pubkey("signer", &req.signer)?;
    let operation = VaultOperation::WithdrawSolLock {
        vault: parse_pubkey("vault", &req.vault)?,
    };

    prepare(&state, &signer, operation).await
}

/// POST /api/transactions/withdraw-spl-lock
async fn withdraw_spl_lock(
    State(state): State<AppState>,
    Json(req): Json<WithdrawSplLockRequest>,
) -> Result<Json<TransactionResponse>> {
    let signer = parse_pubkey("signer", &req.signer)?;
    let operation = VaultOperation::WithdrawSplLock {
        vault: parse_pubkey("vault", &req.vault)?,
        mint: parse_pubkey("mint", &req.mint)?,
        token_program: token_program(req.token_program.as_deref())?,
    };

    prepare(&state, &signer, operation).await
}
