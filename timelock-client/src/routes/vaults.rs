//! Vault listing and address derivation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use super::{parse_amount, parse_pubkey, AppState};
use crate::{
    error::ServiceError,
    types::{DeriveVaultRequest, DeriveVaultResponse},
    view::VaultList,
};

/// Create vaults router
pub fn vaults_router(state: AppState) -> Router {
    Router::new()
        .route("/api/vaults/derive", post(derive_vault))
        .route("/api/vaults/{owner}", get(list_vaults))
        .route("/api/vaults/{owner}/invalidate", post(invalidate))
        .with_state(state)
}

/// List an owner's vaults split into locked and unlocked
///
/// GET /api/vaults/{owner}
async fn list_vaults(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<VaultList>, ServiceError> {
    let owner = parse_pubkey("owner", &owner)?;
    let list = state.client.list_vaults(Some(&owner)).await?;

    info!(
        owner = %owner,
        locked = list.locked.len(),
        unlocked = list.unlocked.len(),
        "Listed vaults"
    );

    Ok(Json(list))
}

/// POST /api/vaults/derive
async fn derive_vault(
    State(state): State<AppState>,
    Json(req): Json<DeriveVaultRequest>,
) -> Result<Json<DeriveVaultResponse>, ServiceError> {
    let owner = parse_pubkey("owner", &req.owner)?;
    let mint = req
        .mint
        .as_deref()
        .map(|mint| parse_pubkey("mint", mint))
        .transpose()?;
    let amount = parse_amount(&req.amount)?;

    let (vault, bump) = state
        .client
        .derive_vault_address(&owner, mint, amount, req.unlock_timestamp);

    Ok(Json(DeriveVaultResponse {
        vault: vault.to_string(),
        bump,
    }))
}

/// Drop the cached listing after a wallet-side confirmation
///
/// POST /api/vaults/{owner}/invalidate
async fn invalidate(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let owner = parse_pubkey("owner", &owner)?;
    state.client.invalidate(&owner);
    Ok(StatusCode::NO_CONTENT)
}
