//! Wallet token balances available for locking

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::info;

use super::{parse_pubkey, AppState};
use crate::{error::ServiceError, view::TokenView};

/// Create tokens router
pub fn tokens_router(state: AppState) -> Router {
    Router::new()
        .route("/api/tokens/{owner}", get(list_tokens))
        .with_state(state)
}

/// Non-zero SPL Token balances of an owner
///
/// GET /api/tokens/{owner}
async fn list_tokens(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Vec<TokenView>>, ServiceError> {
    let owner = parse_pubkey("owner", &owner)?;
    let tokens: Vec<TokenView> = state
        .client
        .list_user_tokens(&owner)
        .await?
        .iter()
        .map(TokenView::from)
        .collect();

    info!(owner = %owner, count = tokens.len(), "Listed token balances");

    Ok(Json(tokens))
}
