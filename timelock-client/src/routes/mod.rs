//! API Routes

pub mod health;
pub mod tokens;
pub mod transactions;
pub mod vaults;

pub use health::health_router;
pub use tokens::tokens_router;
pub use transactions::transactions_router;
pub use vaults::vaults_router;

use std::sync::Arc;

use axum::Router;
use solana_sdk::pubkey::Pubkey;

use crate::{client::TimelockClient, error::ServiceError, types::Config};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: Arc<TimelockClient>,
}

/// All service routes, without auth, CORS or tracing layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health_router(state.clone()))
        .merge(vaults_router(state.clone()))
        .merge(tokens_router(state.clone()))
        .merge(transactions_router(state))
}

/// Parse a base58 pubkey from a named request field
pub fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, ServiceError> {
    value
        .parse()
        .map_err(|_| ServiceError::InvalidPubkey(format!("{field}: {value}")))
}

/// Parse a u64 amount sent as a decimal string
pub fn parse_amount(value: &str) -> Result<u64, ServiceError> {
    value
        .parse()
        .map_err(|e| ServiceError::BadRequest(format!("Invalid amount: {e}")))
}
