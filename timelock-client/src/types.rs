//! Request and response types for the timelock service

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::{client::ClientConfig, constants::DEFAULT_PROGRAM_ID};

/// Request for a vault address
#[derive(Debug, Deserialize)]
pub struct DeriveVaultRequest {
    /// Owner wallet (base58)
    pub owner: String,

    /// Token mint (base58); omitted for native SOL vaults
    #[serde(default)]
    pub mint: Option<String>,

    /// Lock amount in base units (as string to handle u64)
    pub amount: String,

    /// Unix timestamp at which the vault unlocks
    pub unlock_timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct DeriveVaultResponse {
    pub vault: String,
    pub bump: u8,
}

/// Request for an unsigned `initialize_sol_lock` transaction
#[derive(Debug, Deserialize)]
pub struct InitializeSolLockRequest {
    /// Wallet that signs and pays (base58)
    pub signer: String,
    pub amount: String,
    pub unlock_timestamp: i64,
}

/// Request for an unsigned `initialize_spl_lock` transaction
#[derive(Debug, Deserialize)]
pub struct InitializeSplLockRequest {
    pub signer: String,
    pub amount: String,
    pub unlock_timestamp: i64,
    pub mint: String,

    /// Token program owning the mint; classic SPL Token when omitted
    #[serde(default)]
    pub token_program: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawSolLockRequest {
    pub signer: String,
    pub vault: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawSplLockRequest {
    pub signer: String,
    pub vault: String,
    pub mint: String,
    #[serde(default)]
    pub token_program: Option<String>,
}

/// Unsigned transaction for the caller's wallet to sign and send
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Bincode-serialized v0 transaction, base64 encoded
    pub transaction: String,

    /// Vault created or closed by the transaction
    pub vault: String,

    /// The transaction must land at or below this block height
    pub last_valid_block_height: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub program_id: String,
    pub timestamp: i64,
}

/// Configuration for the service
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,

    /// API keys for authentication
    pub api_keys: Vec<String>,

    /// Solana JSON-RPC endpoint
    pub rpc_url: String,

    /// Deployed timelock program
    pub program_id: Pubkey,

    /// Delay between confirmation polls
    pub confirm_poll_interval: Duration,

    /// Confirmation polls before a submission is reported expired
    pub confirm_max_polls: u32,
}

impl Default for Config {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            port: 3001,
            cors_origins: vec!["http://localhost:3000".to_string()],
            api_keys: vec![],
            rpc_url: "https://api.devnet.solana.com".to_string(),
            program_id: client.program_id,
            confirm_poll_interval: client.poll_interval,
            confirm_max_polls: client.max_polls,
        }
    }
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|s| list(&s))
            .unwrap_or(defaults.cors_origins);

        let api_keys = lookup("API_KEYS").map(|s| list(&s)).unwrap_or_default();

        let rpc_url = lookup("SOLANA_RPC_URL").unwrap_or(defaults.rpc_url);

        let program_id = match lookup("TIMELOCK_PROGRAM_ID") {
            Some(id) => id
                .trim()
                .parse::<Pubkey>()
                .with_context(|| format!("TIMELOCK_PROGRAM_ID is not a valid pubkey: {id}"))?,
            None => DEFAULT_PROGRAM_ID,
        };

        let confirm_poll_interval = lookup("CONFIRM_POLL_INTERVAL_MS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.confirm_poll_interval);

        // at least one status check per submission
        let confirm_max_polls = lookup("CONFIRM_MAX_POLLS")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.confirm_max_polls)
            .max(1);

        Ok(Self {
            port,
            cors_origins,
            api_keys,
            rpc_url,
            program_id,
            confirm_poll_interval,
            confirm_max_polls,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            program_id: self.program_id,
            poll_interval: self.confirm_poll_interval,
            max_polls: self.confirm_max_polls,
        }
    }
}
