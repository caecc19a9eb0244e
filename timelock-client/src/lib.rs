//! Timelock Client
//!
//! Client orchestration for the timelock wallet program: vault address
//! derivation, account decoding, lock/withdraw instruction building, and
//! transaction submission with per-vault single-flight and cache refresh.

pub mod client;
pub mod clock;
pub mod constants;
pub mod error;
pub mod instructions;
pub mod pda;
pub mod routes;
pub mod rpc;
pub mod services;
pub mod state;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

pub use client::{ClientConfig, PreparedTransaction, TimelockClient};
pub use clock::{Clock, SystemClock};
pub use error::{ClientError, DecodeError, Result, RpcError, SignerError, ValidationError};
pub use instructions::VaultOperation;
pub use pda::{associated_token_address, derive_vault_address};
pub use rpc::{KeypairSigner, RpcClient, SolanaRpc, TokenHolding, TransactionSigner};
pub use services::transaction::{build_unsigned_transaction, transaction_signature};
pub use state::{Vault, VaultKind};
pub use view::{
    format_amount, format_countdown, format_countdown_at, parse_ui_amount, partition,
    CountdownHandle, TokenView, VaultList, VaultView,
};
