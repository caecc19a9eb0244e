//! Capability interfaces for the network and the wallet
//!
//! Core code depends only on these traits; concrete SDK clients live
//! behind them (see [`solana::SolanaRpc`]).

pub mod solana;

pub use solana::SolanaRpc;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};

use crate::error::{RpcError, SignerError};

/// Recent blockhash plus the last block height at which it is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyAnchor {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Server-side account filter for program scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    Memcmp { offset: usize, bytes: Vec<u8> },
}

/// Balance of one token account held by a wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHolding {
    pub account: Pubkey,
    pub mint: Pubkey,
    /// Base units
    pub amount: u64,
    pub decimals: u8,
}

/// Network view of a broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Not yet seen at the requested commitment
    Pending,
    Confirmed,
    /// Landed but the program returned an error
    Failed(String),
}

#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn get_latest_blockhash(&self) -> Result<RecencyAnchor, RpcError>;

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError>;

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, RpcError>;

    async fn get_signature_status(&self, signature: &Signature)
        -> Result<SignatureStatus, RpcError>;

    async fn get_block_height(&self) -> Result<u64, RpcError>;

    /// Every token account of `owner` under `token_program`, zero balances included
    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<TokenHolding>, RpcError>;
}

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Pubkey;

    /// One fee-payer signature per transaction, in order
    async fn sign_transactions(
        &self,
        transactions: &[VersionedTransaction],
    ) -> Result<Vec<Signature>, SignerError>;
}

/// Signs with a caller-provided local keypair
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transactions(
        &self,
        transactions: &[VersionedTransaction],
    ) -> Result<Vec<Signature>, SignerError> {
        Ok(transactions
            .iter()
            .map(|tx| self.keypair.sign_message(&tx.message.serialize()))
            .collect())
    }
}
