//! Scripted collaborators for unit tests

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};
use tokio::sync::Notify;

use crate::{
    clock::Clock,
    error::{RpcError, SignerError},
    rpc::{
        AccountFilter, RecencyAnchor, RpcClient, SignatureStatus, TokenHolding, TransactionSigner,
    },
    state::Vault,
};

pub const LAST_VALID_BLOCK_HEIGHT: u64 = 100;

#[derive(Default)]
pub struct MockRpc {
    pub accounts: Mutex<Vec<(Pubkey, Vec<u8>)>>,
    pub scans: AtomicUsize,
    pub last_filters: Mutex<Vec<AccountFilter>>,
    pub anchors: AtomicUsize,
    pub sent: Mutex<Vec<VersionedTransaction>>,
    pub send_error: Mutex<Option<RpcError>>,
    pub scan_error: Mutex<Option<RpcError>>,
    /// Statuses returned in order; `Confirmed` once exhausted
    pub statuses: Mutex<VecDeque<SignatureStatus>>,
    pub block_height: AtomicU64,
    /// When set, `send_transaction` waits for a permit before returning
    pub send_gate: Option<Arc<Notify>>,
    pub tokens: Mutex<Vec<TokenHolding>>,
    pub token_programs: Mutex<Vec<Pubkey>>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vaults(vaults: &[Vault]) -> Self {
        let rpc = Self::new();
        rpc.set_vaults(vaults);
        rpc
    }

    pub fn set_vaults(&self, vaults: &[Vault]) {
        *self.accounts.lock().unwrap() = vaults.iter().map(|v| (v.address, v.encode().unwrap())).collect();
    }

    pub fn push_raw_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().push((address, data));
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.accounts.lock().unwrap().retain(|(key, _)| key != address);
    }

    pub fn script_statuses(&self, statuses: Vec<SignatureStatus>) {
        *self.statuses.lock().unwrap() = statuses.into();
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

fn matches_filters(data: &[u8], filters: &[AccountFilter]) -> bool {
    filters.iter().all(|filter| match filter {
        AccountFilter::Memcmp { offset, bytes } => data
            .get(*offset..offset + bytes.len())
            .is_some_and(|slice| slice == bytes.as_slice()),
    })
}

#[async_trait]
impl RpcClient for MockRpc {
    async fn get_latest_blockhash(&self) -> Result<RecencyAnchor, RpcError> {
        self.anchors.fetch_add(1, Ordering::SeqCst);
        Ok(RecencyAnchor {
            blockhash: Hash::new_from_array([3u8; 32]),
            last_valid_block_height: LAST_VALID_BLOCK_HEIGHT,
        })
    }

    async fn get_program_accounts(
        &self,
        _program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        *self.last_filters.lock().unwrap() = filters.to_vec();
        if let Some(err) = self.scan_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, data)| matches_filters(data, filters))
            .cloned()
            .collect())
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, RpcError> {
        if let Some(gate) = &self.send_gate {
            gate.notified().await;
        }
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn get_signature_status(
        &self,
        _signature: &Signature,
    ) -> Result<SignatureStatus, RpcError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SignatureStatus::Confirmed))
    }

    async fn get_block_height(&self) -> Result<u64, RpcError> {
        Ok(self.block_height.load(Ordering::SeqCst))
    }

    async fn get_token_accounts_by_owner(
        &self,
        _owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<TokenHolding>, RpcError> {
        self.token_programs.lock().unwrap().push(*token_program);
        if let Some(err) = self.scan_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.tokens.lock().unwrap().clone())
    }
}

pub struct DecliningSigner {
    pub address: Pubkey,
}

#[async_trait]
impl TransactionSigner for DecliningSigner {
    fn address(&self) -> Pubkey {
        self.address
    }

    async fn sign_transactions(
        &self,
        _transactions: &[VersionedTransaction],
    ) -> Result<Vec<Signature>, SignerError> {
        Err(SignerError::Declined("user rejected the request".to_string()))
    }
}

/// Returns a signature that does not verify against the message
pub struct ForgingSigner {
    pub address: Pubkey,
}

#[async_trait]
impl TransactionSigner for ForgingSigner {
    fn address(&self) -> Pubkey {
        self.address
    }

    async fn sign_transactions(
        &self,
        transactions: &[VersionedTransaction],
    ) -> Result<Vec<Signature>, SignerError> {
        Ok(vec![Signature::from([9u8; 64]); transactions.len()])
    }
}

pub struct ManualClock(pub AtomicI64);

impl ManualClock {
    pub fn at(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn unix_timestamp(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn keypair_signer() -> crate::rpc::KeypairSigner {
    crate::rpc::KeypairSigner::new(Keypair::new())
}
