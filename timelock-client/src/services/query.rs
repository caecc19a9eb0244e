//! Owner-scoped vault scans with a per-owner cache

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::{
    constants::{VAULT_DISCRIMINATOR, VAULT_OWNER_OFFSET},
    error::{ClientError, Result},
    rpc::{AccountFilter, RpcClient},
    state::Vault,
};

/// Outcome of a fetch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    /// No owner connected yet; nothing was requested
    Disabled,
    Ready(Arc<Vec<Vault>>),
}

/// Owners kept before the least recently used entry is evicted
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

struct CacheEntry {
    vaults: Arc<Vec<Vault>>,
    last_used: u64,
}

/// Scans in progress for one owner. Exists only while `fetches > 0`.
#[derive(Default)]
struct InFlight {
    fetches: usize,
    /// Bumped on invalidation so an in-flight scan cannot repopulate stale data
    generation: u64,
}

struct Cache {
    capacity: usize,
    entries: HashMap<Pubkey, CacheEntry>,
    in_flight: HashMap<Pubkey, InFlight>,
    tick: u64,
}

impl Cache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            tick: 0,
        }
    }

    fn get(&mut self, owner: &Pubkey) -> Option<Arc<Vec<Vault>>> {
        self.tick += 1;
        let entry = self.entries.get_mut(owner)?;
        entry.last_used = self.tick;
        Some(entry.vaults.clone())
    }

    fn insert(&mut self, owner: Pubkey, vaults: Arc<Vec<Vault>>) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&owner) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
                debug!(owner = %oldest, "Evicted least recently used vault cache entry");
            }
        }
        self.tick += 1;
        self.entries.insert(
            owner,
            CacheEntry {
                vaults,
                last_used: self.tick,
            },
        );
    }

    /// Register a scan and return the generation it must match to publish
    fn begin_fetch(&mut self, owner: Pubkey) -> u64 {
        let flight = self.in_flight.entry(owner).or_default();
        flight.fetches += 1;
        flight.generation
    }

    fn end_fetch(&mut self, owner: &Pubkey) {
        if let Some(flight) = self.in_flight.get_mut(owner) {
            flight.fetches -= 1;
            if flight.fetches == 0 {
                self.in_flight.remove(owner);
            }
        }
    }

    fn generation(&self, owner: &Pubkey) -> u64 {
        self.in_flight
            .get(owner)
            .map(|flight| flight.generation)
            .unwrap_or_default()
    }
}

/// Ends a scan registration even when the fetch future is dropped mid-flight
struct FetchGuard<'a> {
    cache: &'a Mutex<Cache>,
    owner: Pubkey,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .end_fetch(&self.owner);
    }
}

pub struct VaultQueryService {
    rpc: Arc<dyn RpcClient>,
    program_id: Pubkey,
    cache: Mutex<Cache>,
}

/// Discriminator at offset 0, owner at offset 8
pub fn owner_filters(owner: &Pubkey) -> Vec<AccountFilter> {
    vec![
        AccountFilter::Memcmp {
            offset: 0,
            bytes: VAULT_DISCRIMINATOR.to_vec(),
        },
        AccountFilter::Memcmp {
            offset: VAULT_OWNER_OFFSET,
            bytes: owner.to_bytes().to_vec(),
        },
    ]
}

/// Decode scan results, dropping anything that is not a well-formed vault
pub fn decode_accounts(accounts: Vec<(Pubkey, Vec<u8>)>) -> Vec<Vault> {
    accounts
        .into_iter()
        .filter_map(|(address, data)| match Vault::decode(address, &data) {
            Ok(vault) => Some(vault),
            Err(err) => {
                warn!(account = %address, error = %err, "Skipping undecodable account");
                None
            }
        })
        .collect()
}

impl VaultQueryService {
    pub fn new(rpc: Arc<dyn RpcClient>, program_id: Pubkey) -> Self {
        Self::with_capacity(rpc, program_id, DEFAULT_CACHE_CAPACITY)
    }

    /// Keep at most `capacity` owners cached (at least one)
    pub fn with_capacity(rpc: Arc<dyn RpcClient>, program_id: Pubkey, capacity: usize) -> Self {
        Self {
            rpc,
            program_id,
            cache: Mutex::new(Cache::new(capacity)),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached vaults for `owner`, scanning the program on a miss
    pub async fn fetch(&self, owner: Option<&Pubkey>) -> Result<QueryState> {
        let Some(owner) = owner else {
            return Ok(QueryState::Disabled);
        };

        let generation = {
            let mut cache = self.cache();
            if let Some(vaults) = cache.get(owner) {
                debug!(owner = %owner, count = vaults.len(), "Serving cached vaults");
                return Ok(QueryState::Ready(vaults));
            }
            cache.begin_fetch(*owner)
        };
        let _flight = FetchGuard {
            cache: &self.cache,
            owner: *owner,
        };

        let accounts = self
            .rpc
            .get_program_accounts(&self.program_id, &owner_filters(owner))
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))?;
        let scanned = accounts.len();
        let vaults = Arc::new(decode_accounts(accounts));

        debug!(owner = %owner, scanned, decoded = vaults.len(), "Fetched vaults");

        let mut cache = self.cache();
        if cache.generation(owner) == generation {
            cache.insert(*owner, vaults.clone());
        }
        drop(cache);

        Ok(QueryState::Ready(vaults))
    }

    /// Drop the cached entry for `owner` only
    pub fn invalidate(&self, owner: &Pubkey) {
        let mut cache = self.cache();
        cache.entries.remove(owner);
        if let Some(flight) = cache.in_flight.get_mut(owner) {
            flight.generation += 1;
        }
        debug!(owner = %owner, "Invalidated vault cache");
    }

    pub fn is_cached(&self, owner: &Pubkey) -> bool {
        self.cache().entries.contains_key(owner)
    }

    pub fn cached_len(&self) -> usize {
        self.cache().entries.len()
    }

    /// Owners with a scan currently running
    pub fn in_flight_len(&self) -> usize {
        self.cache().in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::VaultKind, testing::MockRpc};

    fn vault_for(owner: Pubkey, unlock_timestamp: i64) -> Vault {
        Vault {
            address: Pubkey::new_unique(),
            owner,
            kind: VaultKind::Native,
            amount: 1_000,
            unlock_timestamp,
            bump: 255,
        }
    }

    #[tokio::test]
    async fn test_disabled_without_owner() {
        let rpc = Arc::new(MockRpc::new());
        let service = VaultQueryService::new(rpc.clone(), Pubkey::new_unique());

        let state = service.fetch(None).await.unwrap();

        assert_eq!(state, QueryState::Disabled);
        assert_eq!(rpc.scan_count(), 0);
    }

    #[tokio::test]
    async fn test_scan_uses_discriminator_and_owner_filters() {
        let owner = Pubkey::new_unique();
        let rpc = Arc::new(MockRpc::with_vaults(&[vault_for(owner, 10)]));
        let service = VaultQueryService::new(rpc.clone(), Pubkey::new_unique());

        service.fetch(Some(&owner)).await.unwrap();

        assert_eq!(*rpc.last_filters.lock().unwrap(), owner_filters(&owner));
        assert_eq!(
            owner_filters(&owner)[1],
            AccountFilter::Memcmp {
                offset: 8,
                bytes: owner.to_bytes().to_vec()
            }
        );
    }

    #[tokio::test]
    async fn test_only_owner_vaults_returned() {
        let owner = Pubkey::new_unique();
        let mine = vault_for(owner, 10);
        let theirs = vault_for(Pubkey::new_unique(), 10);
        let rpc = Arc::new(MockRpc::with_vaults(&[mine.clone(), theirs]));
        let service = VaultQueryService::new(rpc, Pubkey::new_unique());

        let QueryState::Ready(vaults) = service.fetch(Some(&owner)).await.unwrap() else {
            panic!("expected ready state");
        };

        assert_eq!(*vaults, vec![mine]);
    }

    #[test]
    fn test_decode_failures_are_dropped() {
        let good = vault_for(Pubkey::new_unique(), 10);
        let mut truncated = good.encode().unwrap();
        truncated.truncate(20);

        let vaults = decode_accounts(vec![
            (good.address, good.encode().unwrap()),
            (Pubkey::new_unique(), truncated),
            (Pubkey::new_unique(), vec![0u8; 90]),
        ]);

        assert_eq!(vaults, vec![good]);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_rpc() {
        let owner = Pubkey::new_unique();
        let rpc = Arc::new(MockRpc::with_vaults(&[vault_for(owner, 10)]));
        let service = VaultQueryService::new(rpc.clone(), Pubkey::new_unique());

        service.fetch(Some(&owner)).await.unwrap();
        service.fetch(Some(&owner)).await.unwrap();

        assert_eq!(rpc.scan_count(), 1);
        assert!(service.is_cached(&owner));
    }

    #[tokio::test]
    async fn test_invalidate_is_scoped_to_owner() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let rpc = Arc::new(MockRpc::with_vaults(&[vault_for(alice, 1), vault_for(bob, 2)]));
        let service = VaultQueryService::new(rpc.clone(), Pubkey::new_unique());

        service.fetch(Some(&alice)).await.unwrap();
        service.fetch(Some(&bob)).await.unwrap();
        service.invalidate(&alice);

        assert!(!service.is_cached(&alice));
        assert!(service.is_cached(&bob));

        service.fetch(Some(&alice)).await.unwrap();
        assert_eq!(rpc.scan_count(), 3);
    }

    #[tokio::test]
    async fn test_foreign_and_malformed_accounts_skipped_on_fetch() {
        let owner = Pubkey::new_unique();
        let good = vault_for(owner, 10);
        let rpc = Arc::new(MockRpc::with_vaults(&[good.clone()]));

        let mut foreign = good.encode().unwrap();
        foreign[..8].copy_from_slice(&[0xEE; 8]);
        rpc.push_raw_account(Pubkey::new_unique(), foreign);

        let mut bad_tag = good.encode().unwrap();
        bad_tag[40] = 7;
        rpc.push_raw_account(Pubkey::new_unique(), bad_tag);

        let service = VaultQueryService::new(rpc, Pubkey::new_unique());

        let QueryState::Ready(vaults) = service.fetch(Some(&owner)).await.unwrap() else {
            panic!("expected ready state");
        };

        assert_eq!(*vaults, vec![good]);
    }

    #[tokio::test]
    async fn test_cache_is_bounded_and_evicts_least_recent() {
        let owners: Vec<Pubkey> = (0..5).map(|_| Pubkey::new_unique()).collect();
        let rpc = Arc::new(MockRpc::new());
        let service = VaultQueryService::with_capacity(rpc.clone(), Pubkey::new_unique(), 3);

        for owner in &owners[..3] {
            service.fetch(Some(owner)).await.unwrap();
        }
        // touch the oldest so the second owner becomes least recent
        service.fetch(Some(&owners[0])).await.unwrap();
        service.fetch(Some(&owners[3])).await.unwrap();

        assert_eq!(service.cached_len(), 3);
        assert!(service.is_cached(&owners[0]));
        assert!(!service.is_cached(&owners[1]));
        assert!(service.is_cached(&owners[3]));

        for owner in &owners {
            service.fetch(Some(owner)).await.unwrap();
            service.invalidate(owner);
        }

        assert!(service.cached_len() <= 3);
        assert_eq!(service.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_during_scan_blocks_stale_insert() {
        let owner = Pubkey::new_unique();
        let rpc = Arc::new(MockRpc::with_vaults(&[vault_for(owner, 10)]));
        let service = VaultQueryService::new(rpc.clone(), Pubkey::new_unique());

        let generation = service.cache().begin_fetch(owner);
        assert_eq!(service.in_flight_len(), 1);
        service.invalidate(&owner);
        assert_ne!(service.cache().generation(&owner), generation);
        service.cache().end_fetch(&owner);

        assert_eq!(service.in_flight_len(), 0);
        assert!(!service.is_cached(&owner));
    }

    #[tokio::test]
    async fn test_scan_error_is_not_cached() {
        let owner = Pubkey::new_unique();
        let rpc = Arc::new(MockRpc::new());
        *rpc.scan_error.lock().unwrap() =
            Some(crate::error::RpcError::Transport("timeout".to_string()));
        let service = VaultQueryService::new(rpc.clone(), Pubkey::new_unique());

        let result = service.fetch(Some(&owner)).await;

        assert!(matches!(result, Err(ClientError::Rpc(_))));
        assert!(!service.is_cached(&owner));
        assert_eq!(service.in_flight_len(), 0);
    }
}
