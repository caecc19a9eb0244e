//! One in-flight mutation per vault, with cache invalidation on success

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tracing::{info, warn};

use crate::{
    clock::Clock,
    error::{ClientError, Result},
    instructions::VaultOperation,
    rpc::TransactionSigner,
    services::{
        query::VaultQueryService,
        transaction::{Draft, TransactionAssembler},
    },
};

type PendingSet = Arc<Mutex<HashSet<Pubkey>>>;

fn lock(pending: &PendingSet) -> MutexGuard<'_, HashSet<Pubkey>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the vault key when the submission finishes or is dropped
struct PendingGuard {
    pending: PendingSet,
    key: Pubkey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.key);
    }
}

pub struct MutationCoordinator {
    program_id: Pubkey,
    assembler: TransactionAssembler,
    query: Arc<VaultQueryService>,
    clock: Arc<dyn Clock>,
    pending: PendingSet,
}

impl MutationCoordinator {
    pub fn new(
        program_id: Pubkey,
        assembler: TransactionAssembler,
        query: Arc<VaultQueryService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            program_id,
            assembler,
            query,
            clock,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_pending(&self, vault_key: &Pubkey) -> bool {
        lock(&self.pending).contains(vault_key)
    }

    fn acquire(&self, vault_key: Pubkey) -> Option<PendingGuard> {
        lock(&self.pending).insert(vault_key).then(|| PendingGuard {
            pending: self.pending.clone(),
            key: vault_key,
        })
    }

    /// Build, sign, send and confirm `operation`; invalidates the signer's
    /// vault list only once the network confirms
    pub async fn submit(
        &self,
        vault_key: Pubkey,
        operation: &VaultOperation,
        signer: &dyn TransactionSigner,
    ) -> Result<Signature> {
        let Some(_guard) = self.acquire(vault_key) else {
            info!(vault = %vault_key, "Mutation already pending");
            return Err(ClientError::AlreadyPending { vault: vault_key });
        };

        let owner = signer.address();
        let instruction = operation.build(&self.program_id, &owner, self.clock.unix_timestamp())?;

        info!(
            vault = %vault_key,
            operation = operation.name(),
            owner = %owner,
            "Submitting mutation"
        );

        let draft = Draft {
            fee_payer: owner,
            instruction,
        };

        match self.assembler.submit(draft, signer).await {
            Ok(signature) => {
                self.query.invalidate(&owner);
                info!(vault = %vault_key, signature = %signature, "Mutation confirmed");
                Ok(signature)
            }
            Err(err) => {
                warn!(
                    vault = %vault_key,
                    code = err.code(),
                    error = %err,
                    "Mutation failed"
                );
                Err(err)
            }
        }
    }
}
