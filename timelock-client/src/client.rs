//! Facade over derivation, building, querying and submission
//!
//! Everything a UI or the HTTP service needs goes through
//! [`TimelockClient`]; collaborators are injected once at construction.

use std::{sync::Arc, time::Duration};

use solana_sdk::{
    instruction::Instruction, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use tracing::{debug, info};

use crate::{
    clock::{Clock, SystemClock},
    constants::{DEFAULT_PROGRAM_ID, TOKEN_PROGRAM_ID},
    error::{ClientError, Result, SignerError},
    instructions::{
        initialize_sol_lock, initialize_spl_lock, withdraw_sol_lock, withdraw_spl_lock,
        VaultOperation,
    },
    pda::{self, associated_token_address},
    rpc::{RpcClient, TokenHolding, TransactionSigner},
    services::{
        query::QueryState,
        transaction::{AssemblerConfig, Draft, TransactionAssembler},
        MutationCoordinator, VaultQueryService,
    },
    state::VaultKind,
    view::{format_countdown_at, partition, spawn_countdown, CountdownHandle, VaultList},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub program_id: Pubkey,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let assembler = AssemblerConfig::default();
        Self {
            program_id: DEFAULT_PROGRAM_ID,
            poll_interval: assembler.poll_interval,
            max_polls: assembler.max_polls,
        }
    }
}

impl ClientConfig {
    fn assembler(&self) -> AssemblerConfig {
        AssemblerConfig {
            poll_interval: self.poll_interval,
            max_polls: self.max_polls,
        }
    }
}

/// Unsigned transaction handed to an external wallet
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub transaction: VersionedTransaction,
    pub vault: Pubkey,
    pub last_valid_block_height: u64,
}

pub struct TimelockClient {
    config: ClientConfig,
    rpc: Arc<dyn RpcClient>,
    clock: Arc<dyn Clock>,
    signer: Option<Arc<dyn TransactionSigner>>,
    assembler: TransactionAssembler,
    query: Arc<VaultQueryService>,
    mutations: MutationCoordinator,
}

impl TimelockClient {
    pub fn new(config: ClientConfig, rpc: Arc<dyn RpcClient>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let assembler = TransactionAssembler::new(rpc.clone(), config.assembler());
        let query = Arc::new(VaultQueryService::new(rpc.clone(), config.program_id));
        let mutations =
            MutationCoordinator::new(config.program_id, assembler.clone(), query.clone(), clock.clone());

        debug!(program_id = %config.program_id, "Timelock client created");

        Self {
            config,
            rpc,
            clock,
            signer: None,
            assembler,
            query,
            mutations,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.mutations = MutationCoordinator::new(
            self.config.program_id,
            self.assembler.clone(),
            self.query.clone(),
            clock.clone(),
        );
        self.clock = clock;
        self
    }

    /// Attach the connected wallet used by [`Self::submit_mutation`]
    pub fn with_signer(mut self, signer: Arc<dyn TransactionSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.config.program_id
    }

    /// Address of the connected wallet, if any
    pub fn owner(&self) -> Option<Pubkey> {
        self.signer.as_ref().map(|signer| signer.address())
    }

    pub fn derive_vault_address(
        &self,
        owner: &Pubkey,
        mint: Option<Pubkey>,
        amount: u64,
        unlock_timestamp: i64,
    ) -> (Pubkey, u8) {
        pda::derive_vault_address(
            &self.config.program_id,
            owner,
            &VaultKind::from(mint),
            amount,
            unlock_timestamp,
        )
    }

    pub fn build_initialize_sol_lock(
        &self,
        signer: &Pubkey,
        amount: u64,
        unlock_timestamp: i64,
    ) -> Result<Instruction> {
        Ok(initialize_sol_lock(
            &self.config.program_id,
            signer,
            amount,
            unlock_timestamp,
            self.clock.unix_timestamp(),
        )?)
    }

    pub fn build_initialize_spl_lock(
        &self,
        signer: &Pubkey,
        amount: u64,
        unlock_timestamp: i64,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Instruction> {
        Ok(initialize_spl_lock(
            &self.config.program_id,
            signer,
            amount,
            unlock_timestamp,
            mint,
            token_program,
            self.clock.unix_timestamp(),
        )?)
    }

    pub fn build_withdraw_sol_lock(&self, signer: &Pubkey, vault: &Pubkey) -> Instruction {
        withdraw_sol_lock(&self.config.program_id, signer, vault)
    }

    /// Both token accounts are derived from the signer and the vault
    pub fn build_withdraw_spl_lock(
        &self,
        signer: &Pubkey,
        vault: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> Instruction {
        withdraw_spl_lock(
            &self.config.program_id,
            signer,
            vault,
            mint,
            &associated_token_address(signer, mint, token_program),
            &associated_token_address(vault, mint, token_program),
            token_program,
        )
    }

    /// Sign with the attached wallet, broadcast and wait for confirmation
    pub async fn submit_mutation(&self, operation: &VaultOperation) -> Result<Signature> {
        let signer = self
            .signer
            .as_ref()
            .ok_or(ClientError::Signing(SignerError::NotConnected))?;
        let vault_key = operation.vault_key(&self.config.program_id, &signer.address());

        self.mutations
            .submit(vault_key, operation, signer.as_ref())
            .await
    }

    pub fn is_pending(&self, vault_key: &Pubkey) -> bool {
        self.mutations.is_pending(vault_key)
    }

    /// Build `operation` for `fee_payer` and anchor it, leaving signing and
    /// broadcast to the caller's wallet
    pub async fn prepare_transaction(
        &self,
        fee_payer: &Pubkey,
        operation: &VaultOperation,
    ) -> Result<PreparedTransaction> {
        let instruction =
            operation.build(&self.config.program_id, fee_payer, self.clock.unix_timestamp())?;
        let vault = operation.vault_key(&self.config.program_id, fee_payer);

        let anchored = self
            .assembler
            .anchor(Draft {
                fee_payer: *fee_payer,
                instruction,
            })
            .await?;

        info!(
            operation = operation.name(),
            fee_payer = %fee_payer,
            vault = %vault,
            "Prepared unsigned transaction"
        );

        Ok(PreparedTransaction {
            transaction: anchored.transaction,
            vault,
            last_valid_block_height: anchored.anchor.last_valid_block_height,
        })
    }

    /// Owner's vaults split into locked and unlocked at the current time;
    /// empty while no owner is connected
    pub async fn list_vaults(&self, owner: Option<&Pubkey>) -> Result<VaultList> {
        match self.query.fetch(owner).await? {
            QueryState::Disabled => Ok(VaultList::default()),
            QueryState::Ready(vaults) => Ok(partition(&vaults, self.clock.unix_timestamp())),
        }
    }

    pub fn invalidate(&self, owner: &Pubkey) {
        self.query.invalidate(owner);
    }

    /// Classic SPL Token balances of `owner` that can be locked (non-zero only)
    pub async fn list_user_tokens(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        let holdings = self
            .rpc
            .get_token_accounts_by_owner(owner, &TOKEN_PROGRAM_ID)
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))?;
        let total = holdings.len();

        let tokens: Vec<_> = holdings
            .into_iter()
            .filter(|holding| holding.amount > 0)
            .collect();

        debug!(owner = %owner, total, non_zero = tokens.len(), "Listed token holdings");

        Ok(tokens)
    }

    pub fn format_countdown(&self, unlock_timestamp: i64) -> String {
        format_countdown_at(unlock_timestamp, self.clock.unix_timestamp())
    }

    /// Must be called from within a tokio runtime
    pub fn watch_countdown(&self, unlock_timestamp: i64) -> CountdownHandle {
        spawn_countdown(unlock_timestamp, self.clock.clone())
    }
}
