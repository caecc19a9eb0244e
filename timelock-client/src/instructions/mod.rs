//! Instruction builders for the four timelock program operations

pub mod initialize_sol_lock;
pub mod initialize_spl_lock;
pub mod withdraw_sol_lock;
pub mod withdraw_spl_lock;

pub use initialize_sol_lock::*;
pub use initialize_spl_lock::*;
pub use withdraw_sol_lock::*;
pub use withdraw_spl_lock::*;

use borsh::BorshSerialize;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::{
    error::ValidationError,
    pda::{associated_token_address, derive_vault_address},
    state::VaultKind,
};

/// Client-side lock preconditions; the program re-checks both
pub fn validate_lock(amount: u64, unlock_timestamp: i64, now: i64) -> Result<(), ValidationError> {
    if amount == 0 {
        return Err(ValidationError::ZeroAmount);
    }
    if unlock_timestamp <= now {
        return Err(ValidationError::UnlockTimeNotInFuture {
            unlock_timestamp,
            now,
        });
    }
    Ok(())
}

/// Anchor payload: discriminator || amount (u64 LE) || unlock_timestamp (i64 LE)
#[derive(Debug, BorshSerialize)]
struct LockArgs {
    discriminator: [u8; 8],
    amount: u64,
    unlock_timestamp: i64,
}

/// A single vault mutation, ready to be built for a given signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultOperation {
    InitializeSolLock {
        amount: u64,
        unlock_timestamp: i64,
    },
    InitializeSplLock {
        amount: u64,
        unlock_timestamp: i64,
        mint: Pubkey,
        token_program: Pubkey,
    },
    WithdrawSolLock {
        vault: Pubkey,
    },
    WithdrawSplLock {
        vault: Pubkey,
        mint: Pubkey,
        token_program: Pubkey,
    },
}

impl VaultOperation {
    pub fn name(&self) -> &'static str {
        match self {
            VaultOperation::InitializeSolLock { .. } => "initialize_sol_lock",
            VaultOperation::InitializeSplLock { .. } => "initialize_spl_lock",
            VaultOperation::WithdrawSolLock { .. } => "withdraw_sol_lock",
            VaultOperation::WithdrawSplLock { .. } => "withdraw_spl_lock",
        }
    }

    /// Address of the vault this operation creates or consumes
    pub fn vault_key(&self, program_id: &Pubkey, signer: &Pubkey) -> Pubkey {
        match self {
            VaultOperation::InitializeSolLock {
                amount,
                unlock_timestamp,
            } => {
                derive_vault_address(program_id, signer, &VaultKind::Native, *amount, *unlock_timestamp)
                    .0
            }
            VaultOperation::InitializeSplLock {
                amount,
                unlock_timestamp,
                mint,
                ..
            } => {
                derive_vault_address(
                    program_id,
                    signer,
                    &VaultKind::Token(*mint),
                    *amount,
                    *unlock_timestamp,
                )
                .0
            }
            VaultOperation::WithdrawSolLock { vault }
            | VaultOperation::WithdrawSplLock { vault, .. } => *vault,
        }
    }

    pub fn build(
        &self,
        program_id: &Pubkey,
        signer: &Pubkey,
        now: i64,
    ) -> Result<Instruction, ValidationError> {
        match self {
            VaultOperation::InitializeSolLock {
                amount,
                unlock_timestamp,
            } => initialize_sol_lock(program_id, signer, *amount, *unlock_timestamp, now),
            VaultOperation::InitializeSplLock {
                amount,
                unlock_timestamp,
                mint,
                token_program,
            } => initialize_spl_lock(
                program_id,
                signer,
                *amount,
                *unlock_timestamp,
                mint,
                token_program,
                now,
            ),
            VaultOperation::WithdrawSolLock { vault } => {
                Ok(withdraw_sol_lock(program_id, signer, vault))
            }
            VaultOperation::WithdrawSplLock {
                vault,
                mint,
                token_program,
            } => {
                let user_ata = associated_token_address(signer, mint, token_program);
                let vault_ata = associated_token_address(vault, mint, token_program);
                Ok(withdraw_spl_lock(
                    program_id,
                    signer,
                    vault,
                    mint,
                    &user_ata,
                    &vault_ata,
                    token_program,
                ))
            }
        }
    }
}
