use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::{
    constants::{INITIALIZE_SOL_LOCK_DISCRIMINATOR, SYSTEM_PROGRAM_ID},
    error::ValidationError,
    pda::derive_vault_address,
    state::VaultKind,
};

use super::{validate_lock, LockArgs};

/// Lock `amount` lamports until `unlock_timestamp`
///
/// Accounts: signer (w, s), vault (w), system program
pub fn initialize_sol_lock(
    program_id: &Pubkey,
    signer: &Pubkey,
    amount: u64,
    unlock_timestamp: i64,
    now: i64,
) -> Result<Instruction, ValidationError> {
    validate_lock(amount, unlock_timestamp, now)?;

    let (vault, _) =
        derive_vault_address(program_id, signer, &VaultKind::Native, amount, unlock_timestamp);

    let args = LockArgs {
        discriminator: INITIALIZE_SOL_LOCK_DISCRIMINATOR,
        amount,
        unlock_timestamp,
    };

    Ok(Instruction::new_with_borsh(
        *program_id,
        &args,
        vec![
            AccountMeta::new(*signer, true),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
    ))
}
