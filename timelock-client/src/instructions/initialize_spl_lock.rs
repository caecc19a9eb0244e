use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::{
    constants::{ASSOCIATED_TOKEN_PROGRAM_ID, INITIALIZE_SPL_LOCK_DISCRIMINATOR, SYSTEM_PROGRAM_ID},
    error::ValidationError,
    pda::{associated_token_address, derive_vault_address},
    state::VaultKind,
};

use super::{validate_lock, LockArgs};

/// Lock `amount` base units of `mint` until `unlock_timestamp`
///
/// The vault's token account is created by the program; the signer's
/// token account must already hold the balance.
pub fn initialize_spl_lock(
    program_id: &Pubkey,
    signer: &Pubkey,
    amount: u64,
    unlock_timestamp: i64,
    mint: &Pubkey,
    token_program: &Pubkey,
    now: i64,
) -> Result<Instruction, ValidationError> {
    validate_lock(amount, unlock_timestamp, now)?;

    let (vault, _) = derive_vault_address(
        program_id,
        signer,
        &VaultKind::Token(*mint),
        amount,
        unlock_timestamp,
    );
    let vault_ata = associated_token_address(&vault, mint, token_program);
    let signer_ata = associated_token_address(signer, mint, token_program);

    let args = LockArgs {
        discriminator: INITIALIZE_SPL_LOCK_DISCRIMINATOR,
        amount,
        unlock_timestamp,
    };

    Ok(Instruction::new_with_borsh(
        *program_id,
        &args,
        vec![
            AccountMeta::new(*signer, true),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(vault_ata, false),
            AccountMeta::new(signer_ata, false),
            AccountMeta::new_readonly(*token_program, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(ASSOCIATED_TOKEN_PROGRAM_ID, false),
        ],
    ))
}
