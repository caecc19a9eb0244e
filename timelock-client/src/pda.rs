//! Program-derived addresses for vaults and their token accounts
//!
//! Seed order must match the on-chain program byte for byte: a mismatch
//! yields an address the program never treats as its own, not an error.

use solana_sdk::pubkey::Pubkey;

use crate::{
    constants::{ASSOCIATED_TOKEN_PROGRAM_ID, VAULT_SEED},
    state::VaultKind,
};

/// Derive the vault PDA and its canonical bump
///
/// Seeds: `"vault" || owner || [mint] || amount (u64 LE) || unlock_timestamp (i64 LE)`
pub fn derive_vault_address(
    program_id: &Pubkey,
    owner: &Pubkey,
    kind: &VaultKind,
    amount: u64,
    unlock_timestamp: i64,
) -> (Pubkey, u8) {
    let amount_bytes = amount.to_le_bytes();
    let unlock_bytes = unlock_timestamp.to_le_bytes();

    match kind {
        VaultKind::Native => Pubkey::find_program_address(
            &[VAULT_SEED, owner.as_ref(), &amount_bytes, &unlock_bytes],
            program_id,
        ),
        VaultKind::Token(mint) => Pubkey::find_program_address(
            &[
                VAULT_SEED,
                owner.as_ref(),
                mint.as_ref(),
                &amount_bytes,
                &unlock_bytes,
            ],
            program_id,
        ),
    }
}

/// Associated token account of `wallet` for `mint` under `token_program`
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}
