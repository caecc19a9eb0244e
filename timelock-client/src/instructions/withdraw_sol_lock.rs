use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::constants::WITHDRAW_SOL_LOCK_DISCRIMINATOR;

/// Close a native vault, returning lamports and rent to the signer
///
/// Lock-time and ownership checks are enforced on-chain.
pub fn withdraw_sol_lock(program_id: &Pubkey, signer: &Pubkey, vault: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*signer, true),
            AccountMeta::new(*vault, false),
        ],
        data: WITHDRAW_SOL_LOCK_DISCRIMINATOR.to_vec(),
    }
}
