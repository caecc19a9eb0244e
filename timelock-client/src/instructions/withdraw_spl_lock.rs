use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::constants::WITHDRAW_SPL_LOCK_DISCRIMINATOR;

/// Drain a token vault into `user_ata` and close both vault accounts
pub fn withdraw_spl_lock(
    program_id: &Pubkey,
    signer: &Pubkey,
    vault: &Pubkey,
    mint: &Pubkey,
    user_ata: &Pubkey,
    vault_ata: &Pubkey,
    token_program: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*signer, true),
            AccountMeta::new(*vault, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(*user_ata, false),
            AccountMeta::new(*vault_ata, false),
            AccountMeta::new_readonly(*token_program, false),
        ],
        data: WITHDRAW_SPL_LOCK_DISCRIMINATOR.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TOKEN_PROGRAM_ID;

    #[test]
    fn test_account_order_and_payload() {
        let program_id = Pubkey::new_unique();
        let signer = Pubkey::new_unique();
        let vault = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let user_ata = Pubkey::new_unique();
        let vault_ata = Pubkey::new_unique();

        let ix = withdraw_spl_lock(
            &program_id,
            &signer,
            &vault,
            &mint,
            &user_ata,
            &vault_ata,
            &TOKEN_PROGRAM_ID,
        );

        assert_eq!(
            ix.accounts,
            vec![
                AccountMeta::new(signer, true),
                AccountMeta::new(vault, false),
                AccountMeta::new_readonly(mint, false),
                AccountMeta::new(user_ata, false),
                AccountMeta::new(vault_ata, false),
                AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            ]
        );
        assert_eq!(ix.data, WITHDRAW_SPL_LOCK_DISCRIMINATOR.to_vec());
    }
}
