//! Protocol constants shared with the on-chain timelock program

use solana_sdk::{pubkey, pubkey::Pubkey};

/// Default program id, overridden by `TIMELOCK_PROGRAM_ID`
pub const DEFAULT_PROGRAM_ID: Pubkey = pubkey!("H5uhmPyNS5xPnJwrHDFuhSHRmPkMdWUXez8BsRpkTzqe");

pub const VAULT_SEED: &[u8] = b"vault";

pub const SYSTEM_PROGRAM_ID: Pubkey = pubkey!("11111111111111111111111111111111");
pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// sha256("account:Vault")[..8]
pub const VAULT_DISCRIMINATOR: [u8; 8] = [211, 8, 232, 43, 2, 152, 117, 119];

/// sha256("global:initialize_sol_lock")[..8]
pub const INITIALIZE_SOL_LOCK_DISCRIMINATOR: [u8; 8] = [129, 207, 142, 52, 191, 86, 74, 59];
/// sha256("global:initialize_spl_lock")[..8]
pub const INITIALIZE_SPL_LOCK_DISCRIMINATOR: [u8; 8] = [72, 11, 0, 94, 170, 72, 6, 63];
/// sha256("global:withdraw_sol_lock")[..8]
pub const WITHDRAW_SOL_LOCK_DISCRIMINATOR: [u8; 8] = [99, 187, 190, 4, 134, 136, 196, 79];
/// sha256("global:withdraw_spl_lock")[..8]
pub const WITHDRAW_SPL_LOCK_DISCRIMINATOR: [u8; 8] = [110, 96, 133, 8, 55, 229, 81, 25];

/// Offset of the owner pubkey inside a vault account
pub const VAULT_OWNER_OFFSET: usize = 8;

/// Decimal places of native SOL amounts (lamports)
pub const NATIVE_DECIMALS: u8 = 9;
