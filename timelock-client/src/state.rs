//! Typed view of the on-chain `Vault` account

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::{constants::VAULT_DISCRIMINATOR, error::DecodeError};

/// Native SOL vault or token vault for a specific mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaultKind {
    Native,
    Token(Pubkey),
}

impl VaultKind {
    pub fn mint(&self) -> Option<&Pubkey> {
        match self {
            VaultKind::Native => None,
            VaultKind::Token(mint) => Some(mint),
        }
    }
}

impl From<Option<Pubkey>> for VaultKind {
    fn from(mint: Option<Pubkey>) -> Self {
        mint.map_or(VaultKind::Native, VaultKind::Token)
    }
}

/// Decoded vault account with its network address attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    pub address: Pubkey,
    /// Depositor, fixed at creation
    pub owner: Pubkey,
    pub kind: VaultKind,
    /// Smallest denomination (lamports or token base units)
    pub amount: u64,
    /// Unix seconds
    pub unlock_timestamp: i64,
    /// PDA bump seed
    pub bump: u8,
}

/// Borsh body following the 8-byte discriminator
#[derive(BorshSerialize, BorshDeserialize)]
struct VaultAccount {
    owner: Pubkey,
    mint: Option<Pubkey>,
    amount: u64,
    unlock_timestamp: i64,
    bump: u8,
}

const MINT_TAG_OFFSET: usize = 8 + 32;

impl Vault {
    pub const NATIVE_LEN: usize = 8 +  // discriminator
        32 +  // owner
        1 +   // mint option tag
        8 +   // amount
        8 +   // unlock_timestamp
        1; // bump

    pub const TOKEN_LEN: usize = Self::NATIVE_LEN + 32;

    /// Decode Borsh account bytes, validating the discriminator first.
    /// Bytes past the declared fields are ignored.
    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self, DecodeError> {
        let Some((discriminator, mut body)) = data.split_first_chunk::<8>() else {
            return Err(DecodeError::Truncated {
                needed: 8,
                actual: data.len(),
            });
        };
        if *discriminator != VAULT_DISCRIMINATOR {
            return Err(DecodeError::WrongDiscriminator);
        }

        let needed = match data.get(MINT_TAG_OFFSET) {
            None | Some(0) => Self::NATIVE_LEN,
            Some(1) => Self::TOKEN_LEN,
            Some(&tag) => return Err(DecodeError::InvalidOptionTag(tag)),
        };
        if data.len() < needed {
            return Err(DecodeError::Truncated {
                needed,
                actual: data.len(),
            });
        }

        let account = VaultAccount::deserialize(&mut body)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        Ok(Self {
            address,
            owner: account.owner,
            kind: VaultKind::from(account.mint),
            amount: account.amount,
            unlock_timestamp: account.unlock_timestamp,
            bump: account.bump,
        })
    }

    /// Account bytes as the program writes them; used to build fixtures
    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        let account = VaultAccount {
            owner: self.owner,
            mint: self.kind.mint().copied(),
            amount: self.amount,
            unlock_timestamp: self.unlock_timestamp,
            bump: self.bump,
        };

        let mut data = Vec::with_capacity(Self::TOKEN_LEN);
        data.extend_from_slice(&VAULT_DISCRIMINATOR);
        account.serialize(&mut data)?;
        Ok(data)
    }
}
