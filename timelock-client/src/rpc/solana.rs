//! [`RpcClient`] over the Solana JSON-RPC nonblocking client

use async_trait::async_trait;
use solana_client::{
    client_error::{ClientError as SolanaClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient as NonblockingRpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType},
    rpc_request::{RpcError as SolanaRpcError, RpcResponseErrorData, TokenAccountsFilter},
    rpc_response::RpcKeyedAccount,
};
use serde::Deserialize;
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use tracing::{debug, warn};

use super::{AccountFilter, RecencyAnchor, RpcClient, SignatureStatus, TokenHolding};
use crate::error::RpcError;

pub struct SolanaRpc {
    client: NonblockingRpcClient,
    commitment: CommitmentConfig,
}

impl SolanaRpc {
    /// Uses `confirmed` so a freshly confirmed mutation is visible to the next scan
    pub fn new(url: &str) -> Self {
        let commitment = CommitmentConfig::confirmed();
        Self {
            client: NonblockingRpcClient::new_with_commitment(url.to_string(), commitment),
            commitment,
        }
    }
}

fn transport(err: SolanaClientError) -> RpcError {
    RpcError::Transport(err.to_string())
}

/// Preflight failures are simulation errors; everything else is transport
fn classify_send_error(err: SolanaClientError) -> RpcError {
    match err.kind() {
        ClientErrorKind::RpcError(SolanaRpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(_),
            message,
            ..
        }) => RpcError::Simulation(message.clone()),
        ClientErrorKind::TransactionError(tx_err) => RpcError::Simulation(tx_err.to_string()),
        _ => transport(err),
    }
}

/// `jsonParsed` token account: `{ "parsed": { "info": { "mint", "tokenAmount" } } }`
#[derive(Deserialize)]
struct ParsedTokenData {
    parsed: ParsedTokenAccount,
}

#[derive(Deserialize)]
struct ParsedTokenAccount {
    info: TokenAccountInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: String,
    token_amount: TokenAmount,
}

#[derive(Deserialize)]
struct TokenAmount {
    /// Base units as a decimal string
    amount: String,
    decimals: u8,
}

fn parse_token_holding(keyed: &RpcKeyedAccount) -> Result<TokenHolding, String> {
    let data = serde_json::to_value(&keyed.account.data).map_err(|e| e.to_string())?;
    let ParsedTokenData {
        parsed: ParsedTokenAccount { info },
    } = serde_json::from_value(data).map_err(|e| e.to_string())?;

    Ok(TokenHolding {
        account: keyed.pubkey.parse().map_err(|_| format!("bad account {}", keyed.pubkey))?,
        mint: info.mint.parse().map_err(|_| format!("bad mint {}", info.mint))?,
        amount: info.token_amount.amount.parse().map_err(|_| {
            format!("bad amount {}", info.token_amount.amount)
        })?,
        decimals: info.token_amount.decimals,
    })
}

fn to_rpc_filter(filter: &AccountFilter) -> RpcFilterType {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => RpcFilterType::Memcmp(Memcmp::new(
            *offset,
            MemcmpEncodedBytes::Base58(bs58::encode(bytes).into_string()),
        )),
    }
}

#[async_trait]
impl RpcClient for SolanaRpc {
    async fn get_latest_blockhash(&self) -> Result<RecencyAnchor, RpcError> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map_err(transport)?;

        Ok(RecencyAnchor {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, RpcError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters.iter().map(to_rpc_filter).collect()),
            account_config: RpcAccountInfoConfig {
                commitment: Some(self.commitment),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(program_id, config)
            .await
            .map_err(transport)?;

        debug!(program = %program_id, count = accounts.len(), "Fetched program accounts");

        Ok(accounts
            .into_iter()
            .map(|(address, account)| (address, account.data))
            .collect())
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, RpcError> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(classify_send_error)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<SignatureStatus, RpcError> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, self.commitment)
            .await
            .map_err(transport)?;

        Ok(match status {
            None => SignatureStatus::Pending,
            Some(Ok(())) => SignatureStatus::Confirmed,
            Some(Err(err)) => SignatureStatus::Failed(err.to_string()),
        })
    }

    async fn get_block_height(&self) -> Result<u64, RpcError> {
        self.client
            .get_block_height_with_commitment(self.commitment)
            .await
            .map_err(transport)
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<TokenHolding>, RpcError> {
        let accounts = self
            .client
            .get_token_accounts_by_owner_with_commitment(
                owner,
                TokenAccountsFilter::ProgramId(*token_program),
                self.commitment,
            )
            .await
            .map_err(transport)?
            .value;

        debug!(owner = %owner, count = accounts.len(), "Fetched token accounts");

        Ok(accounts
            .iter()
            .filter_map(|keyed| match parse_token_holding(keyed) {
                Ok(holding) => Some(holding),
                Err(err) => {
                    warn!(account = %keyed.pubkey, error = %err, "Skipping unparsable token account");
                    None
                }
            })
            .collect())
    }
}
