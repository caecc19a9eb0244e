//! Transaction assembly and submission
//!
//! A submission moves through `Draft -> Anchored -> Signed -> Sent` and ends
//! `Confirmed`, `Expired` or rejected. Each stage is its own type so a stage
//! can only be reached from the one before it. Expiry is never retried here:
//! the caller restarts from a fresh draft because a time-sensitive
//! instruction may no longer be valid.

use std::{sync::Arc, time::Duration};

use solana_sdk::{
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, Result, RpcError, SignerError},
    rpc::{RecencyAnchor, RpcClient, SignatureStatus, TransactionSigner},
};

/// One instruction and the account paying for it
#[derive(Debug, Clone)]
pub struct Draft {
    pub fee_payer: Pubkey,
    pub instruction: Instruction,
}

#[derive(Debug, Clone)]
pub struct Anchored {
    pub transaction: VersionedTransaction,
    pub anchor: RecencyAnchor,
}

#[derive(Debug, Clone)]
pub struct Signed {
    pub transaction: VersionedTransaction,
    pub anchor: RecencyAnchor,
}

#[derive(Debug, Clone, Copy)]
pub struct Sent {
    pub signature: Signature,
    pub anchor: RecencyAnchor,
}

/// Compile a single-instruction v0 transaction with empty signature slots
pub fn build_unsigned_transaction(
    fee_payer: &Pubkey,
    instruction: Instruction,
    anchor: &RecencyAnchor,
) -> Result<VersionedTransaction> {
    let message = v0::Message::try_compile(fee_payer, &[instruction], &[], anchor.blockhash)
        .map_err(|e| ClientError::Compile(e.to_string()))?;
    let message = VersionedMessage::V0(message);
    let required = usize::from(message.header().num_required_signatures);

    Ok(VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message,
    })
}

/// Fee-payer signature, which doubles as the transaction id
pub fn transaction_signature(transaction: &VersionedTransaction) -> Option<Signature> {
    transaction
        .signatures
        .first()
        .copied()
        .filter(|signature| *signature != Signature::default())
}

#[derive(Debug, Clone, Copy)]
pub struct AssemblerConfig {
    pub poll_interval: Duration,
    /// Upper bound on status polls before giving up as expired
    pub max_polls: u32,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_polls: 120,
        }
    }
}

#[derive(Clone)]
pub struct TransactionAssembler {
    rpc: Arc<dyn RpcClient>,
    config: AssemblerConfig,
}

impl TransactionAssembler {
    pub fn new(rpc: Arc<dyn RpcClient>, config: AssemblerConfig) -> Self {
        Self { rpc, config }
    }

    /// Drive a draft all the way to confirmation
    pub async fn submit(
        &self,
        draft: Draft,
        signer: &dyn TransactionSigner,
    ) -> Result<Signature> {
        let anchored = self.anchor(draft).await?;
        let signed = self.sign(anchored, signer).await?;
        let sent = self.send(signed).await?;
        self.confirm(sent).await
    }

    pub async fn anchor(&self, draft: Draft) -> Result<Anchored> {
        let anchor = self.rpc.get_latest_blockhash().await.map_err(rpc_error)?;
        let transaction = build_unsigned_transaction(&draft.fee_payer, draft.instruction, &anchor)?;

        debug!(
            blockhash = %anchor.blockhash,
            last_valid_block_height = anchor.last_valid_block_height,
            "Anchored transaction"
        );

        Ok(Anchored {
            transaction,
            anchor,
        })
    }

    pub async fn sign(&self, anchored: Anchored, signer: &dyn TransactionSigner) -> Result<Signed> {
        let Anchored {
            mut transaction,
            anchor,
        } = anchored;

        let fee_payer = transaction.message.static_account_keys()[0];
        if fee_payer != signer.address() {
            return Err(SignerError::Declined(format!(
                "signer {} is not fee payer {fee_payer}",
                signer.address()
            ))
            .into());
        }

        let signatures = signer
            .sign_transactions(std::slice::from_ref(&transaction))
            .await?;
        let [signature] = signatures.as_slice() else {
            return Err(SignerError::SignatureCount {
                expected: 1,
                actual: signatures.len(),
            }
            .into());
        };

        if !signature.verify(fee_payer.as_ref(), &transaction.message.serialize()) {
            return Err(SignerError::InvalidSignature.into());
        }
        transaction.signatures[0] = *signature;

        Ok(Signed {
            transaction,
            anchor,
        })
    }

    pub async fn send(&self, signed: Signed) -> Result<Sent> {
        let signature = self
            .rpc
            .send_transaction(&signed.transaction)
            .await
            .map_err(|err| match err {
                RpcError::Transport(msg) => ClientError::Broadcast(msg),
                RpcError::Simulation(msg) => ClientError::Simulation(msg),
            })?;

        info!(signature = %signature, "Transaction sent");

        Ok(Sent {
            signature,
            anchor: signed.anchor,
        })
    }

    /// Poll until confirmed, failed, or the anchor's block height passes
    pub async fn confirm(&self, sent: Sent) -> Result<Signature> {
        let Sent { signature, anchor } = sent;
        let expired = ClientError::Expired {
            last_valid_block_height: anchor.last_valid_block_height,
        };

        for _ in 0..self.config.max_polls {
            if let Some(result) = self.check_status(&signature).await {
                return result;
            }

            match self.rpc.get_block_height().await {
                Ok(height) if height > anchor.last_valid_block_height => {
                    // one last look: it may have landed in the final valid block
                    if let Some(result) = self.check_status(&signature).await {
                        return result;
                    }
                    warn!(signature = %signature, height, "Transaction expired");
                    return Err(expired);
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Block height poll failed"),
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }

        warn!(signature = %signature, polls = self.config.max_polls, "Gave up waiting for confirmation");
        Err(expired)
    }

    async fn check_status(&self, signature: &Signature) -> Option<Result<Signature>> {
        match self.rpc.get_signature_status(signature).await {
            Ok(SignatureStatus::Confirmed) => {
                info!(signature = %signature, "Transaction confirmed");
                Some(Ok(*signature))
            }
            Ok(SignatureStatus::Failed(reason)) => {
                warn!(signature = %signature, reason = %reason, "Transaction failed on-chain");
                Some(Err(ClientError::TransactionFailed {
                    signature: *signature,
                    reason,
                }))
            }
            Ok(SignatureStatus::Pending) => None,
            Err(err) => {
                warn!(signature = %signature, error = %err, "Status poll failed");
                None
            }
        }
    }
}

fn rpc_error(err: RpcError) -> ClientError {
    ClientError::Rpc(err.to_string())
}
