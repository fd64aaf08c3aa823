//! End-to-end send: draft, sign, finalize, broadcast.

use std::fmt;

use bitcoin::Amount;
use chain_client::ChainStateAdapter;
use secrecy::SecretString;
use tracing::{info, warn};

use crate::assembler::TransactionAssembler;
use crate::error::WalletError;
use crate::signer::Signer;
use crate::types::SendResult;

/// Progress of one send request. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SendStage {
    Start,
    Drafted,
    Signed,
    Finalized,
    Broadcast,
    Done,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SendStage::Start => "start",
            SendStage::Drafted => "drafted",
            SendStage::Signed => "signed",
            SendStage::Finalized => "finalized",
            SendStage::Broadcast => "broadcast",
            SendStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Send failure together with the last stage reached.
#[derive(Debug)]
pub struct SendFailure {
    pub stage: SendStage,
    pub error: WalletError,
}

#[derive(Clone)]
pub struct SendOrchestrator {
    assembler: TransactionAssembler,
    signer: Signer,
    adapter: ChainStateAdapter,
}

impl SendOrchestrator {
    pub fn new(assembler: TransactionAssembler, signer: Signer, adapter: ChainStateAdapter) -> Self {
        Self {
            assembler,
            signer,
            adapter,
        }
    }

    pub async fn send(
        &self,
        private_key: &SecretString,
        from: &str,
        to: &str,
        change: Option<&str>,
        amount: Amount,
    ) -> Result<SendResult, WalletError> {
        self.send_tracked(private_key, from, to, change, amount)
            .await
            .map_err(|failure| failure.error)
    }

    /// Like [`send`](Self::send), but a failure reports the stage it
    /// happened after.
    pub async fn send_tracked(
        &self,
        private_key: &SecretString,
        from: &str,
        to: &str,
        change: Option<&str>,
        amount: Amount,
    ) -> Result<SendResult, SendFailure> {
        let mut stage = SendStage::Start;
        match self.run(&mut stage, private_key, from, to, change, amount).await {
            Ok(result) => Ok(result),
            Err(error) => {
                warn!(stage = %stage, kind = error.kind(), error = %error, "send failed");
                Err(SendFailure { stage, error })
            }
        }
    }

    async fn run(
        &self,
        stage: &mut SendStage,
        private_key: &SecretString,
        from: &str,
        to: &str,
        change: Option<&str>,
        amount: Amount,
    ) -> Result<SendResult, WalletError> {
        let draft = self.assembler.prepare(from, to, change, amount).await?;
        advance(stage, SendStage::Drafted);

        let verified = self
            .signer
            .sign_and_verify(&draft, private_key, from, change)
            .await?;
        advance(stage, SendStage::Signed);

        let signed = self.signer.finalize(verified)?;
        advance(stage, SendStage::Finalized);

        let txid = signed.txid;
        let accepted = self.adapter.broadcast(signed.raw).await?;
        advance(stage, SendStage::Broadcast);
        if accepted != txid {
            warn!(%txid, reported = %accepted, "backend reported a different txid");
        }

        advance(stage, SendStage::Done);
        Ok(SendResult {
            transaction_id: txid.to_string(),
        })
    }
}

fn advance(stage: &mut SendStage, next: SendStage) {
    debug_assert!(next > *stage);
    info!(from = %stage, to = %next, "send stage");
    *stage = next;
}
