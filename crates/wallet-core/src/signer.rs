//! Draft + private key → verified, finalized transaction.

use std::sync::Arc;

use bitcoin::psbt::Psbt;
use chain_btc::address::AddressKind;
use chain_btc::registry::AddressTypeRegistry;
use chain_btc::transaction::{
    build_psbt, finalize_psbt, sign_psbt, verify_psbt, InputProof, SignedTransaction, SpendKey,
    TransactionDraft,
};
use chain_client::ChainStateAdapter;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::WalletError;

/// A PSBT whose every input carries a signature that verified.
pub struct VerifiedPsbt {
    psbt: Psbt,
    kind: AddressKind,
}

#[derive(Clone)]
pub struct Signer {
    adapter: ChainStateAdapter,
    registry: Arc<AddressTypeRegistry>,
}

impl Signer {
    pub fn new(adapter: ChainStateAdapter, registry: Arc<AddressTypeRegistry>) -> Self {
        Self { adapter, registry }
    }

    /// Sign, verify and finalize in one step.
    pub async fn sign(
        &self,
        draft: &TransactionDraft,
        private_key: &SecretString,
        from: &str,
        change: Option<&str>,
    ) -> Result<SignedTransaction, WalletError> {
        let verified = self.sign_and_verify(draft, private_key, from, change).await?;
        self.finalize(verified)
    }

    /// Attach input proofs, sign every input and verify every signature.
    ///
    /// Witness inputs get their proof from the key alone; legacy inputs
    /// need the previous transactions, fetched concurrently.
    pub async fn sign_and_verify(
        &self,
        draft: &TransactionDraft,
        private_key: &SecretString,
        from: &str,
        change: Option<&str>,
    ) -> Result<VerifiedPsbt, WalletError> {
        let network = self.registry.network();
        let source = self.registry.classify(from)?;
        let kind = source.name;

        let key = SpendKey::from_wif(private_key.expose_secret(), network)?;
        let key_address = kind.address(key.public_key(), network).to_string();
        if key_address != from {
            return Err(WalletError::InvalidSignature(format!(
                "private key does not control {from}"
            )));
        }

        let mut draft = draft.clone();
        draft.resolve_change(change.unwrap_or(from));

        let proofs = if source.segwit {
            draft
                .inputs
                .iter()
                .map(|input| InputProof::witness(kind, key.public_key(), input.value))
                .collect()
        } else {
            let txids = draft.inputs.iter().map(|input| input.txid).collect();
            let previous = self.adapter.get_transactions(txids).await?;
            debug!(inputs = previous.len(), "fetched previous transactions");
            previous.into_iter().map(InputProof::NonWitness).collect()
        };

        let mut psbt = build_psbt(&draft, proofs, kind, key.public_key(), network)?;
        sign_psbt(&mut psbt, &key, kind)?;
        verify_psbt(&psbt, kind)?;

        debug!(address = from, inputs = psbt.inputs.len(), "inputs signed and verified");
        Ok(VerifiedPsbt { psbt, kind })
    }

    /// Build the final unlocking data and serialize.
    pub fn finalize(&self, verified: VerifiedPsbt) -> Result<SignedTransaction, WalletError> {
        let signed = finalize_psbt(verified.psbt, verified.kind)?;
        info!(txid = %signed.txid, "transaction finalized");
        Ok(signed)
    }
}
