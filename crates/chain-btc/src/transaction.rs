use std::fmt;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize;
use bitcoin::ecdsa;
use bitcoin::hashes::Hash;
use bitcoin::psbt::{self, Psbt};
use bitcoin::script::{Builder, PushBytesBuf, ScriptBuf};
use bitcoin::secp256k1::{Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, CompressedPublicKey, OutPoint, PrivateKey, PublicKey, Sequence, Transaction, TxIn,
    TxOut, Txid, Witness,
};
use serde::{Deserialize, Serialize};

use crate::address::{parse_address, AddressKind};
use crate::error::BtcError;
use crate::network::BtcNetwork;
use crate::utxo::CoinSelection;

/// An input of a draft: which output is spent and what it is worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftInput {
    #[serde(rename = "hash")]
    pub txid: Txid,
    pub vout: u32,
    pub value: u64,
}

/// An output of a draft. `address: None` is change that still has to be
/// pointed somewhere before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOutput {
    pub address: Option<String>,
    pub value: u64,
}

/// Unsigned spend produced by coin selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub inputs: Vec<DraftInput>,
    pub outputs: Vec<DraftOutput>,
    pub fee: u64,
}

impl TransactionDraft {
    /// Take over a selection as-is; fee and outputs are not recomputed.
    pub fn from_selection(selection: CoinSelection) -> Self {
        Self {
            inputs: selection
                .inputs
                .into_iter()
                .map(|utxo| DraftInput {
                    txid: utxo.txid,
                    vout: utxo.vout,
                    value: utxo.amount_sat,
                })
                .collect(),
            outputs: selection
                .outputs
                .into_iter()
                .map(|output| DraftOutput {
                    address: output.address,
                    value: output.amount_sat,
                })
                .collect(),
            fee: selection.fee,
        }
    }

    /// Point every address-less output at `change_address`.
    pub fn resolve_change(&mut self, change_address: &str) {
        for output in self.outputs.iter_mut().filter(|o| o.address.is_none()) {
            output.address = Some(change_address.to_string());
        }
    }

    pub fn input_total(&self) -> u64 {
        self.inputs.iter().map(|i| i.value).sum()
    }

    pub fn output_total(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// `Σ inputs == Σ outputs + fee`.
    pub fn is_balanced(&self) -> bool {
        self.output_total().checked_add(self.fee) == Some(self.input_total())
    }
}

/// Data that lets the signer commit to the value being spent.
#[derive(Debug, Clone)]
pub enum InputProof {
    /// Script and value of the spent output (witness inputs).
    Witness(TxOut),
    /// The entire previous transaction (legacy inputs).
    NonWitness(Transaction),
}

impl InputProof {
    /// Witness proof for an output of `kind` locked to `pubkey`.
    pub fn witness(kind: AddressKind, pubkey: &CompressedPublicKey, value: u64) -> Self {
        InputProof::Witness(TxOut {
            value: Amount::from_sat(value),
            script_pubkey: kind.script_pubkey(pubkey),
        })
    }
}

/// A private key imported from WIF, with its compressed public key.
pub struct SpendKey {
    private_key: PrivateKey,
    public_key: CompressedPublicKey,
}

impl SpendKey {
    /// Parse a WIF key and require that it was encoded for `network`.
    ///
    /// Error messages never echo the key material.
    pub fn from_wif(wif: &str, network: BtcNetwork) -> Result<Self, BtcError> {
        let private_key = PrivateKey::from_wif(wif.trim())
            .map_err(|_| BtcError::InvalidPrivateKey("malformed WIF encoding".into()))?;
        if private_key.network != network.kind() {
            return Err(BtcError::InvalidPrivateKey(format!(
                "key is not encoded for {network}"
            )));
        }
        if !private_key.compressed {
            return Err(BtcError::InvalidPrivateKey(
                "uncompressed keys are not supported".into(),
            ));
        }

        let secp = Secp256k1::signing_only();
        let public_key = CompressedPublicKey(bitcoin::secp256k1::PublicKey::from_secret_key(
            &secp,
            &private_key.inner,
        ));
        Ok(Self {
            private_key,
            public_key,
        })
    }

    pub fn public_key(&self) -> &CompressedPublicKey {
        &self.public_key
    }
}

impl fmt::Debug for SpendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpendKey")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl Drop for SpendKey {
    fn drop(&mut self) {
        self.private_key.inner.non_secure_erase();
    }
}

/// A fully signed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Consensus-encoded transaction.
    pub raw: Vec<u8>,
    pub txid: Txid,
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

/// Lay out a draft as a PSBT and attach one proof per input.
///
/// `proofs` must be in draft input order. Every output address must be
/// resolved and valid for `network`.
pub fn build_psbt(
    draft: &TransactionDraft,
    proofs: Vec<InputProof>,
    kind: AddressKind,
    pubkey: &CompressedPublicKey,
    network: BtcNetwork,
) -> Result<Psbt, BtcError> {
    if !draft.is_balanced() {
        return Err(BtcError::TransactionBuildError(format!(
            "draft does not balance: inputs {} sat, outputs {} sat, fee {} sat",
            draft.input_total(),
            draft.output_total(),
            draft.fee
        )));
    }
    if proofs.len() != draft.inputs.len() {
        return Err(BtcError::TransactionBuildError(format!(
            "{} proofs supplied for {} inputs",
            proofs.len(),
            draft.inputs.len()
        )));
    }

    let inputs = draft
        .inputs
        .iter()
        .map(|input| TxIn {
            previous_output: OutPoint::new(input.txid, input.vout),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::default(),
        })
        .collect();

    let mut outputs = Vec::with_capacity(draft.outputs.len());
    for (index, output) in draft.outputs.iter().enumerate() {
        let address = output.address.as_deref().ok_or_else(|| {
            BtcError::TransactionBuildError(format!("output {index} has no address"))
        })?;
        outputs.push(TxOut {
            value: Amount::from_sat(output.value),
            script_pubkey: parse_address(address, network)?.script_pubkey(),
        });
    }

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    };
    let mut psbt = Psbt::from_unsigned_tx(tx)
        .map_err(|e| BtcError::TransactionBuildError(format!("psbt: {e}")))?;

    for (index, (proof, input)) in proofs.into_iter().zip(&draft.inputs).enumerate() {
        let psbt_input = &mut psbt.inputs[index];
        match proof {
            InputProof::Witness(txout) => {
                if !kind.is_witness() {
                    return Err(BtcError::TransactionBuildError(format!(
                        "input {index}: {kind} inputs need the previous transaction"
                    )));
                }
                psbt_input.witness_utxo = Some(txout);
                psbt_input.redeem_script = kind.redeem_script(pubkey);
            }
            InputProof::NonWitness(prev_tx) => {
                check_previous_transaction(index, input, &prev_tx)?;
                psbt_input.non_witness_utxo = Some(prev_tx);
            }
        }
    }

    Ok(psbt)
}

fn check_previous_transaction(
    index: usize,
    input: &DraftInput,
    prev_tx: &Transaction,
) -> Result<(), BtcError> {
    let txid = prev_tx.compute_txid();
    if txid != input.txid {
        return Err(BtcError::TransactionBuildError(format!(
            "input {index}: previous transaction hashes to {txid}, expected {}",
            input.txid
        )));
    }
    let spent = prev_tx.output.get(input.vout as usize).ok_or_else(|| {
        BtcError::TransactionBuildError(format!(
            "input {index}: {} has no output {}",
            input.txid, input.vout
        ))
    })?;
    if spent.value.to_sat() != input.value {
        return Err(BtcError::TransactionBuildError(format!(
            "input {index}: output is worth {} sat, draft says {} sat",
            spent.value.to_sat(),
            input.value
        )));
    }
    Ok(())
}

/// The output an input spends, taken from whichever proof it carries.
fn spent_output(input: &psbt::Input, outpoint: OutPoint) -> Result<TxOut, BtcError> {
    if let Some(txout) = &input.witness_utxo {
        return Ok(txout.clone());
    }
    if let Some(prev_tx) = &input.non_witness_utxo {
        if prev_tx.compute_txid() != outpoint.txid {
            return Err(BtcError::InvalidSignature(format!(
                "previous transaction does not match outpoint {outpoint}"
            )));
        }
        return prev_tx
            .output
            .get(outpoint.vout as usize)
            .cloned()
            .ok_or_else(|| {
                BtcError::InvalidSignature(format!("outpoint {outpoint} does not exist"))
            });
    }
    Err(BtcError::SigningError(format!(
        "no proof attached for outpoint {outpoint}"
    )))
}

fn input_sighash(
    cache: &mut SighashCache<&Transaction>,
    index: usize,
    prevout: &TxOut,
    kind: AddressKind,
    pubkey: &CompressedPublicKey,
) -> Result<Message, BtcError> {
    let digest = match kind {
        AddressKind::P2pkh => cache
            .legacy_signature_hash(index, &prevout.script_pubkey, EcdsaSighashType::All.to_u32())
            .map_err(|e| BtcError::SigningError(format!("input {index}: sighash: {e}")))?
            .to_byte_array(),
        AddressKind::P2shP2wpkh | AddressKind::P2wpkh => {
            let script_code = ScriptBuf::new_p2wpkh(&pubkey.wpubkey_hash());
            cache
                .p2wpkh_signature_hash(index, &script_code, prevout.value, EcdsaSighashType::All)
                .map_err(|e| BtcError::SigningError(format!("input {index}: sighash: {e}")))?
                .to_byte_array()
        }
    };
    Ok(Message::from_digest(digest))
}

/// Sign every input with `key`. All inputs must be locked to `kind`'s
/// script for that key.
pub fn sign_psbt(psbt: &mut Psbt, key: &SpendKey, kind: AddressKind) -> Result<(), BtcError> {
    let secp = Secp256k1::signing_only();
    let expected_script = kind.script_pubkey(&key.public_key);
    let mut cache = SighashCache::new(&psbt.unsigned_tx);

    for (index, input) in psbt.inputs.iter_mut().enumerate() {
        let outpoint = psbt.unsigned_tx.input[index].previous_output;
        let prevout = spent_output(input, outpoint)?;
        if prevout.script_pubkey != expected_script {
            return Err(BtcError::InvalidSignature(format!(
                "input {index} is not locked to the signing key"
            )));
        }

        let msg = input_sighash(&mut cache, index, &prevout, kind, &key.public_key)?;
        let signature = secp.sign_ecdsa(&msg, &key.private_key.inner);
        input.partial_sigs.insert(
            PublicKey::from(key.public_key),
            ecdsa::Signature::sighash_all(signature),
        );
    }
    Ok(())
}

/// Check every partial signature against its public key and the sighash
/// recomputed from the transaction as it is now.
pub fn verify_psbt(psbt: &Psbt, kind: AddressKind) -> Result<(), BtcError> {
    let secp = Secp256k1::verification_only();
    let mut cache = SighashCache::new(&psbt.unsigned_tx);

    for (index, input) in psbt.inputs.iter().enumerate() {
        if input.partial_sigs.is_empty() {
            return Err(BtcError::InvalidSignature(format!(
                "input {index} carries no signature"
            )));
        }
        let outpoint = psbt.unsigned_tx.input[index].previous_output;
        let prevout = spent_output(input, outpoint)?;

        for (pk, sig) in &input.partial_sigs {
            let pubkey = CompressedPublicKey::try_from(*pk).map_err(|_| {
                BtcError::InvalidSignature(format!("input {index}: uncompressed public key"))
            })?;
            if prevout.script_pubkey != kind.script_pubkey(&pubkey) {
                return Err(BtcError::InvalidSignature(format!(
                    "input {index}: key does not match the spent script"
                )));
            }
            let msg = input_sighash(&mut cache, index, &prevout, kind, &pubkey)?;
            secp.verify_ecdsa(&msg, &sig.signature, &pk.inner)
                .map_err(|e| BtcError::InvalidSignature(format!("input {index}: {e}")))?;
        }
    }
    Ok(())
}

fn push_bytes(data: Vec<u8>) -> Result<PushBytesBuf, BtcError> {
    PushBytesBuf::try_from(data)
        .map_err(|e| BtcError::TransactionBuildError(format!("script push: {e}")))
}

/// Turn partial signatures into final unlocking data and extract the
/// network transaction.
pub fn finalize_psbt(mut psbt: Psbt, kind: AddressKind) -> Result<SignedTransaction, BtcError> {
    for (index, input) in psbt.inputs.iter_mut().enumerate() {
        let (pk, sig) = input
            .partial_sigs
            .iter()
            .next()
            .map(|(pk, sig)| (*pk, *sig))
            .ok_or_else(|| BtcError::SigningError(format!("input {index} is unsigned")))?;

        match kind {
            AddressKind::P2pkh => {
                let script_sig = Builder::new()
                    .push_slice(push_bytes(sig.to_vec())?)
                    .push_key(&pk)
                    .into_script();
                input.final_script_sig = Some(script_sig);
            }
            AddressKind::P2wpkh => {
                input.final_script_witness = Some(Witness::p2wpkh(&sig, &pk.inner));
            }
            AddressKind::P2shP2wpkh => {
                let redeem = input.redeem_script.take().ok_or_else(|| {
                    BtcError::SigningError(format!("input {index} has no redeem script"))
                })?;
                let script_sig = Builder::new()
                    .push_slice(push_bytes(redeem.into_bytes())?)
                    .into_script();
                input.final_script_sig = Some(script_sig);
                input.final_script_witness = Some(Witness::p2wpkh(&sig, &pk.inner));
            }
        }

        input.partial_sigs.clear();
        input.sighash_type = None;
        input.redeem_script = None;
        input.bip32_derivation.clear();
    }

    let tx = psbt
        .extract_tx()
        .map_err(|e| BtcError::TransactionBuildError(format!("extract: {e}")))?;

    Ok(SignedTransaction {
        raw: serialize(&tx),
        txid: tx.compute_txid(),
    })
}
