//! In-memory stand-ins for the index service and the node.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Transaction, TxIn, TxOut, Txid};
use chain_btc::address::{parse_address, script_hash, ScriptHash};
use chain_btc::network::BtcNetwork;
use chain_btc::registry::AddressTypeRegistry;
use chain_btc::utxo::Utxo;
use chain_client::{
    Balance, BackendError, ChainStateAdapter, FeeEstimate, FeeEstimator, HistoryEntry,
    ScriptHashIndex,
};
use serde_json::{json, Value};
use wallet_core::WalletService;

pub const SEGWIT_PHRASE: &str =
    "october eager misery laptop shop boost long abandon fan junior desert legend";
pub const SEGWIT_ADDRESS: &str = "bcrt1q8yu68tvmqrxtn528vujhz96x9zxfnmhhn9j78x";
pub const SEGWIT_WIF: &str = "cTuc3sRj3jhYMorfAj9TkyKYQ7BXQyUzqfHM9R4Yawhh1FpCtGgM";

pub const LEGACY_PHRASE: &str =
    "mutual response neither patient mouse pride pledge angle few stem practice snack";
pub const LEGACY_ADDRESS: &str = "mus1omSG8Dxy7KxEBZ1i21sH8juWKZJ8h9";
pub const LEGACY_WIF: &str = "cPPm59wuD9oUS8R1w1hVhTKKxFfdoLKotg4TFkTmLqZL2vQuCAZp";

pub struct MemoryIndex {
    network: BtcNetwork,
    funded: usize,
    utxos: HashMap<ScriptHash, Vec<Utxo>>,
    transactions: HashMap<Txid, Transaction>,
    pub balance: Balance,
    pub history: Vec<HistoryEntry>,
    /// Per-position delay so older entries answer later.
    pub detail_delay: Duration,
    pub reject_broadcast: bool,
    pub broadcasts: Mutex<Vec<Vec<u8>>>,
    pub raw_fetches: AtomicUsize,
}

impl MemoryIndex {
    pub fn new(network: BtcNetwork) -> Self {
        Self {
            network,
            funded: 0,
            utxos: HashMap::new(),
            transactions: HashMap::new(),
            balance: Balance::default(),
            history: Vec::new(),
            detail_delay: Duration::ZERO,
            reject_broadcast: false,
            broadcasts: Mutex::new(Vec::new()),
            raw_fetches: AtomicUsize::new(0),
        }
    }

    /// Record a transaction paying `value` to `address` and list its
    /// output as unspent at `height`.
    pub fn fund(&mut self, address: &str, value: u64, height: i64) -> Txid {
        self.funded += 1;
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::from_byte_array([self.funded as u8; 32]), 0),
                ..Default::default()
            }],
            output: vec![TxOut {
                value: Amount::from_sat(value),
                script_pubkey: parse_address(address, self.network).unwrap().script_pubkey(),
            }],
        };
        let txid = tx.compute_txid();
        self.transactions.insert(txid, tx);
        self.utxos
            .entry(script_hash(address, self.network).unwrap())
            .or_default()
            .push(Utxo {
                txid,
                vout: 0,
                amount_sat: value,
                height,
            });
        txid
    }

    pub fn raw_transaction_hex(&self, txid: Txid) -> String {
        bitcoin::consensus::encode::serialize_hex(&self.transactions[&txid])
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }

    pub fn last_broadcast(&self) -> Option<Transaction> {
        self.broadcasts
            .lock()
            .unwrap()
            .last()
            .map(|raw| bitcoin::consensus::deserialize(raw).unwrap())
    }
}

#[async_trait]
impl ScriptHashIndex for MemoryIndex {
    async fn balance(&self, _: ScriptHash) -> Result<Balance, BackendError> {
        Ok(self.balance)
    }

    async fn history(&self, _: ScriptHash) -> Result<Vec<HistoryEntry>, BackendError> {
        Ok(self.history.clone())
    }

    async fn list_unspent(&self, script_hash: ScriptHash) -> Result<Vec<Utxo>, BackendError> {
        Ok(self.utxos.get(&script_hash).cloned().unwrap_or_default())
    }

    async fn transaction_detail(&self, txid: Txid) -> Result<Value, BackendError> {
        let position = self
            .history
            .iter()
            .position(|entry| entry.tx_hash == txid)
            .ok_or_else(|| BackendError::InvalidResponse(format!("unknown {txid}")))?;
        tokio::time::sleep(self.detail_delay * (self.history.len() - position) as u32).await;
        Ok(json!({ "txid": txid.to_string(), "height": self.history[position].height }))
    }

    async fn raw_transaction(&self, txid: Txid) -> Result<Vec<u8>, BackendError> {
        self.raw_fetches.fetch_add(1, Ordering::SeqCst);
        self.transactions
            .get(&txid)
            .map(bitcoin::consensus::serialize)
            .ok_or_else(|| BackendError::InvalidResponse(format!("unknown {txid}")))
    }

    async fn broadcast(&self, raw_tx: Vec<u8>) -> Result<Txid, BackendError> {
        if self.reject_broadcast {
            return Err(BackendError::BroadcastFailed("bad-txns-inputs-missingorspent".into()));
        }
        let tx: Transaction = bitcoin::consensus::deserialize(&raw_tx)
            .map_err(|e| BackendError::BroadcastFailed(format!("decode failed: {e}")))?;
        self.broadcasts.lock().unwrap().push(raw_tx);
        Ok(tx.compute_txid())
    }
}

/// Answers every estimate with the same result. `Err` simulates a
/// transport failure.
pub struct FixedFees {
    pub estimate: Result<FeeEstimate, String>,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FixedFees {
    pub fn sat_per_kvb(rate: u64) -> Self {
        Self::with(Ok(FeeEstimate::from_sat_per_kvb(rate)))
    }

    pub fn node_error() -> Self {
        Self::with(Ok(FeeEstimate::failed("Insufficient data or no feerate found")))
    }

    pub fn unreachable() -> Self {
        Self::with(Err("connection refused".into()))
    }

    fn with(estimate: Result<FeeEstimate, String>) -> Self {
        Self {
            estimate,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FeeEstimator for FixedFees {
    async fn estimate_smart_fee(&self, _: u16) -> Result<FeeEstimate, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.estimate.clone().map_err(BackendError::Unavailable)
    }
}

pub fn service(index: &Arc<MemoryIndex>, fees: &Arc<FixedFees>, network: BtcNetwork) -> WalletService {
    let adapter = ChainStateAdapter::new(index.clone(), fees.clone(), network);
    WalletService::new(AddressTypeRegistry::for_network(network), adapter, 1).unwrap()
}

pub fn secret(wif: &str) -> secrecy::SecretString {
    secrecy::SecretString::from(wif.to_string())
}
