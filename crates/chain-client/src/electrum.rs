//! Electrum (ElectrumX / electrs) implementation of [`ScriptHashIndex`].

use std::sync::Arc;

use async_trait::async_trait;
use bdk_electrum::electrum_client::{self, Client, ConfigBuilder, ElectrumApi, Param};
use bitcoin::Txid;
use chain_btc::address::ScriptHash;
use chain_btc::utxo::Utxo;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::backend::{Balance, HistoryEntry, ScriptHashIndex};
use crate::error::BackendError;

const GET_BALANCE: &str = "blockchain.scripthash.get_balance";
const GET_HISTORY: &str = "blockchain.scripthash.get_history";
const LIST_UNSPENT: &str = "blockchain.scripthash.listunspent";
const TRANSACTION_GET: &str = "blockchain.transaction.get";
const TRANSACTION_BROADCAST: &str = "blockchain.transaction.broadcast";

/// Connection to an Electrum server. The client is blocking, so every call
/// runs on the blocking thread pool.
#[derive(Clone)]
pub struct ElectrumIndex {
    client: Arc<Client>,
}

impl ElectrumIndex {
    /// Connect to `url` (`ssl://host:port` or `tcp://host:port`).
    ///
    /// Blocks until the connection is established.
    pub fn connect(url: &str, validate_domain: bool, timeout_secs: u8) -> Result<Self, BackendError> {
        let config = ConfigBuilder::new()
            .validate_domain(validate_domain)
            .timeout(Some(timeout_secs))
            .build();
        let client = Client::from_config(url, config)
            .map_err(|e| BackendError::Unavailable(format!("electrum {url}: {e}")))?;
        debug!(url, "connected to electrum server");
        Ok(Self {
            client: Arc::new(client),
        })
    }

    async fn call(&self, method: &'static str, params: Vec<Param>) -> Result<Value, electrum_client::Error> {
        let client = self.client.clone();
        match tokio::task::spawn_blocking(move || client.raw_call(method, params)).await {
            Ok(result) => result,
            Err(e) => Err(electrum_client::Error::Message(format!("{method} task: {e}"))),
        }
    }

    async fn query<T: DeserializeOwned>(&self, method: &'static str, params: Vec<Param>) -> Result<T, BackendError> {
        let value = self
            .call(method, params)
            .await
            .map_err(|e| BackendError::Unavailable(format!("{method}: {e}")))?;
        decode(method, value)
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::InvalidResponse(format!("{method}: {e}")))
}

fn script_hash_param(script_hash: ScriptHash) -> Vec<Param> {
    vec![Param::String(script_hash.to_hex())]
}

#[derive(Debug, Deserialize)]
struct UnspentEntry {
    tx_hash: Txid,
    tx_pos: u32,
    height: i64,
    value: u64,
}

impl From<UnspentEntry> for Utxo {
    fn from(entry: UnspentEntry) -> Self {
        Utxo {
            txid: entry.tx_hash,
            vout: entry.tx_pos,
            amount_sat: entry.value,
            height: entry.height,
        }
    }
}

fn parse_unspent(value: Value) -> Result<Vec<Utxo>, BackendError> {
    let entries: Vec<UnspentEntry> = decode(LIST_UNSPENT, value)?;
    Ok(entries.into_iter().map(Utxo::from).collect())
}

fn parse_raw_transaction(value: Value) -> Result<Vec<u8>, BackendError> {
    let raw: String = decode(TRANSACTION_GET, value)?;
    hex::decode(raw.trim())
        .map_err(|e| BackendError::InvalidResponse(format!("{TRANSACTION_GET}: bad hex: {e}")))
}

fn parse_txid(value: Value) -> Result<Txid, BackendError> {
    let txid: String = decode(TRANSACTION_BROADCAST, value)?;
    txid.parse()
        .map_err(|e| BackendError::InvalidResponse(format!("{TRANSACTION_BROADCAST}: {e}")))
}

#[async_trait]
impl ScriptHashIndex for ElectrumIndex {
    async fn balance(&self, script_hash: ScriptHash) -> Result<Balance, BackendError> {
        self.query(GET_BALANCE, script_hash_param(script_hash)).await
    }

    async fn history(&self, script_hash: ScriptHash) -> Result<Vec<HistoryEntry>, BackendError> {
        self.query(GET_HISTORY, script_hash_param(script_hash)).await
    }

    async fn list_unspent(&self, script_hash: ScriptHash) -> Result<Vec<Utxo>, BackendError> {
        let value = self.query(LIST_UNSPENT, script_hash_param(script_hash)).await?;
        parse_unspent(value)
    }

    async fn transaction_detail(&self, txid: Txid) -> Result<Value, BackendError> {
        self.query(
            TRANSACTION_GET,
            vec![Param::String(txid.to_string()), Param::Bool(true)],
        )
        .await
    }

    async fn raw_transaction(&self, txid: Txid) -> Result<Vec<u8>, BackendError> {
        let value = self
            .query(TRANSACTION_GET, vec![Param::String(txid.to_string())])
            .await?;
        parse_raw_transaction(value)
    }

    async fn broadcast(&self, raw_tx: Vec<u8>) -> Result<Txid, BackendError> {
        let value = self
            .call(TRANSACTION_BROADCAST, vec![Param::String(hex::encode(raw_tx))])
            .await
            .map_err(|e| BackendError::BroadcastFailed(e.to_string()))?;
        parse_txid(value)
    }
}
