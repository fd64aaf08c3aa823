//! One façade over the index service and the node.
//!
//! Both collaborators are injected, so tests swap in in-memory doubles.
//! Every remote call is bounded by the adapter's deadline; expiry is a
//! [`BackendError::Timeout`], never a partial result.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bitcoin::consensus::encode::deserialize;
use bitcoin::{Transaction, Txid};
use chain_btc::address::{script_hash, ScriptHash};
use chain_btc::error::BtcError;
use chain_btc::network::BtcNetwork;
use chain_btc::utxo::Utxo;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{Balance, FeeEstimator, HistoryEntry, ScriptHashIndex};
use crate::error::BackendError;
use crate::fanout::fetch_ordered;

/// Rate used off mainnet when the node cannot estimate (sat/vB).
pub const FALLBACK_FEE_RATE_SAT_VB: u64 = 1;

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ChainStateAdapter {
    index: Arc<dyn ScriptHashIndex>,
    fees: Arc<dyn FeeEstimator>,
    network: BtcNetwork,
    deadline: Duration,
}

async fn bounded<T>(
    deadline: Duration,
    call: &str,
    fut: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| BackendError::Timeout(format!("{call} exceeded {deadline:?}")))?
}

impl ChainStateAdapter {
    pub fn new(index: Arc<dyn ScriptHashIndex>, fees: Arc<dyn FeeEstimator>, network: BtcNetwork) -> Self {
        Self {
            index,
            fees,
            network,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn network(&self) -> BtcNetwork {
        self.network
    }

    /// Index key for `address`. Pure; no remote call.
    pub fn script_hash_of(&self, address: &str) -> Result<ScriptHash, BtcError> {
        script_hash(address, self.network)
    }

    pub async fn get_balance(&self, script_hash: ScriptHash) -> Result<Balance, BackendError> {
        bounded(self.deadline, "get_balance", self.index.balance(script_hash)).await
    }

    /// History, newest first.
    pub async fn get_history(&self, script_hash: ScriptHash) -> Result<Vec<HistoryEntry>, BackendError> {
        let mut history = bounded(self.deadline, "get_history", self.index.history(script_hash)).await?;
        history.reverse();
        Ok(history)
    }

    /// Verbose records for every history entry, newest first. The detail
    /// lookups run concurrently.
    pub async fn get_detailed_history(&self, script_hash: ScriptHash) -> Result<Vec<Value>, BackendError> {
        let txids: Vec<Txid> = self
            .get_history(script_hash)
            .await?
            .into_iter()
            .map(|entry| entry.tx_hash)
            .collect();
        debug!(script_hash = %script_hash, count = txids.len(), "fetching transaction details");

        let index = self.index.clone();
        let details = fetch_ordered(txids, move |txid| {
            let index = index.clone();
            async move { index.transaction_detail(txid).await }
        });
        bounded(self.deadline, "get_detailed_history", details).await
    }

    /// Every UTXO the index knows about, confirmed or not.
    pub async fn list_unspent(&self, script_hash: ScriptHash) -> Result<Vec<Utxo>, BackendError> {
        bounded(self.deadline, "list_unspent", self.index.list_unspent(script_hash)).await
    }

    /// Fee rate in sat/vB for confirmation within `target_blocks`.
    ///
    /// When the node reports an estimation error, non-production networks
    /// fall back to [`FALLBACK_FEE_RATE_SAT_VB`]; mainnet fails with
    /// [`BackendError::FeeEstimationUnavailable`]. Transport failures are
    /// never covered by the fallback.
    pub async fn estimate_fee_rate(&self, target_blocks: u16) -> Result<u64, BackendError> {
        let estimate = bounded(
            self.deadline,
            "estimate_fee_rate",
            self.fees.estimate_smart_fee(target_blocks),
        )
        .await?;

        if let Some(rate) = estimate.sat_per_vbyte() {
            debug!(target_blocks, fee_rate = rate, "fee rate estimated");
            return Ok(rate);
        }

        let reason = if estimate.errors.is_empty() {
            "node returned no fee rate".to_string()
        } else {
            estimate.errors.join("; ")
        };
        if self.network.is_production() {
            return Err(BackendError::FeeEstimationUnavailable(reason));
        }
        warn!(
            network = %self.network,
            reason = %reason,
            fee_rate = FALLBACK_FEE_RATE_SAT_VB,
            "fee estimation failed, using fallback rate"
        );
        Ok(FALLBACK_FEE_RATE_SAT_VB)
    }

    /// Fetch and decode the given transactions concurrently, in `txids`
    /// order.
    pub async fn get_transactions(&self, txids: Vec<Txid>) -> Result<Vec<Transaction>, BackendError> {
        let index = self.index.clone();
        let fetches = fetch_ordered(txids, move |txid| {
            let index = index.clone();
            async move {
                let raw = index.raw_transaction(txid).await?;
                deserialize::<Transaction>(&raw)
                    .map_err(|e| BackendError::InvalidResponse(format!("transaction {txid}: {e}")))
            }
        });
        bounded(self.deadline, "get_transactions", fetches).await
    }

    /// Submit a serialized transaction. Rejection is surfaced as
    /// [`BackendError::BroadcastFailed`].
    pub async fn broadcast(&self, raw_tx: Vec<u8>) -> Result<Txid, BackendError> {
        let txid = bounded(self.deadline, "broadcast", self.index.broadcast(raw_tx)).await?;
        debug!(%txid, "transaction broadcast");
        Ok(txid)
    }
}
