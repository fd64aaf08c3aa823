//! The two remote collaborators behind the chain state adapter.

use async_trait::async_trait;
use bitcoin::Txid;
use chain_btc::address::ScriptHash;
use chain_btc::utxo::Utxo;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Balance of one script hash in satoshis. Unconfirmed spends make
/// `unconfirmed` negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub confirmed: u64,
    pub unconfirmed: i64,
}

/// A transaction touching a script hash. Height is zero or negative while
/// the transaction sits in the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tx_hash: Txid,
    pub height: i64,
}

/// What the node said about fees for a confirmation target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeEstimate {
    /// Fee rate in satoshis per 1000 virtual bytes.
    pub sat_per_kvb: Option<u64>,
    /// Estimation errors reported by the node.
    pub errors: Vec<String>,
}

impl FeeEstimate {
    pub fn from_sat_per_kvb(sat_per_kvb: u64) -> Self {
        Self {
            sat_per_kvb: Some(sat_per_kvb),
            errors: Vec::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            sat_per_kvb: None,
            errors: vec![error.into()],
        }
    }

    /// The rate in sat/vB, rounded up and never below 1. `None` when the
    /// node could not estimate.
    pub fn sat_per_vbyte(&self) -> Option<u64> {
        if !self.errors.is_empty() {
            return None;
        }
        self.sat_per_kvb.map(|kvb| kvb.div_ceil(1000).max(1))
    }
}

/// Script-hash keyed query service (Electrum protocol).
#[async_trait]
pub trait ScriptHashIndex: Send + Sync {
    async fn balance(&self, script_hash: ScriptHash) -> Result<Balance, BackendError>;

    /// History in the order the index keeps it: oldest first.
    async fn history(&self, script_hash: ScriptHash) -> Result<Vec<HistoryEntry>, BackendError>;

    async fn list_unspent(&self, script_hash: ScriptHash) -> Result<Vec<Utxo>, BackendError>;

    /// Verbose decoded transaction.
    async fn transaction_detail(&self, txid: Txid) -> Result<serde_json::Value, BackendError>;

    /// Consensus-serialized transaction.
    async fn raw_transaction(&self, txid: Txid) -> Result<Vec<u8>, BackendError>;

    async fn broadcast(&self, raw_tx: Vec<u8>) -> Result<Txid, BackendError>;
}

/// Full-node fee estimation.
#[async_trait]
pub trait FeeEstimator: Send + Sync {
    async fn estimate_smart_fee(&self, target_blocks: u16) -> Result<FeeEstimate, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sat_per_vbyte_rounds_up() {
        assert_eq!(FeeEstimate::from_sat_per_kvb(1_001).sat_per_vbyte(), Some(2));
        assert_eq!(FeeEstimate::from_sat_per_kvb(25_000).sat_per_vbyte(), Some(25));
    }

    #[test]
    fn sat_per_vbyte_has_floor_of_one() {
        assert_eq!(FeeEstimate::from_sat_per_kvb(0).sat_per_vbyte(), Some(1));
        assert_eq!(FeeEstimate::from_sat_per_kvb(999).sat_per_vbyte(), Some(1));
    }

    #[test]
    fn errors_mean_no_rate() {
        let estimate = FeeEstimate {
            sat_per_kvb: Some(5_000),
            errors: vec!["Insufficient data or no feerate found".into()],
        };
        assert_eq!(estimate.sat_per_vbyte(), None);
        assert_eq!(FeeEstimate::default().sat_per_vbyte(), None);
    }

    #[test]
    fn balance_deserializes_negative_unconfirmed() {
        let balance: Balance =
            serde_json::from_str(r#"{"confirmed":150000,"unconfirmed":-20000}"#).unwrap();
        assert_eq!(balance.confirmed, 150_000);
        assert_eq!(balance.unconfirmed, -20_000);
    }
}
