//! bitcoind JSON-RPC implementation of [`FeeEstimator`].

use std::sync::Arc;

use async_trait::async_trait;
use bitcoincore_rpc::json::EstimateSmartFeeResult;
use bitcoincore_rpc::{Auth, Client, RpcApi};
use secrecy::{ExposeSecret, SecretString};

use crate::backend::{FeeEstimate, FeeEstimator};
use crate::error::BackendError;

#[derive(Clone)]
pub struct BitcoindFeeEstimator {
    client: Arc<Client>,
}

impl BitcoindFeeEstimator {
    /// The RPC client connects lazily; this never touches the network.
    pub fn new(url: &str, rpc_user: &str, rpc_pass: &SecretString) -> Result<Self, BackendError> {
        let auth = Auth::UserPass(rpc_user.to_string(), rpc_pass.expose_secret().to_string());
        let client = Client::new(url, auth)
            .map_err(|e| BackendError::Unavailable(format!("bitcoind {url}: {e}")))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

impl From<EstimateSmartFeeResult> for FeeEstimate {
    fn from(result: EstimateSmartFeeResult) -> Self {
        FeeEstimate {
            sat_per_kvb: result.fee_rate.map(|rate| rate.to_sat()),
            errors: result.errors.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl FeeEstimator for BitcoindFeeEstimator {
    async fn estimate_smart_fee(&self, target_blocks: u16) -> Result<FeeEstimate, BackendError> {
        let client = self.client.clone();
        let result = tokio::task::spawn_blocking(move || client.estimate_smart_fee(target_blocks, None))
            .await
            .map_err(|e| BackendError::Unavailable(format!("estimatesmartfee task: {e}")))?
            .map_err(|e| BackendError::Unavailable(format!("estimatesmartfee: {e}")))?;
        Ok(result.into())
    }
}
