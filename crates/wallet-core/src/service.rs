//! The inbound surface: one method per wallet operation.

use std::sync::Arc;

use bitcoin::Amount;
use chain_btc::address::AddressKind;
use chain_btc::registry::AddressTypeRegistry;
use chain_btc::transaction::TransactionDraft;
use chain_client::bitcoind::BitcoindFeeEstimator;
use chain_client::electrum::ElectrumIndex;
use chain_client::ChainStateAdapter;
use secrecy::SecretString;
use serde_json::Value;
use tracing::info;

use crate::assembler::TransactionAssembler;
use crate::config::BtcSettings;
use crate::deriver::Deriver;
use crate::error::WalletError;
use crate::orchestrator::SendOrchestrator;
use crate::signer::Signer;
use crate::types::{BroadcastResult, SendResult, Wallet, WalletSummary};

#[derive(Clone)]
pub struct WalletService {
    registry: Arc<AddressTypeRegistry>,
    adapter: ChainStateAdapter,
    deriver: Deriver,
    assembler: TransactionAssembler,
    orchestrator: SendOrchestrator,
}

impl WalletService {
    /// Wire the components around an adapter. The registry and the adapter
    /// must agree on the network.
    pub fn new(
        registry: AddressTypeRegistry,
        adapter: ChainStateAdapter,
        fee_target_blocks: u16,
    ) -> Result<Self, WalletError> {
        if registry.network() != adapter.network() {
            return Err(WalletError::Config(format!(
                "address types are for {} but the backends are {}",
                registry.network(),
                adapter.network()
            )));
        }
        let registry = Arc::new(registry);
        let assembler = TransactionAssembler::new(adapter.clone(), registry.clone(), fee_target_blocks);
        let signer = Signer::new(adapter.clone(), registry.clone());
        let orchestrator = SendOrchestrator::new(assembler.clone(), signer, adapter.clone());
        Ok(Self {
            deriver: Deriver::new(registry.clone()),
            registry,
            adapter,
            assembler,
            orchestrator,
        })
    }

    /// Connect to the configured Electrum server and bitcoind node.
    pub fn connect(settings: &BtcSettings) -> Result<Self, WalletError> {
        let timeout_secs = u8::try_from(settings.request_timeout.as_secs()).unwrap_or(u8::MAX);
        let index = ElectrumIndex::connect(
            settings.electrum_url(),
            settings.electrum.validate_domain,
            timeout_secs,
        )?;
        let fees = BitcoindFeeEstimator::new(
            &settings.bitcoind.url,
            &settings.bitcoind.rpc_user,
            &settings.bitcoind.rpc_pass,
        )?;
        let adapter = ChainStateAdapter::new(Arc::new(index), Arc::new(fees), settings.network)
            .with_deadline(settings.request_timeout);
        info!(
            network = %settings.network,
            electrum = settings.electrum_url(),
            bitcoind = %settings.bitcoind.url,
            "chain backends configured"
        );
        Self::new(settings.registry()?, adapter, settings.fee_target_blocks)
    }

    pub fn registry(&self) -> &AddressTypeRegistry {
        &self.registry
    }

    pub fn create_wallet(&self, address_type: Option<AddressKind>) -> Result<Wallet, WalletError> {
        self.deriver.generate(address_type)
    }

    /// Checks the phrase before any derivation happens.
    pub fn import_wallet(&self, phrase: &str, address_type: Option<AddressKind>) -> Result<Wallet, WalletError> {
        self.deriver.derive(phrase, address_type)
    }

    pub async fn get_wallet(&self, address: &str) -> Result<WalletSummary, WalletError> {
        let address_type = self.registry.classify(address)?.name;
        let script_hash = self.adapter.script_hash_of(address)?;
        let balance = self.adapter.get_balance(script_hash).await?;
        Ok(WalletSummary {
            address: address.to_string(),
            address_type,
            balance: balance.into(),
        })
    }

    /// Verbose transaction records, newest first.
    pub async fn get_history(&self, address: &str) -> Result<Vec<Value>, WalletError> {
        let script_hash = self.adapter.script_hash_of(address)?;
        Ok(self.adapter.get_detailed_history(script_hash).await?)
    }

    pub async fn prepare_transaction(
        &self,
        from: &str,
        to: &str,
        change: Option<&str>,
        amount: Amount,
    ) -> Result<TransactionDraft, WalletError> {
        self.assembler.prepare(from, to, change, amount).await
    }

    pub async fn broadcast_transaction(&self, raw_hex: &str) -> Result<BroadcastResult, WalletError> {
        let raw = hex::decode(raw_hex.trim())
            .map_err(|e| WalletError::TransactionFailed(format!("raw transaction is not hex: {e}")))?;
        if raw.is_empty() {
            return Err(WalletError::TransactionFailed("raw transaction is empty".into()));
        }
        let txid = self.adapter.broadcast(raw).await?;
        info!(%txid, "raw transaction broadcast");
        Ok(BroadcastResult::default())
    }

    pub async fn send(
        &self,
        private_key: &SecretString,
        from: &str,
        to: &str,
        change: Option<&str>,
        amount: Amount,
    ) -> Result<SendResult, WalletError> {
        self.orchestrator.send(private_key, from, to, change, amount).await
    }
}
