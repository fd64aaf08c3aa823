//! Spend request → unsigned draft.

use std::sync::Arc;

use bitcoin::Amount;
use chain_btc::address::parse_address;
use chain_btc::registry::AddressTypeRegistry;
use chain_btc::transaction::TransactionDraft;
use chain_btc::utxo::{confirmed_only, select_utxos, PaymentTarget, SelectionParams};
use chain_client::ChainStateAdapter;
use tracing::{debug, info};

use crate::error::WalletError;

#[derive(Clone)]
pub struct TransactionAssembler {
    adapter: ChainStateAdapter,
    registry: Arc<AddressTypeRegistry>,
    fee_target_blocks: u16,
}

impl TransactionAssembler {
    pub fn new(adapter: ChainStateAdapter, registry: Arc<AddressTypeRegistry>, fee_target_blocks: u16) -> Self {
        Self {
            adapter,
            registry,
            fee_target_blocks,
        }
    }

    /// Select confirmed UTXOs of `from` paying `amount` to `to`.
    ///
    /// Change goes to `change`, or back to `from` when none is given.
    pub async fn prepare(
        &self,
        from: &str,
        to: &str,
        change: Option<&str>,
        amount: Amount,
    ) -> Result<TransactionDraft, WalletError> {
        let network = self.registry.network();
        let source = self.registry.classify(from)?;
        let source_kind = source.name;
        let destination = parse_address(to, network)?;
        let change_address = change.unwrap_or(from);
        let change_script = parse_address(change_address, network)?.script_pubkey();

        let fee_rate = self.adapter.estimate_fee_rate(self.fee_target_blocks).await?;

        let script_hash = self.adapter.script_hash_of(from)?;
        let all_utxos = self.adapter.list_unspent(script_hash).await?;
        let total = all_utxos.len();
        let utxos = confirmed_only(all_utxos);
        debug!(
            address = from,
            confirmed = utxos.len(),
            unconfirmed = total - utxos.len(),
            "listed utxos"
        );

        let target = PaymentTarget {
            address: to.to_string(),
            script_pubkey: destination.script_pubkey(),
            amount_sat: amount.to_sat(),
        };
        let params = SelectionParams {
            fee_rate_sat_vb: fee_rate,
            input_kind: source_kind,
            change_script_len: change_script.len(),
        };
        let selection = select_utxos(&utxos, &target, &params)?;

        let mut draft = TransactionDraft::from_selection(selection);
        draft.resolve_change(change_address);

        info!(
            from,
            to,
            amount_sat = amount.to_sat(),
            inputs = draft.inputs.len(),
            outputs = draft.outputs.len(),
            fee = draft.fee,
            fee_rate,
            "transaction drafted"
        );
        Ok(draft)
    }
}
