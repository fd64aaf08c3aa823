use bitcoin::script::ScriptBuf;
use bitcoin::Txid;
use serde::{Deserialize, Serialize};

use crate::address::AddressKind;
use crate::error::BtcError;

/// Smallest payment the selector will build an output for (in satoshis).
pub const DUST_LIMIT_SAT: u64 = 546;

/// A single unspent transaction output (UTXO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Transaction ID (display order).
    pub txid: Txid,
    /// Output index within the transaction.
    pub vout: u32,
    /// Value in satoshis.
    pub amount_sat: u64,
    /// Confirmation height; zero or negative while in the mempool.
    pub height: i64,
}

impl Utxo {
    /// Only confirmed outputs may be spent.
    pub fn is_confirmed(&self) -> bool {
        self.height > 0
    }
}

/// Drop every output that has not been mined yet.
pub fn confirmed_only(utxos: Vec<Utxo>) -> Vec<Utxo> {
    utxos.into_iter().filter(Utxo::is_confirmed).collect()
}

/// The payment the selection has to fund.
#[derive(Debug, Clone)]
pub struct PaymentTarget {
    pub address: String,
    pub script_pubkey: ScriptBuf,
    pub amount_sat: u64,
}

/// Fee and size parameters for one selection run.
#[derive(Debug, Clone, Copy)]
pub struct SelectionParams {
    pub fee_rate_sat_vb: u64,
    /// Kind of the address whose UTXOs are spent; sets the input size.
    pub input_kind: AddressKind,
    /// Length of the change output's locking script.
    pub change_script_len: usize,
}

impl SelectionParams {
    fn input_vbytes(&self) -> u64 {
        self.input_kind.input_vbytes()
    }

    fn change_vbytes(&self) -> u64 {
        output_vbytes(self.change_script_len)
    }

    /// Change below this is cheaper to give to miners than to spend later.
    fn dust_threshold(&self) -> u64 {
        self.fee_rate_sat_vb * self.input_vbytes()
    }
}

/// An output chosen by the selector. `address: None` marks change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedOutput {
    pub address: Option<String>,
    pub amount_sat: u64,
}

/// Result of UTXO selection.
///
/// `fee` is always `Σ inputs − Σ outputs`. With a change output it equals
/// `fee_rate × vsize`; without one it also absorbs the sub-dust remainder.
#[derive(Debug, Clone)]
pub struct CoinSelection {
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<SelectedOutput>,
    pub fee: u64,
    pub vsize: u64,
}

impl CoinSelection {
    pub fn input_total(&self) -> u64 {
        self.inputs.iter().map(|u| u.amount_sat).sum()
    }

    pub fn output_total(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount_sat).sum()
    }

    pub fn has_change(&self) -> bool {
        self.outputs.iter().any(|o| o.address.is_none())
    }
}

/// Value, script length prefix and script.
fn output_vbytes(script_len: usize) -> u64 {
    8 + 1 + script_len as u64
}

/// Select UTXOs to pay `target` at `params.fee_rate_sat_vb`.
///
/// Candidates are ordered by value net of their own input fee. A first
/// pass looks for a set that covers the payment without leaving change
/// worth keeping; failing that, inputs are accumulated in order until the
/// payment and fee are covered, and the remainder becomes change.
pub fn select_utxos(
    utxos: &[Utxo],
    target: &PaymentTarget,
    params: &SelectionParams,
) -> Result<CoinSelection, BtcError> {
    if utxos.is_empty() {
        return Err(BtcError::InsufficientFunds("no UTXOs available".into()));
    }
    if target.amount_sat < DUST_LIMIT_SAT {
        return Err(BtcError::InsufficientFunds(format!(
            "amount {} sat is below the dust limit of {DUST_LIMIT_SAT} sat",
            target.amount_sat
        )));
    }

    let input_fee = params.fee_rate_sat_vb * params.input_vbytes();
    let mut sorted: Vec<&Utxo> = utxos.iter().collect();
    sorted.sort_by_key(|u| std::cmp::Reverse(i128::from(u.amount_sat) - i128::from(input_fee)));

    let base_vbytes =
        params.input_kind.tx_overhead_vbytes() + output_vbytes(target.script_pubkey.len());

    if let Some(selection) = select_without_change(&sorted, target, params, base_vbytes) {
        return Ok(selection);
    }
    if let Some(selection) = select_accumulative(&sorted, target, params, base_vbytes) {
        return Ok(selection);
    }

    let available: u64 = utxos.iter().map(|u| u.amount_sat).sum();
    let min_fee = params.fee_rate_sat_vb * (base_vbytes + params.input_vbytes());
    Err(BtcError::InsufficientFunds(format!(
        "have {available} sat, need at least {} sat (amount {} + fee {min_fee})",
        target.amount_sat.saturating_add(min_fee),
        target.amount_sat,
    )))
}

fn select_without_change(
    sorted: &[&Utxo],
    target: &PaymentTarget,
    params: &SelectionParams,
    base_vbytes: u64,
) -> Option<CoinSelection> {
    let mut vbytes = base_vbytes;
    let mut in_total: u64 = 0;
    let mut inputs = Vec::new();
    let threshold = params.dust_threshold();

    for utxo in sorted {
        let fee = params.fee_rate_sat_vb * (vbytes + params.input_vbytes());
        // Overshooting would leave change; that is the accumulative pass' job.
        if in_total.saturating_add(utxo.amount_sat)
            > target.amount_sat.saturating_add(fee).saturating_add(threshold)
        {
            continue;
        }

        vbytes += params.input_vbytes();
        in_total += utxo.amount_sat;
        inputs.push((*utxo).clone());

        if in_total < target.amount_sat.saturating_add(fee) {
            continue;
        }
        return Some(finalize(inputs, target, params, vbytes));
    }
    None
}

fn select_accumulative(
    sorted: &[&Utxo],
    target: &PaymentTarget,
    params: &SelectionParams,
    base_vbytes: u64,
) -> Option<CoinSelection> {
    let mut vbytes = base_vbytes;
    let mut in_total: u64 = 0;
    let mut inputs = Vec::new();
    let input_fee = params.fee_rate_sat_vb * params.input_vbytes();

    for utxo in sorted {
        // Costs more to spend than it is worth.
        if input_fee > utxo.amount_sat {
            continue;
        }

        vbytes += params.input_vbytes();
        in_total = in_total.saturating_add(utxo.amount_sat);
        inputs.push((*utxo).clone());

        let fee = params.fee_rate_sat_vb * vbytes;
        if in_total < target.amount_sat.saturating_add(fee) {
            continue;
        }
        return Some(finalize(inputs, target, params, vbytes));
    }
    None
}

fn finalize(
    inputs: Vec<Utxo>,
    target: &PaymentTarget,
    params: &SelectionParams,
    vbytes: u64,
) -> CoinSelection {
    let in_total: u64 = inputs.iter().map(|u| u.amount_sat).sum();
    let mut outputs = vec![SelectedOutput {
        address: Some(target.address.clone()),
        amount_sat: target.amount_sat,
    }];
    let mut vsize = vbytes;

    let fee_with_change = params.fee_rate_sat_vb * (vbytes + params.change_vbytes());
    let remainder = i128::from(in_total)
        - i128::from(target.amount_sat)
        - i128::from(fee_with_change);
    if remainder > i128::from(params.dust_threshold()) {
        outputs.push(SelectedOutput {
            address: None,
            amount_sat: remainder as u64,
        });
        vsize += params.change_vbytes();
    }

    let out_total: u64 = outputs.iter().map(|o| o.amount_sat).sum();
    CoinSelection {
        inputs,
        outputs,
        fee: in_total - out_total,
        vsize,
    }
}
