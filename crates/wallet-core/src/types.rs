use std::fmt;

use bitcoin::{Amount, SignedAmount};
use chain_btc::address::AddressKind;
use chain_client::Balance;
use crypto_utils::ZeroizingString;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// A derived wallet, returned once to the caller and never stored.
pub struct Wallet {
    pub address: String,
    pub mnemonic: ZeroizingString,
    /// Hex-encoded BIP-39 seed.
    pub seed: ZeroizingString,
    /// Hex-encoded compressed public key.
    pub public_key: String,
    /// WIF for the configured network.
    pub private_key: ZeroizingString,
    pub address_type: AddressKind,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("address_type", &self.address_type)
            .finish_non_exhaustive()
    }
}

impl Serialize for Wallet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Wallet", 6)?;
        state.serialize_field("address", &self.address)?;
        state.serialize_field("mnemonic", &*self.mnemonic)?;
        state.serialize_field("seed", &*self.seed)?;
        state.serialize_field("public_key", &self.public_key)?;
        state.serialize_field("private_key", &*self.private_key)?;
        state.serialize_field("address_type", &self.address_type)?;
        state.end()
    }
}

/// Balance in BTC display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceView {
    pub confirmed: f64,
    /// Negative while unconfirmed spends exceed unconfirmed receipts.
    pub unconfirmed: f64,
}

impl From<Balance> for BalanceView {
    fn from(balance: Balance) -> Self {
        Self {
            confirmed: Amount::from_sat(balance.confirmed).to_btc(),
            unconfirmed: SignedAmount::from_sat(balance.unconfirmed).to_btc(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletSummary {
    pub address: String,
    pub address_type: AddressKind,
    pub balance: BalanceView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendResult {
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
}

/// Empty acknowledgement; serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastResult {}
