use std::fmt;
use std::str::FromStr;

use bitcoin::address::{Address, NetworkUnchecked};
use bitcoin::script::ScriptBuf;
use bitcoin::CompressedPublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::BtcError;
use crate::network::BtcNetwork;

/// Output script formats a wallet can be derived for and spend from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    /// Legacy pay-to-pubkey-hash (base58, `1…` / `m…` / `n…`).
    #[serde(rename = "p2pkh")]
    P2pkh,
    /// P2WPKH nested in P2SH (base58, `3…` / `2…`).
    #[serde(rename = "p2sh")]
    P2shP2wpkh,
    /// Native SegWit v0 (bech32, `bc1q…` / `tb1q…` / `bcrt1q…`).
    #[serde(rename = "p2wpkh")]
    P2wpkh,
}

impl AddressKind {
    pub const ALL: [AddressKind; 3] = [AddressKind::P2pkh, AddressKind::P2shP2wpkh, AddressKind::P2wpkh];

    /// Name used in configuration and API payloads.
    pub fn name(self) -> &'static str {
        match self {
            AddressKind::P2pkh => "p2pkh",
            AddressKind::P2shP2wpkh => "p2sh",
            AddressKind::P2wpkh => "p2wpkh",
        }
    }

    /// Whether inputs spending this kind are signed with a witness
    /// (and therefore only need the previous output, not the whole
    /// previous transaction).
    pub fn is_witness(self) -> bool {
        !matches!(self, AddressKind::P2pkh)
    }

    /// Build the address paying to `pubkey` on `network`.
    pub fn address(self, pubkey: &CompressedPublicKey, network: BtcNetwork) -> Address {
        let net = network.to_bitcoin_network();
        match self {
            AddressKind::P2pkh => Address::p2pkh(pubkey.pubkey_hash(), net),
            AddressKind::P2shP2wpkh => Address::p2shwpkh(pubkey, net),
            AddressKind::P2wpkh => Address::p2wpkh(pubkey, net),
        }
    }

    /// The locking script for `pubkey`. Network independent.
    pub fn script_pubkey(self, pubkey: &CompressedPublicKey) -> ScriptBuf {
        self.address(pubkey, BtcNetwork::Mainnet).script_pubkey()
    }

    /// Redeem script for P2SH-wrapped kinds.
    pub fn redeem_script(self, pubkey: &CompressedPublicKey) -> Option<ScriptBuf> {
        match self {
            AddressKind::P2shP2wpkh => Some(ScriptBuf::new_p2wpkh(&pubkey.wpubkey_hash())),
            AddressKind::P2pkh | AddressKind::P2wpkh => None,
        }
    }

    /// Estimated virtual size of one input of this kind (in vbytes).
    pub fn input_vbytes(self) -> u64 {
        match self {
            // 41 outpoint/sequence/len + 107 scriptSig
            AddressKind::P2pkh => 148,
            // 41 + 23 redeem push, plus ~108 witness bytes / 4
            AddressKind::P2shP2wpkh => 91,
            // 41 + ~108 witness bytes / 4
            AddressKind::P2wpkh => 68,
        }
    }

    /// Version, locktime and counts; witness kinds add marker and flag.
    pub fn tx_overhead_vbytes(self) -> u64 {
        if self.is_witness() {
            11
        } else {
            10
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AddressKind {
    type Err = BtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p2pkh" => Ok(AddressKind::P2pkh),
            "p2sh" | "p2sh-p2wpkh" => Ok(AddressKind::P2shP2wpkh),
            "p2wpkh" => Ok(AddressKind::P2wpkh),
            other => Err(BtcError::UnknownAddressType(other.to_string())),
        }
    }
}

/// Derive an address of the given kind from a compressed public key.
pub fn pubkey_to_address(
    pubkey_bytes: &[u8; 33],
    kind: AddressKind,
    network: BtcNetwork,
) -> Result<String, BtcError> {
    let compressed_pk = CompressedPublicKey::from_slice(pubkey_bytes).map_err(|e| {
        BtcError::InvalidPublicKey(format!("failed to parse compressed public key: {e}"))
    })?;

    Ok(kind.address(&compressed_pk, network).to_string())
}

/// Parse an address and require that it belongs to `network`.
pub fn parse_address(address: &str, network: BtcNetwork) -> Result<Address, BtcError> {
    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| BtcError::InvalidAddress(format!("failed to parse address {address}: {e}")))?
        .require_network(network.to_bitcoin_network())
        .map_err(|e| BtcError::InvalidAddress(format!("address {address} wrong network: {e}")))
}

/// Electrum-style index key: SHA-256 of the output script, byte-reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptHash([u8; 32]);

impl ScriptHash {
    pub fn from_script(script: &bitcoin::Script) -> Self {
        let mut hash: [u8; 32] = Sha256::digest(script.as_bytes()).into();
        hash.reverse();
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the index key for an address on `network`.
pub fn script_hash(address: &str, network: BtcNetwork) -> Result<ScriptHash, BtcError> {
    let addr = parse_address(address, network)?;
    Ok(ScriptHash::from_script(&addr.script_pubkey()))
}
