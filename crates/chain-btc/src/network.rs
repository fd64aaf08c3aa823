use std::str::FromStr;

use bitcoin::{Network, NetworkKind};
use serde::{Deserialize, Serialize};

use crate::error::BtcError;

/// Default Electrum endpoint for Bitcoin mainnet.
pub const MAINNET_ELECTRUM: &str = "ssl://electrum.blockstream.info:50002";

/// Default Electrum endpoint for Bitcoin testnet.
pub const TESTNET_ELECTRUM: &str = "ssl://electrum.blockstream.info:60002";

/// Default Electrum endpoint for Bitcoin signet.
pub const SIGNET_ELECTRUM: &str = "ssl://mempool.space:60602";

/// Default Electrum endpoint for a local regtest stack.
pub const REGTEST_ELECTRUM: &str = "ssl://127.0.0.1:50002";

/// Supported Bitcoin networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BtcNetwork {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
}

impl BtcNetwork {
    /// Convert to the `bitcoin` crate's `Network` type.
    pub fn to_bitcoin_network(self) -> Network {
        match self {
            BtcNetwork::Mainnet => Network::Bitcoin,
            BtcNetwork::Testnet => Network::Testnet,
            BtcNetwork::Signet => Network::Signet,
            BtcNetwork::Regtest => Network::Regtest,
        }
    }

    /// Main or test; decides WIF and base58 version bytes.
    pub fn kind(self) -> NetworkKind {
        NetworkKind::from(self.to_bitcoin_network())
    }

    /// Only mainnet moves real value. Fee estimation failures are fatal here.
    pub fn is_production(self) -> bool {
        matches!(self, BtcNetwork::Mainnet)
    }

    /// Return the default Electrum endpoint for this network.
    pub fn default_electrum_url(self) -> &'static str {
        match self {
            BtcNetwork::Mainnet => MAINNET_ELECTRUM,
            BtcNetwork::Testnet => TESTNET_ELECTRUM,
            BtcNetwork::Signet => SIGNET_ELECTRUM,
            BtcNetwork::Regtest => REGTEST_ELECTRUM,
        }
    }
}

impl std::fmt::Display for BtcNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BtcNetwork::Mainnet => write!(f, "mainnet"),
            BtcNetwork::Testnet => write!(f, "testnet"),
            BtcNetwork::Signet => write!(f, "signet"),
            BtcNetwork::Regtest => write!(f, "regtest"),
        }
    }
}

impl FromStr for BtcNetwork {
    type Err = BtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "bitcoin" => Ok(BtcNetwork::Mainnet),
            "testnet" => Ok(BtcNetwork::Testnet),
            "signet" => Ok(BtcNetwork::Signet),
            "regtest" => Ok(BtcNetwork::Regtest),
            other => Err(BtcError::InvalidNetwork(other.to_string())),
        }
    }
}
