//! Process settings, loaded once at startup from YAML plus environment
//! overrides (`WALLET__APP__WALLETS__BTC__NETWORK=regtest`).

use std::path::Path;
use std::time::Duration;

use chain_btc::network::BtcNetwork;
use chain_btc::registry::{AddressTypeConfig, AddressTypeRegistry};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::WalletError;

pub const DEFAULT_CONFIG_PATH: &str = "configs.yaml";

/// Keys that must be present or the process refuses to start.
pub const REQUIRED_SETTINGS: &[&str] = &["app.wallets", "app.wallets.btc", "app.wallets.btc.network"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: String,
    pub port: u16,
    pub debug: bool,
    pub btc: BtcSettings,
}

#[derive(Debug, Clone)]
pub struct BtcSettings {
    pub network: BtcNetwork,
    pub electrum: ElectrumSettings,
    pub bitcoind: BitcoindSettings,
    /// Deadline for every remote call.
    pub request_timeout: Duration,
    pub fee_target_blocks: u16,
    /// Replaces the built-in address-type table when set.
    pub address_types: Option<Vec<AddressTypeConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElectrumSettings {
    pub url: Option<String>,
    #[serde(default)]
    pub validate_domain: bool,
}

#[derive(Debug, Clone)]
pub struct BitcoindSettings {
    pub url: String,
    pub rpc_user: String,
    pub rpc_pass: SecretString,
}

#[derive(Deserialize)]
struct RawSettings {
    app: RawApp,
}

#[derive(Deserialize)]
struct RawApp {
    #[serde(default = "default_env")]
    env: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    debug: bool,
    wallets: RawWallets,
}

#[derive(Deserialize)]
struct RawWallets {
    btc: RawBtc,
}

#[derive(Deserialize)]
struct RawBtc {
    network: BtcNetwork,
    electrumx: Option<ElectrumSettings>,
    bitcoind: RawBitcoind,
    #[serde(default = "default_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_fee_target")]
    fee_target_blocks: u16,
    address_types: Option<Vec<AddressTypeConfig>>,
}

#[derive(Deserialize)]
struct RawBitcoind {
    url: String,
    #[serde(default)]
    rpc_user: String,
    #[serde(default)]
    rpc_pass: String,
}

fn default_env() -> String {
    "development".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_fee_target() -> u16 {
    1
}

impl Settings {
    /// Load `path` (YAML) layered with `WALLET__`-prefixed environment
    /// variables.
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let builder = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(false))
            .add_source(
                Environment::with_prefix("WALLET")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    /// Load from YAML text only.
    pub fn from_yaml(yaml: &str) -> Result<Self, WalletError> {
        Self::from_builder(Config::builder().add_source(File::from_str(yaml, FileFormat::Yaml)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, WalletError> {
        let config = builder.build()?;
        for key in REQUIRED_SETTINGS {
            if config.get::<config::Value>(key).is_err() {
                return Err(WalletError::Config(format!("required setting `{key}` is missing")));
            }
        }

        let raw: RawSettings = config.try_deserialize()?;
        let btc = raw.app.wallets.btc;
        if btc.fee_target_blocks == 0 {
            return Err(WalletError::Config("fee_target_blocks must be at least 1".into()));
        }

        Ok(Settings {
            env: raw.app.env,
            port: raw.app.port,
            debug: raw.app.debug,
            btc: BtcSettings {
                network: btc.network,
                electrum: btc.electrumx.unwrap_or(ElectrumSettings {
                    url: None,
                    validate_domain: false,
                }),
                bitcoind: BitcoindSettings {
                    url: btc.bitcoind.url,
                    rpc_user: btc.bitcoind.rpc_user,
                    rpc_pass: SecretString::from(btc.bitcoind.rpc_pass),
                },
                request_timeout: Duration::from_secs(btc.request_timeout_secs),
                fee_target_blocks: btc.fee_target_blocks,
                address_types: btc.address_types,
            },
        })
    }
}

impl BtcSettings {
    /// Configured endpoint, or the network's default Electrum server.
    pub fn electrum_url(&self) -> &str {
        self.electrum
            .url
            .as_deref()
            .unwrap_or_else(|| self.network.default_electrum_url())
    }

    /// Address-type table for the configured network.
    pub fn registry(&self) -> Result<AddressTypeRegistry, WalletError> {
        match &self.address_types {
            Some(types) => Ok(AddressTypeRegistry::from_configs(self.network, types.clone())?),
            None => Ok(AddressTypeRegistry::for_network(self.network)),
        }
    }
}
