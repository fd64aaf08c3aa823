//! Address-type registry: which prefixes, derivation paths and script
//! kinds apply on the active network.
//!
//! The table is built once at startup and only read afterwards, so it can
//! be shared across requests behind an `Arc` without locking.

use serde::{Deserialize, Serialize};

use crate::address::AddressKind;
use crate::error::BtcError;
use crate::network::BtcNetwork;

/// One configured address type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressTypeConfig {
    pub name: AddressKind,
    pub prefixes: Vec<String>,
    pub derivation_path: String,
    pub segwit: bool,
}

impl AddressTypeConfig {
    fn new(name: AddressKind, prefixes: &[&str], derivation_path: &str) -> Self {
        Self {
            name,
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            derivation_path: derivation_path.to_string(),
            segwit: name.is_witness(),
        }
    }

    /// Length of the longest configured prefix `address` starts with.
    fn match_len(&self, address: &str) -> Option<usize> {
        self.prefixes
            .iter()
            .filter(|prefix| address.starts_with(prefix.as_str()))
            .map(|prefix| prefix.len())
            .max()
    }
}

#[derive(Debug, Clone)]
pub struct AddressTypeRegistry {
    network: BtcNetwork,
    types: Vec<AddressTypeConfig>,
}

impl AddressTypeRegistry {
    /// Address type used when a caller does not name one.
    pub const DEFAULT_KIND: AddressKind = AddressKind::P2wpkh;

    /// Built-in table for `network`.
    pub fn for_network(network: BtcNetwork) -> Self {
        let types = match network {
            BtcNetwork::Mainnet => vec![
                AddressTypeConfig::new(AddressKind::P2pkh, &["1"], "m/44'/0'/0'/0/0"),
                AddressTypeConfig::new(AddressKind::P2shP2wpkh, &["3"], "m/49'/0'/0'/0/0"),
                AddressTypeConfig::new(AddressKind::P2wpkh, &["bc1q"], "m/84'/0'/0'/0/0"),
            ],
            BtcNetwork::Testnet | BtcNetwork::Signet => vec![
                AddressTypeConfig::new(AddressKind::P2pkh, &["m", "n"], "m/44'/1'/0'/0/0"),
                AddressTypeConfig::new(AddressKind::P2shP2wpkh, &["2"], "m/49'/1'/0'/0/0"),
                AddressTypeConfig::new(AddressKind::P2wpkh, &["tb1q"], "m/84'/1'/0'/0/0"),
            ],
            // Local regtest stacks derive with coin type 0.
            BtcNetwork::Regtest => vec![
                AddressTypeConfig::new(AddressKind::P2pkh, &["m", "n"], "m/44'/0'/0'/0/0"),
                AddressTypeConfig::new(AddressKind::P2shP2wpkh, &["2"], "m/49'/0'/0'/0/0"),
                AddressTypeConfig::new(AddressKind::P2wpkh, &["bcrt1q"], "m/84'/0'/0'/0/0"),
            ],
        };
        Self { network, types }
    }

    /// Table loaded from configuration. Each kind may appear at most once
    /// and its `segwit` flag must match the kind's script.
    pub fn from_configs(
        network: BtcNetwork,
        types: Vec<AddressTypeConfig>,
    ) -> Result<Self, BtcError> {
        if types.is_empty() {
            return Err(BtcError::InvalidConfig("table is empty".into()));
        }
        for (i, config) in types.iter().enumerate() {
            if types[..i].iter().any(|other| other.name == config.name) {
                return Err(BtcError::InvalidConfig(format!(
                    "{} configured twice",
                    config.name
                )));
            }
            if config.prefixes.iter().any(|p| p.is_empty()) {
                return Err(BtcError::InvalidConfig(format!(
                    "{} has an empty prefix",
                    config.name
                )));
            }
            if config.segwit != config.name.is_witness() {
                return Err(BtcError::InvalidConfig(format!(
                    "{} declares segwit: {}",
                    config.name, config.segwit
                )));
            }
        }
        Ok(Self { network, types })
    }

    pub fn network(&self) -> BtcNetwork {
        self.network
    }

    pub fn types(&self) -> &[AddressTypeConfig] {
        &self.types
    }

    /// Find the address type whose prefix matches `address`. The longest
    /// matching prefix wins.
    pub fn classify(&self, address: &str) -> Result<&AddressTypeConfig, BtcError> {
        self.types
            .iter()
            .filter_map(|config| config.match_len(address).map(|len| (len, config)))
            .max_by_key(|(len, _)| *len)
            .map(|(_, config)| config)
            .ok_or_else(|| {
                BtcError::UnknownAddressType(format!(
                    "no {} address type matches {address}",
                    self.network
                ))
            })
    }

    pub fn get(&self, kind: AddressKind) -> Result<&AddressTypeConfig, BtcError> {
        self.types
            .iter()
            .find(|config| config.name == kind)
            .ok_or_else(|| {
                BtcError::UnknownAddressType(format!(
                    "{kind} is not configured for {}",
                    self.network
                ))
            })
    }

    pub fn path_for(&self, kind: AddressKind) -> Result<&str, BtcError> {
        self.get(kind).map(|config| config.derivation_path.as_str())
    }

    pub fn is_witness(&self, kind: AddressKind) -> Result<bool, BtcError> {
        self.get(kind).map(|config| config.segwit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_regtest_addresses() {
        let registry = AddressTypeRegistry::for_network(BtcNetwork::Regtest);
        let wpkh = registry
            .classify("bcrt1q8yu68tvmqrxtn528vujhz96x9zxfnmhhn9j78x")
            .unwrap();
        assert_eq!(wpkh.name, AddressKind::P2wpkh);
        assert!(wpkh.segwit);

        let pkh = registry.classify("mus1omSG8Dxy7KxEBZ1i21sH8juWKZJ8h9").unwrap();
        assert_eq!(pkh.name, AddressKind::P2pkh);
        assert!(!pkh.segwit);
    }

    #[test]
    fn classifies_mainnet_addresses() {
        let registry = AddressTypeRegistry::for_network(BtcNetwork::Mainnet);
        let kinds: Vec<AddressKind> = [
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
            "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy",
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
        ]
        .iter()
        .map(|a| registry.classify(a).unwrap().name)
        .collect();
        assert_eq!(
            kinds,
            vec![AddressKind::P2pkh, AddressKind::P2shP2wpkh, AddressKind::P2wpkh]
        );
    }

    #[test]
    fn unmatched_address_is_unknown_type() {
        let registry = AddressTypeRegistry::for_network(BtcNetwork::Mainnet);
        let result = registry.classify("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx");
        assert!(matches!(result, Err(BtcError::UnknownAddressType(_))));
    }

    #[test]
    fn longest_prefix_wins() {
        let registry = AddressTypeRegistry::from_configs(
            BtcNetwork::Regtest,
            vec![
                AddressTypeConfig::new(AddressKind::P2pkh, &["b"], "m/44'/0'/0'/0/0"),
                AddressTypeConfig::new(AddressKind::P2wpkh, &["bcrt1q"], "m/84'/0'/0'/0/0"),
            ],
        )
        .unwrap();
        let config = registry
            .classify("bcrt1q8yu68tvmqrxtn528vujhz96x9zxfnmhhn9j78x")
            .unwrap();
        assert_eq!(config.name, AddressKind::P2wpkh);
    }

    #[test]
    fn path_and_witness_lookups() {
        let registry = AddressTypeRegistry::for_network(BtcNetwork::Testnet);
        assert_eq!(registry.path_for(AddressKind::P2wpkh).unwrap(), "m/84'/1'/0'/0/0");
        assert_eq!(registry.path_for(AddressKind::P2pkh).unwrap(), "m/44'/1'/0'/0/0");
        assert!(registry.is_witness(AddressKind::P2shP2wpkh).unwrap());
        assert!(!registry.is_witness(AddressKind::P2pkh).unwrap());
    }

    #[test]
    fn missing_kind_is_unknown_type() {
        let registry = AddressTypeRegistry::from_configs(
            BtcNetwork::Regtest,
            vec![AddressTypeConfig::new(AddressKind::P2wpkh, &["bcrt1q"], "m/84'/0'/0'/0/0")],
        )
        .unwrap();
        assert!(matches!(
            registry.path_for(AddressKind::P2pkh),
            Err(BtcError::UnknownAddressType(_))
        ));
    }

    #[test]
    fn rejects_duplicate_and_empty_tables() {
        assert!(matches!(
            AddressTypeRegistry::from_configs(BtcNetwork::Regtest, vec![]),
            Err(BtcError::InvalidConfig(_))
        ));

        let dup = vec![
            AddressTypeConfig::new(AddressKind::P2wpkh, &["bcrt1q"], "m/84'/0'/0'/0/0"),
            AddressTypeConfig::new(AddressKind::P2wpkh, &["bcrt1"], "m/84'/0'/0'/0/1"),
        ];
        assert!(matches!(
            AddressTypeRegistry::from_configs(BtcNetwork::Regtest, dup),
            Err(BtcError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_segwit_flag_that_contradicts_kind() {
        let mut legacy = AddressTypeConfig::new(AddressKind::P2pkh, &["m", "n"], "m/44'/0'/0'/0/0");
        legacy.segwit = true;
        let err = AddressTypeRegistry::from_configs(BtcNetwork::Regtest, vec![legacy]).unwrap_err();
        assert!(matches!(err, BtcError::InvalidConfig(_)));
        assert!(err.to_string().contains("p2pkh"));

        let mut native = AddressTypeConfig::new(AddressKind::P2wpkh, &["bcrt1q"], "m/84'/0'/0'/0/0");
        native.segwit = false;
        assert!(AddressTypeRegistry::from_configs(BtcNetwork::Regtest, vec![native]).is_err());
    }

    #[test]
    fn config_deserializes_from_json() {
        let json = r#"{"name":"p2sh","prefixes":["2"],"derivation_path":"m/49'/1'/0'/0/0","segwit":true}"#;
        let config: AddressTypeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.name, AddressKind::P2shP2wpkh);
        assert!(config.segwit);
    }
}
