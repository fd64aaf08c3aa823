//! Recovery phrase → seed → key → address.

use std::sync::Arc;

use bip39::Mnemonic;
use bitcoin::secp256k1::SecretKey;
use bitcoin::PrivateKey;
use chain_btc::address::{pubkey_to_address, AddressKind};
use chain_btc::registry::AddressTypeRegistry;
use crypto_utils::ZeroizingString;
use tracing::debug;

use crate::error::WalletError;
use crate::hd_derivation::derive_secp256k1_key;
use crate::mnemonic::{generate_mnemonic, mnemonic_to_seed, parse_mnemonic, phrase_of};
use crate::types::Wallet;

#[derive(Debug, Clone)]
pub struct Deriver {
    registry: Arc<AddressTypeRegistry>,
}

impl Deriver {
    pub fn new(registry: Arc<AddressTypeRegistry>) -> Self {
        Self { registry }
    }

    /// Validate `phrase` and derive the wallet for `address_type`
    /// (the registry default when `None`).
    pub fn derive(&self, phrase: &str, address_type: Option<AddressKind>) -> Result<Wallet, WalletError> {
        let mnemonic = parse_mnemonic(phrase)?;
        self.derive_mnemonic(&mnemonic, address_type)
    }

    /// Derive from fresh 128-bit entropy.
    pub fn generate(&self, address_type: Option<AddressKind>) -> Result<Wallet, WalletError> {
        let mnemonic = generate_mnemonic()?;
        self.derive_mnemonic(&mnemonic, address_type)
    }

    /// Derive from an already validated mnemonic.
    pub fn derive_mnemonic(
        &self,
        mnemonic: &Mnemonic,
        address_type: Option<AddressKind>,
    ) -> Result<Wallet, WalletError> {
        let kind = address_type.unwrap_or(AddressTypeRegistry::DEFAULT_KIND);
        let path = self.registry.path_for(kind)?;
        let network = self.registry.network();

        let seed = mnemonic_to_seed(mnemonic, "");
        let key = derive_secp256k1_key(&seed, path)?;
        let address = pubkey_to_address(&key.public_key_compressed, kind, network)?;

        let mut secret = SecretKey::from_slice(&key.private_key)
            .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;
        let private_key = ZeroizingString::from(PrivateKey::new(secret, network.kind()).to_wif());
        secret.non_secure_erase();

        debug!(%address, address_type = %kind, path, "wallet derived");

        Ok(Wallet {
            address,
            mnemonic: phrase_of(mnemonic),
            seed: seed.to_hex(),
            public_key: hex::encode(key.public_key_compressed),
            private_key,
            address_type: kind,
        })
    }
}
