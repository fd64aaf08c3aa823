use bip32::{DerivationPath, XPrv};
use k256::ecdsa::SigningKey;
use zeroize::Zeroize;

use crate::error::WalletError;

/// Derive a secp256k1 private key from seed using BIP-32.
///
/// `path` is a full path such as `m/84'/0'/0'/0/0`.
pub fn derive_secp256k1_key(seed: &[u8], path: &str) -> Result<DerivedKey, WalletError> {
    let derivation_path: DerivationPath = path
        .parse()
        .map_err(|e: bip32::Error| WalletError::DerivationFailed(format!("path {path}: {e}")))?;

    let xprv = XPrv::derive_from_path(seed, &derivation_path)
        .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;

    let mut private_key: [u8; 32] = xprv.to_bytes().into();
    let signing_key = match SigningKey::from_bytes(&private_key.into()) {
        Ok(key) => key,
        Err(e) => {
            private_key.zeroize();
            return Err(WalletError::DerivationFailed(e.to_string()));
        }
    };

    let public_key_compressed: [u8; 33] = signing_key
        .verifying_key()
        .to_sec1_bytes()
        .as_ref()
        .try_into()
        .map_err(|_| WalletError::DerivationFailed("Invalid public key length".into()))?;

    Ok(DerivedKey {
        private_key,
        public_key_compressed,
        derivation_path: path.to_string(),
    })
}

/// Derived secp256k1 key
pub struct DerivedKey {
    pub private_key: [u8; 32],
    pub public_key_compressed: [u8; 33],
    pub derivation_path: String,
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}
