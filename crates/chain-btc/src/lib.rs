//! Bitcoin chain support for the wallet backend.
//!
//! Address derivation for P2PKH, P2SH-P2WPKH and P2WPKH, the per-network
//! address-type registry, UTXO coin selection, and PSBT-based signing,
//! verification and finalization.

pub mod address;
pub mod error;
pub mod network;
pub mod registry;
pub mod transaction;
pub mod utxo;
