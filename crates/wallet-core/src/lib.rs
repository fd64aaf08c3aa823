//! Non-custodial Bitcoin wallet backend.
//!
//! Derives wallets from recovery phrases, reports balances and history
//! from an Electrum index, and drafts, signs and broadcasts spends.
//! Key material is supplied per request and never stored.

pub mod assembler;
pub mod config;
pub mod deriver;
pub mod error;
pub mod hd_derivation;
pub mod logging;
pub mod mnemonic;
pub mod orchestrator;
pub mod service;
pub mod signer;
pub mod types;

pub use error::WalletError;
pub use service::WalletService;
