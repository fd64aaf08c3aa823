//! Chain state access for the wallet backend.
//!
//! [`adapter::ChainStateAdapter`] wraps two remote services: a script-hash
//! index (Electrum protocol) for balances, history, UTXOs, transactions and
//! broadcast, and a bitcoind node for fee estimation.

pub mod adapter;
pub mod backend;
pub mod bitcoind;
pub mod electrum;
pub mod error;
pub mod fanout;

pub use adapter::ChainStateAdapter;
pub use backend::{Balance, FeeEstimate, FeeEstimator, HistoryEntry, ScriptHashIndex};
pub use error::BackendError;
