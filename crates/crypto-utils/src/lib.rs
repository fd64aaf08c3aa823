//! # crypto-utils
//!
//! Secret-handling helpers shared by the wallet crates: zero-on-drop
//! containers for seeds, phrases and keys, and OS-backed entropy.

pub mod random;
pub mod zeroizing;

pub use zeroizing::{ZeroizingBytes, ZeroizingString};
