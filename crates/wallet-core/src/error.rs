use chain_btc::error::BtcError;
use chain_client::BackendError;
use thiserror::Error;

/// Errors surfaced by every wallet operation. Messages never carry
/// recovery phrases, seeds or private keys.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid recovery phrase: {0}")]
    InvalidRecoveryPhrase(String),

    #[error("unknown address type: {0}")]
    UnknownAddressType(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("fee estimation unavailable: {0}")]
    FeeEstimationUnavailable(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend timeout: {0}")]
    BackendTimeout(String),

    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl WalletError {
    /// Stable identifier for callers that branch on the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::InvalidRecoveryPhrase(_) => "invalid_recovery_phrase",
            WalletError::UnknownAddressType(_) => "unknown_address_type",
            WalletError::InsufficientFunds(_) => "insufficient_funds",
            WalletError::FeeEstimationUnavailable(_) => "fee_estimation_unavailable",
            WalletError::InvalidSignature(_) => "invalid_signature",
            WalletError::BackendUnavailable(_) => "backend_unavailable",
            WalletError::BackendTimeout(_) => "backend_timeout",
            WalletError::BroadcastFailed(_) => "broadcast_failed",
            WalletError::InvalidAddress(_) => "invalid_address",
            WalletError::InvalidPrivateKey(_) => "invalid_private_key",
            WalletError::DerivationFailed(_) => "derivation_failed",
            WalletError::TransactionFailed(_) => "transaction_failed",
            WalletError::Config(_) => "config",
        }
    }
}

impl From<BtcError> for WalletError {
    fn from(e: BtcError) -> Self {
        match e {
            BtcError::InvalidPrivateKey(msg) => WalletError::InvalidPrivateKey(msg),
            BtcError::InvalidPublicKey(msg) => WalletError::DerivationFailed(msg),
            BtcError::InvalidAddress(msg) => WalletError::InvalidAddress(msg),
            BtcError::UnknownAddressType(msg) => WalletError::UnknownAddressType(msg),
            BtcError::InsufficientFunds(msg) => WalletError::InsufficientFunds(msg),
            BtcError::TransactionBuildError(msg) | BtcError::SigningError(msg) => {
                WalletError::TransactionFailed(msg)
            }
            BtcError::InvalidSignature(msg) => WalletError::InvalidSignature(msg),
            BtcError::InvalidNetwork(msg) => WalletError::Config(format!("invalid network {msg}")),
            BtcError::InvalidConfig(msg) => WalletError::Config(format!("address types: {msg}")),
        }
    }
}

impl From<BackendError> for WalletError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unavailable(msg) => WalletError::BackendUnavailable(msg),
            BackendError::Timeout(msg) => WalletError::BackendTimeout(msg),
            BackendError::FeeEstimationUnavailable(msg) => WalletError::FeeEstimationUnavailable(msg),
            BackendError::BroadcastFailed(msg) => WalletError::BroadcastFailed(msg),
            BackendError::InvalidResponse(msg) => {
                WalletError::BackendUnavailable(format!("invalid response: {msg}"))
            }
        }
    }
}

impl From<config::ConfigError> for WalletError {
    fn from(e: config::ConfigError) -> Self {
        WalletError::Config(e.to_string())
    }
}
