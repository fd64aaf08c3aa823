use thiserror::Error;

/// Failures in address handling, coin selection and PSBT processing.
///
/// Messages name the offending address, input or amount. They never carry
/// key material.
#[derive(Debug, Error)]
pub enum BtcError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unknown address type: {0}")]
    UnknownAddressType(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    #[error("invalid address type table: {0}")]
    InvalidConfig(String),
}
