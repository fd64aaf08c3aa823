use thiserror::Error;

/// Failures talking to the index service or the full node.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend timeout: {0}")]
    Timeout(String),

    #[error("fee estimation unavailable: {0}")]
    FeeEstimationUnavailable(String),

    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}
