use std::time::Duration;

/// Errors surfaced by the block fetchers in `bridge-evm-fetch`. Transient
/// conditions are retried internally with jittered backoff before ever
/// reaching a caller as this type; what callers see is the terminal outcome.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited, retry after {0:?}")]
    RateLimited(Duration),

    #[error("transient network error: {0}")]
    Transient(String),

    #[error("malformed upstream response: {0}")]
    ProtocolViolation(String),

    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),
}

impl FetchError {
    /// Whether this variant represents the kind of condition internal retry
    /// policies consider worth retrying (as opposed to a permanent protocol
    /// mismatch).
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::RateLimited(_) | Self::Transient(_))
    }
}
