use thiserror::Error;

/// Errors from document store and tenant lock operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("lock expired: {0}")]
    LockExpired(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl StoreError {
    /// Whether the failure is transient and the call may succeed if repeated.
    ///
    /// Rejections, serialization problems and lock state errors are final.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Unavailable(_) | Self::Timeout(_)
        )
    }
}
