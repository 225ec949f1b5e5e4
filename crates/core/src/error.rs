use thiserror::Error;

/// Errors raised by the shared core types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}
