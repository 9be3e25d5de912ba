//! Backend-agnostic document store errors.

use std::error::Error;
use thiserror::Error;

/// Result alias for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by document store backends regardless of the underlying engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the operation.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Human-readable description of what failed.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The referenced document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
