//! Error taxonomy for the service layer.

use thiserror::Error;

use crate::store::error::StoreError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The document store is unavailable or rejected the operation.
    #[error("store unavailable")]
    Unavailable(#[source] StoreError),
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested document was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::Unavailable(other),
        }
    }
}
