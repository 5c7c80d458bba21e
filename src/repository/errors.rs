use thiserror::Error;

use crate::domain::types::ProductId;

/// Failures reported by a catalog backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Network or backend unreachable.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The addressed document does not exist.
    #[error("product {0} not found")]
    NotFound(ProductId),
    /// The backend refused the write; carries its message verbatim.
    #[error("{0}")]
    Rejected(String),
    /// Blob upload did not complete; nothing was stored.
    #[error("upload failed: {0}")]
    UploadFailed(String),
}

/// Convenient alias for results returned from repository calls.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
