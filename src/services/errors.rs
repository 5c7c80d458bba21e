use thiserror::Error;

use crate::domain::types::{ImageUrl, ProductId};

/// Outcome of a failed catalog operation.
///
/// Every backend failure is converted into one of these at the store boundary;
/// nothing else escapes to the presentation layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// Backend unreachable. Not retried automatically.
    #[error("The catalog is unavailable right now, please try again")]
    GatewayUnavailable,
    /// The product no longer exists at the backend.
    #[error("Product {0} no longer exists")]
    NotFound(ProductId),
    /// The backend refused the write; its message is passed through.
    #[error("{0}")]
    ValidationRejected(String),
    /// Image upload failed; no product was written.
    #[error("Image upload failed: {0}")]
    UploadFailed(String),
    /// The image was uploaded but the product write that followed failed,
    /// leaving an orphaned blob at `image`.
    #[error("Image {image} was uploaded but the product was not saved: {source}")]
    PartialWorkflowFailure {
        image: ImageUrl,
        source: Box<CatalogError>,
    },
    /// Form input rejected locally, before any backend call.
    #[error("{0}")]
    InvalidInput(String),
}

/// Convenient alias for results returned from catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
