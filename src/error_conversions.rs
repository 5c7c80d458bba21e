//! Error conversion glue between the domain, form, repository and service
//! layers.
//!
//! The domain layer must not depend on repository or service error types, so
//! the `From` impls live here rather than next to either side.

use crate::domain::types::TypeConstraintError;
use crate::forms::products::{AddProductFormError, EditProductFormError};
use crate::repository::RepositoryError;
use crate::services::CatalogError;

impl From<TypeConstraintError> for RepositoryError {
    fn from(val: TypeConstraintError) -> Self {
        RepositoryError::Rejected(val.to_string())
    }
}

impl From<TypeConstraintError> for CatalogError {
    fn from(val: TypeConstraintError) -> Self {
        CatalogError::InvalidInput(val.to_string())
    }
}

impl From<RepositoryError> for CatalogError {
    fn from(val: RepositoryError) -> Self {
        match val {
            RepositoryError::Unavailable(_) => CatalogError::GatewayUnavailable,
            RepositoryError::NotFound(id) => CatalogError::NotFound(id),
            RepositoryError::Rejected(message) => CatalogError::ValidationRejected(message),
            RepositoryError::UploadFailed(message) => CatalogError::UploadFailed(message),
        }
    }
}

impl From<AddProductFormError> for CatalogError {
    fn from(val: AddProductFormError) -> Self {
        CatalogError::InvalidInput(val.to_string())
    }
}

impl From<EditProductFormError> for CatalogError {
    fn from(val: EditProductFormError) -> Self {
        CatalogError::InvalidInput(val.to_string())
    }
}
