//! Catalog state management on top of the remote gateway.

pub mod catalog;
pub mod errors;
pub mod search;

pub use catalog::CatalogStore;
pub use errors::{CatalogError, CatalogResult};
pub use search::{SearchScope, search_products};

/// `(success, message)` pair shown to the user after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub success: bool,
    pub message: String,
}

impl Notice {
    /// Build a notice from an operation result, using `success_message` when
    /// it succeeded and the error text otherwise.
    pub fn from_result<T>(result: &CatalogResult<T>, success_message: &str) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                message: success_message.to_string(),
            },
            Err(e) => Self {
                success: false,
                message: e.to_string(),
            },
        }
    }
}
