//! Remote catalog gateway.
//!
//! The backend is split into reader, writer and image upload capabilities so
//! callers can name exactly what they need. Every call is asynchronous and may
//! fail; none of them touch local state.

use async_trait::async_trait;

use crate::domain::product::{ImageUpload, NewProduct, Product, ProductPatch};
use crate::domain::types::{ImageUrl, ProductId};

pub mod errors;
pub mod memory;

pub use errors::{RepositoryError, RepositoryResult};
pub use memory::InMemoryRepository;

/// Read-only operations for product documents.
#[async_trait]
pub trait ProductReader: Send + Sync {
    /// Full snapshot of the collection in backend order.
    async fn list_products(&self) -> RepositoryResult<Vec<Product>>;
    /// Retrieve a product by its identifier; `Ok(None)` when absent.
    async fn get_product_by_id(&self, id: &ProductId) -> RepositoryResult<Option<Product>>;
}

/// Write operations for product documents.
#[async_trait]
pub trait ProductWriter: Send + Sync {
    /// Persist a new product and return its identifier.
    ///
    /// A draft that already carries an id is stored under that id.
    async fn create_product(&self, product: &NewProduct) -> RepositoryResult<ProductId>;
    /// Merge the changed fields into an existing product.
    async fn update_product(&self, id: &ProductId, patch: &ProductPatch) -> RepositoryResult<()>;
    /// Delete a product; an unknown id is [`RepositoryError::NotFound`].
    async fn delete_product(&self, id: &ProductId) -> RepositoryResult<()>;
}

/// Blob storage for product images.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Store the image and return its download URL. All-or-nothing.
    async fn upload_image(&self, image: &ImageUpload) -> RepositoryResult<ImageUrl>;
}
