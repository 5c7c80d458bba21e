use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::product::{ImageUpload, NewProduct, Product, ProductPatch};
use crate::domain::types::{ImageUrl, ProductId};
use crate::repository::{
    ImageUploader, ProductReader, ProductWriter, RepositoryError, RepositoryResult,
};
use crate::settings::CatalogConfig;

const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Backend kept entirely in process memory.
///
/// Documents keep insertion order, like a collection snapshot. Blobs are
/// keyed by their storage path. Taking the backend offline makes every call
/// fail with [`RepositoryError::Unavailable`].
pub struct InMemoryRepository {
    config: CatalogConfig,
    documents: RwLock<Vec<Product>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    online: AtomicBool,
}

impl InMemoryRepository {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            documents: RwLock::new(Vec::new()),
            blobs: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Replace the collection contents.
    pub async fn seed(&self, products: Vec<Product>) {
        *self.documents.write().await = products;
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of stored blobs.
    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Bytes stored behind a download URL previously returned by
    /// [`ImageUploader::upload_image`].
    pub async fn blob(&self, url: &ImageUrl) -> Option<Vec<u8>> {
        let path = url
            .as_str()
            .strip_prefix(self.base_url())?
            .trim_start_matches('/');
        self.blobs.read().await.get(path).cloned()
    }

    fn base_url(&self) -> &str {
        self.config.storage_base_url.trim_end_matches('/')
    }

    fn ensure_online(&self) -> RepositoryResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable(format!(
                "collection `{}` is offline",
                self.config.collection
            )))
        }
    }
}

#[async_trait]
impl ProductReader for InMemoryRepository {
    async fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        self.ensure_online()?;
        Ok(self.documents.read().await.clone())
    }

    async fn get_product_by_id(&self, id: &ProductId) -> RepositoryResult<Option<Product>> {
        self.ensure_online()?;
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .find(|p| &p.id == id)
            .cloned())
    }
}

#[async_trait]
impl ProductWriter for InMemoryRepository {
    async fn create_product(&self, product: &NewProduct) -> RepositoryResult<ProductId> {
        self.ensure_online()?;
        let mut documents = self.documents.write().await;

        let id = match &product.id {
            Some(id) if documents.iter().any(|p| &p.id == id) => {
                return Err(RepositoryError::Rejected(format!(
                    "document {id} already exists in `{}`",
                    self.config.collection
                )));
            }
            Some(id) => id.clone(),
            None => ProductId::generate(),
        };

        documents.push(product.clone().into_product(id.clone()));
        Ok(id)
    }

    async fn update_product(&self, id: &ProductId, patch: &ProductPatch) -> RepositoryResult<()> {
        self.ensure_online()?;
        let mut documents = self.documents.write().await;
        let product = documents
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        patch.apply(product);
        Ok(())
    }

    async fn delete_product(&self, id: &ProductId) -> RepositoryResult<()> {
        self.ensure_online()?;
        let mut documents = self.documents.write().await;
        let position = documents
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        documents.remove(position);
        Ok(())
    }
}

#[async_trait]
impl ImageUploader for InMemoryRepository {
    async fn upload_image(&self, image: &ImageUpload) -> RepositoryResult<ImageUrl> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(RepositoryError::UploadFailed("storage is offline".to_string()));
        }
        if image.bytes.is_empty() {
            return Err(RepositoryError::UploadFailed("image is empty".to_string()));
        }

        let extension = image
            .extension()
            .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string());
        let path = format!(
            "{}/{}_{}.{}",
            self.config.image_folder.trim_matches('/'),
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        );
        // Build the URL before storing so a bad base URL leaves no blob behind.
        let url = ImageUrl::new(format!("{}/{}", self.base_url(), path))?;

        self.blobs.write().await.insert(path, image.bytes.clone());
        Ok(url)
    }
}
