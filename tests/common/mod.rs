//! Helpers for integration tests.

use beautyhub_catalog::domain::product::{ImageUpload, NewProduct};
use beautyhub_catalog::domain::types::{CategoryName, ProductName, ProductPrice};
use beautyhub_catalog::repository::InMemoryRepository;
use beautyhub_catalog::services::CatalogStore;
use beautyhub_catalog::settings::CatalogConfig;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Store over a fresh in-memory backend with default configuration.
pub fn new_store() -> CatalogStore<InMemoryRepository> {
    init_logging();
    CatalogStore::new(InMemoryRepository::new(CatalogConfig::default()))
}

pub fn draft(name: &str, price: f64, description: &str, category: &str) -> NewProduct {
    NewProduct::new(
        ProductName::new(name).expect("valid product name"),
        description,
        ProductPrice::new(price).expect("valid price"),
    )
    .with_category(CategoryName::new(category).expect("valid category"))
}

pub fn jpeg(name: &str) -> ImageUpload {
    ImageUpload::new(Some(name.to_string()), vec![0xff, 0xd8, 0xff, 0xe0])
}
