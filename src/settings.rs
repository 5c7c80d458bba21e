//! Runtime configuration for the catalog store and its backends.

use std::path::Path;

use ::config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable prefix, e.g. `CATALOG_STORAGE_BASE_URL`.
pub const ENV_PREFIX: &str = "CATALOG";

/// Configuration options specific to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Document collection holding product records.
    pub collection: String,
    /// Storage folder that uploaded product images are written to.
    pub image_folder: String,
    /// Base of the download URLs handed out for uploaded images.
    pub storage_base_url: String,
    /// `env_logger` filter directives; `RUST_LOG` takes precedence.
    pub log_filter: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            collection: "products".to_string(),
            image_folder: "product_images".to_string(),
            storage_base_url: "https://storage.local".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

impl CatalogConfig {
    /// Load configuration from an optional YAML file layered under
    /// `CATALOG_*` environment variables. A `.env` file is read first when
    /// present.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load from environment variables only.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::load(None)
    }
}

/// Install `env_logger` with the configured filter. Safe to call twice; the
/// second call is a no-op.
pub fn init_logging(config: &CatalogConfig) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.log_filter);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialised");
    }
}
