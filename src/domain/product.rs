use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::{CategoryName, ImageUrl, ProductId, ProductName, ProductPrice};

/// A catalog item as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: ProductName,
    pub description: String,
    pub price: ProductPrice,
    /// Download URL of the product image; stored as `""` when absent.
    #[serde(default, with = "empty_image")]
    pub image: Option<ImageUrl>,
    #[serde(default)]
    pub category: Option<CategoryName>,
    /// Creation time, used only for display ordering.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Information required to create a new [`Product`].
///
/// `id` is normally left empty so the backend assigns one; it is set on the
/// client when an image is uploaded before the record exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,
    pub name: ProductName,
    pub description: String,
    pub price: ProductPrice,
    #[serde(default, with = "empty_image")]
    pub image: Option<ImageUrl>,
    #[serde(default)]
    pub category: Option<CategoryName>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl NewProduct {
    /// Starts a draft stamped with the current time.
    pub fn new(name: ProductName, description: impl Into<String>, price: ProductPrice) -> Self {
        Self {
            id: None,
            name,
            description: description.into(),
            price,
            image: None,
            category: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: CategoryName) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_image(mut self, image: ImageUrl) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = Some(id);
        self
    }

    /// Turns the draft into a stored record under the given identifier.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            image: self.image,
            category: self.category,
            created_at: self.created_at,
        }
    }

    /// Whether `product` holds the same field values as this draft, ignoring
    /// the identifier.
    pub fn matches(&self, product: &Product) -> bool {
        self.name == product.name
            && self.description == product.description
            && self.price == product.price
            && self.image == product.image
            && self.category == product.category
            && self.created_at == product.created_at
    }
}

/// Changed fields of an update, applied by the backend as a document merge.
///
/// `None` leaves a field untouched. `category` and `image` use a nested option
/// so that a field can also be cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ProductName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<ProductPrice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<ImageUrl>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<CategoryName>>,
}

impl ProductPatch {
    pub fn name(mut self, name: ProductName) -> Self {
        self.name = Some(name);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn price(mut self, price: ProductPrice) -> Self {
        self.price = Some(price);
        self
    }

    pub fn image(mut self, image: Option<ImageUrl>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn category(mut self, category: Option<CategoryName>) -> Self {
        self.category = Some(category);
        self
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image.is_none()
            && self.category.is_none()
    }

    /// Merges the changed fields into `product`. `id` and `created_at` are
    /// never touched.
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(image) = &self.image {
            product.image = image.clone();
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
    }
}

/// Raw image picked by the user, handed to the backend blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Original file name, when the picker exposes one.
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        Self { file_name, bytes }
    }

    /// Lower-cased extension of the file name. `None` unless it is made of
    /// ASCII letters and digits only, so it is always safe in a storage path.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    }
}

/// Stores a missing image as an empty string, the way product documents do.
mod empty_image {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::types::ImageUrl;

    pub fn serialize<S>(value: &Option<ImageUrl>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_ref().map(ImageUrl::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<ImageUrl>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(None);
        }
        ImageUrl::new(raw)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}
