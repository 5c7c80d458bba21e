use serde::Deserialize;
use thiserror::Error;

use crate::domain::product::{NewProduct, ProductPatch};
use crate::domain::types::{
    CategoryName, ProductId, ProductName, ProductPrice, TypeConstraintError,
};

/// Require a description with visible characters; the value itself is kept
/// verbatim apart from surrounding whitespace.
fn require_description(value: String) -> Result<String, TypeConstraintError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TypeConstraintError::EmptyString("description"));
    }
    Ok(trimmed.to_string())
}

/// Raw add-product screen input. Fields are checked one at a time in screen
/// order so the first problem is the one reported.
#[derive(Deserialize)]
pub struct AddProductForm {
    pub name: String,
    pub price: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddProductFormPayload {
    pub name: ProductName,
    pub price: ProductPrice,
    pub description: String,
    pub category: CategoryName,
}

impl AddProductFormPayload {
    /// Build a draft stamped with the submission time. The image is attached
    /// later, once the upload has produced a URL.
    pub fn into_new_product(self) -> NewProduct {
        NewProduct::new(self.name, self.description, self.price).with_category(self.category)
    }
}

#[derive(Debug, Error)]
pub enum AddProductFormError {
    #[error("Add product form contains invalid data: {0}")]
    TypeConstraint(String),
}

impl From<TypeConstraintError> for AddProductFormError {
    fn from(value: TypeConstraintError) -> Self {
        Self::TypeConstraint(value.to_string())
    }
}

impl TryFrom<AddProductForm> for AddProductFormPayload {
    type Error = AddProductFormError;

    fn try_from(value: AddProductForm) -> Result<Self, Self::Error> {
        // Checked in the order the fields appear on screen.
        let name = ProductName::new(value.name)?;
        let price = ProductPrice::parse(&value.price)?;
        let description = require_description(value.description)?;
        let category = CategoryName::new(value.category)?;

        Ok(Self {
            name,
            price,
            description,
            category,
        })
    }
}

#[derive(Deserialize)]
pub struct EditProductForm {
    pub product_id: String,
    pub name: String,
    pub price: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditProductFormPayload {
    pub product_id: ProductId,
    pub name: ProductName,
    pub price: ProductPrice,
    pub description: String,
}

impl EditProductFormPayload {
    /// Changed fields sent to the backend as a merge.
    pub fn into_patch(self) -> (ProductId, ProductPatch) {
        let patch = ProductPatch::default()
            .name(self.name)
            .price(self.price)
            .description(self.description);
        (self.product_id, patch)
    }
}

#[derive(Debug, Error)]
pub enum EditProductFormError {
    #[error("Edit product form contains invalid data: {0}")]
    TypeConstraint(String),
}

impl From<TypeConstraintError> for EditProductFormError {
    fn from(value: TypeConstraintError) -> Self {
        Self::TypeConstraint(value.to_string())
    }
}

impl TryFrom<EditProductForm> for EditProductFormPayload {
    type Error = EditProductFormError;

    fn try_from(value: EditProductForm) -> Result<Self, Self::Error> {
        let product_id = ProductId::new(value.product_id)?;
        let name = ProductName::new(value.name)?;
        let price = ProductPrice::parse(&value.price)?;
        // A listed product cannot be repriced to zero.
        if price.get() <= 0.0 {
            return Err(TypeConstraintError::NonPositiveNumber("price").into());
        }
        let description = require_description(value.description)?;

        Ok(Self {
            product_id,
            name,
            price,
            description,
        })
    }
}
