//! Catalog: products, variants, categories and storefront visibility.
//!
//! Visibility is always derived at read time:
//!
//! ```text
//! visible(product) = !product.un_listed && category.status == Active
//! ```
//!
//! Deactivating a category never touches its products' `un_listed` flags, so
//! reactivating it restores exactly the previous storefront.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, CategoryStatus, Price, ProductId, VariantId};

/// Longest accepted category name, in characters.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 80;

/// Errors raised by catalog rules.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Category name is empty after trimming.
    #[error("category name cannot be blank")]
    BlankCategoryName,

    /// Category name is too long.
    #[error("category name must be at most {max} characters")]
    CategoryNameTooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A validated, trimmed category name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CategoryName(String);

impl CategoryName {
    /// Validate a category name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BlankCategoryName`] for blank input and
    /// [`CatalogError::CategoryNameTooLong`] past
    /// [`MAX_CATEGORY_NAME_LENGTH`] characters.
    pub fn parse(input: &str) -> Result<Self, CatalogError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::BlankCategoryName);
        }
        if trimmed.chars().count() > MAX_CATEGORY_NAME_LENGTH {
            return Err(CatalogError::CategoryNameTooLong {
                max: MAX_CATEGORY_NAME_LENGTH,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub status: CategoryStatus,
    pub created_at: DateTime<Utc>,
}

/// Price of one pack size of a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSizePrice {
    /// Pack label, e.g. `"250g"`.
    pub pack_size: String,
    pub sale_price: Price,
    /// List price before discount, if shown.
    #[serde(default)]
    pub mrp: Option<Price>,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    /// Image URLs, first is the cover.
    pub images: Vec<String>,
    pub pack_size_pricing: Vec<PackSizePrice>,
    pub available_quantity: i32,
}

impl Variant {
    /// Lowest sale price across pack sizes.
    #[must_use]
    pub fn from_price(&self) -> Option<Price> {
        self.pack_size_pricing.iter().map(|p| p.sale_price).min()
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub category_id: CategoryId,
    pub variants: Vec<Variant>,
    /// Soft-visibility flag. `true` hides the product from the storefront.
    pub un_listed: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Total stock: the sum of `available_quantity` across variants.
    #[must_use]
    pub fn stock(&self) -> i64 {
        self.variants
            .iter()
            .map(|v| i64::from(v.available_quantity))
            .sum()
    }

    /// Lowest sale price across all variants and pack sizes.
    #[must_use]
    pub fn from_price(&self) -> Option<Price> {
        self.variants.iter().filter_map(Variant::from_price).min()
    }

    /// Flip the listing flag and return the new value of `un_listed`.
    pub fn toggle_listing(&mut self) -> bool {
        self.un_listed = !self.un_listed;
        self.un_listed
    }

    /// Whether customers can see this product, given its category's status.
    #[must_use]
    pub fn is_visible_in(&self, category_status: CategoryStatus) -> bool {
        is_visible(self.un_listed, category_status)
    }
}

/// Storefront visibility rule. Category status dominates the product flag.
#[must_use]
pub fn is_visible(un_listed: bool, category_status: CategoryStatus) -> bool {
    !un_listed && category_status == CategoryStatus::Active
}
