//! Product views for the admin catalog and the storefront.

use serde::Serialize;

use larder_core::catalog::{Product, Variant};
use larder_core::{CategoryId, CategoryStatus, ListingState, Price, ProductId};

/// A product with its category and derived fields, as administrators see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub category_status: CategoryStatus,
    pub listing: ListingState,
    /// Sum of variant quantities.
    pub stock: i64,
    /// Whether customers can currently see the product.
    pub visible: bool,
}

impl ProductDetail {
    /// Derive stock and visibility for `product`.
    #[must_use]
    pub fn new(product: Product, category_name: String, category_status: CategoryStatus) -> Self {
        let stock = product.stock();
        let visible = product.is_visible_in(category_status);
        let listing = ListingState::from_unlisted(product.un_listed);
        Self {
            product,
            category_name,
            category_status,
            listing,
            stock,
            visible,
        }
    }
}

/// A product as shown in the customer-facing listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreProduct {
    pub id: ProductId,
    pub name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub variants: Vec<Variant>,
    /// Lowest price across variants and pack sizes.
    pub from_price: Option<Price>,
    pub in_stock: bool,
}

impl StoreProduct {
    /// Build the storefront view of a visible product.
    #[must_use]
    pub fn new(product: Product, category_name: String) -> Self {
        let from_price = product.from_price();
        let in_stock = product.stock() > 0;
        Self {
            id: product.id,
            name: product.name,
            category_id: product.category_id,
            category_name,
            variants: product.variants,
            from_price,
            in_stock,
        }
    }
}
