//! Product repository for database operations.
//!
//! Products are read in two passes: the page of product rows (joined with
//! their category), then every variant of those products in one `ANY($1)`
//! query. Stock and visibility are derived from the assembled product.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use larder_core::catalog::{PackSizePrice, Product, Variant};
use larder_core::listing::{ListRequest, NoStatus, Page};
use larder_core::{CategoryId, CategoryStatus, ListingState, ProductId, VariantId};

use super::RepositoryError;
use super::listing::{like_pattern, limit_offset, row_total};
use crate::models::{ProductDetail, StoreProduct};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    sku: Option<String>,
    category_id: i32,
    un_listed: bool,
    created_at: DateTime<Utc>,
    category_name: String,
    category_status: CategoryStatus,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i32,
    product_id: i32,
    images: Json<Vec<String>>,
    pack_size_pricing: Json<Vec<PackSizePrice>>,
    available_quantity: i32,
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            images: row.images.0,
            pack_size_pricing: row.pack_size_pricing.0,
            available_quantity: row.available_quantity,
        }
    }
}

impl ProductRow {
    fn into_product(self, variants: Vec<Variant>) -> (Product, String, CategoryStatus) {
        let product = Product {
            id: ProductId::new(self.id),
            name: self.name,
            sku: self.sku,
            category_id: CategoryId::new(self.category_id),
            variants,
            un_listed: self.un_listed,
            created_at: self.created_at,
        };
        (product, self.category_name, self.category_status)
    }
}

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.sku, p.category_id, p.un_listed, p.created_at,
           c.name AS category_name, c.status AS category_status
    FROM products p
    JOIN categories c ON c.id = p.category_id
";

/// Admin listing predicate. `$1` is an `ILIKE` pattern, `$2` the unlisted flag.
const ADMIN_FILTER: &str = r"
    ($1::text IS NULL
     OR p.name ILIKE $1 ESCAPE '\'
     OR p.sku ILIKE $1 ESCAPE '\'
     OR c.name ILIKE $1 ESCAPE '\')
    AND ($2::boolean IS NULL OR p.un_listed = $2)
";

/// Storefront predicate: visibility always applies. `$1` is an `ILIKE` pattern.
const STOREFRONT_FILTER: &str = r"
    p.un_listed = FALSE
    AND c.status = 'active'
    AND ($1::text IS NULL
         OR p.name ILIKE $1 ESCAPE '\'
         OR c.name ILIKE $1 ESCAPE '\')
";

const ORDER_BY: &str = "ORDER BY p.created_at DESC, p.id DESC";

/// Fields for a new variant.
#[derive(Debug, Clone)]
pub struct NewVariant {
    pub images: Vec<String>,
    pub pack_size_pricing: Vec<PackSizePrice>,
    pub available_quantity: i32,
}

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub sku: Option<String>,
    pub category_id: CategoryId,
    pub un_listed: bool,
    pub variants: Vec<NewVariant>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Admin product listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, request), fields(page = request.page(), search = ?request.search()))]
    pub async fn list_admin(
        &self,
        request: &ListRequest<ListingState>,
    ) -> Result<Page<ProductDetail>, RepositoryError> {
        let search = request.search().map(like_pattern);
        let un_listed = request.status().as_option().map(|s| s.is_unlisted());

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE {ADMIN_FILTER}"
        ))
        .bind(search.as_deref())
        .bind(un_listed)
        .fetch_one(self.pool)
        .await?;

        let window = request.window(row_total(count)?);
        let (limit, offset) = limit_offset(&window)?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE {ADMIN_FILTER} {ORDER_BY} LIMIT $3 OFFSET $4"
        ))
        .bind(search.as_deref())
        .bind(un_listed)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let items = self
            .assemble(rows)
            .await?
            .into_iter()
            .map(|(product, name, status)| ProductDetail::new(product, name, status))
            .collect();
        Ok(Page::new(items, &window))
    }

    /// Customer-facing listing: only listed products in active categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, request), fields(page = request.page(), search = ?request.search()))]
    pub async fn list_storefront(
        &self,
        request: &ListRequest<NoStatus>,
    ) -> Result<Page<StoreProduct>, RepositoryError> {
        let search = request.search().map(like_pattern);

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE {STOREFRONT_FILTER}"
        ))
        .bind(search.as_deref())
        .fetch_one(self.pool)
        .await?;

        let window = request.window(row_total(count)?);
        let (limit, offset) = limit_offset(&window)?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE {STOREFRONT_FILTER} {ORDER_BY} LIMIT $2 OFFSET $3"
        ))
        .bind(search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let items = self
            .assemble(rows)
            .await?
            .into_iter()
            .map(|(product, name, _)| StoreProduct::new(product, name))
            .collect();
        Ok(Page::new(items, &window))
    }

    /// Product detail with derived stock and visibility.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn detail(&self, id: ProductId) -> Result<ProductDetail, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let (product, name, status) = self
            .assemble(vec![row])
            .await?
            .pop()
            .ok_or(RepositoryError::NotFound)?;
        Ok(ProductDetail::new(product, name, status))
    }

    /// Flip a product's `un_listed` flag.
    ///
    /// The write is conditional on the flag read, so two concurrent toggles
    /// cannot both apply; the loser gets `Conflict`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the flag changed underneath.
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn toggle_listing(&self, id: ProductId) -> Result<ProductDetail, RepositoryError> {
        let mut detail = self.detail(id).await?;
        let previous = detail.product.un_listed;
        let un_listed = detail.product.toggle_listing();

        let result = sqlx::query("UPDATE products SET un_listed = $2 WHERE id = $1 AND un_listed = $3")
            .bind(id)
            .bind(un_listed)
            .bind(previous)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "product listing changed concurrently, reload and retry".to_string(),
            ));
        }

        tracing::info!(product_id = %id, un_listed, "Product listing toggled");
        Ok(ProductDetail::new(
            detail.product,
            detail.category_name,
            detail.category_status,
        ))
    }

    /// Create a product and its variants in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(&self, product: &NewProduct) -> Result<ProductId, RepositoryError> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO products (name, sku, category_id, un_listed)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(product.sku.as_deref())
        .bind(product.category_id)
        .bind(product.un_listed)
        .fetch_one(&mut *tx)
        .await?;

        for variant in &product.variants {
            sqlx::query(
                r"
                INSERT INTO variants (product_id, images, pack_size_pricing, available_quantity)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(id)
            .bind(Json(&variant.images))
            .bind(Json(&variant.pack_size_pricing))
            .bind(variant.available_quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(ProductId::new(id))
    }

    /// Attach variants to product rows, preserving row order.
    async fn assemble(
        &self,
        rows: Vec<ProductRow>,
    ) -> Result<Vec<(Product, String, CategoryStatus)>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let variant_rows = sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, product_id, images, pack_size_pricing, available_quantity
            FROM variants
            WHERE product_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_product: HashMap<i32, Vec<Variant>> = HashMap::new();
        for row in variant_rows {
            by_product.entry(row.product_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let variants = by_product.remove(&row.id).unwrap_or_default();
                row.into_product(variants)
            })
            .collect())
    }
}
