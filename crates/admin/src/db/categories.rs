//! Category repository for database operations.
//!
//! Category status changes are single-row updates; member products are never
//! touched, since storefront visibility is computed at read time.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use larder_core::catalog::{Category, CategoryName};
use larder_core::{CategoryId, CategoryStatus};

use super::RepositoryError;

/// Internal row type for `PostgreSQL` category queries.
#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    status: CategoryStatus,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every category by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, status, created_at FROM categories ORDER BY LOWER(name), id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create an active category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken (case-insensitive).
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(name = name.as_str()))]
    pub async fn create(&self, name: &CategoryName) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO categories (name) VALUES ($1)
            RETURNING id, name, status, created_at
            ",
        )
        .bind(name.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| duplicate_name(e, name))?;

        tracing::info!(category_id = %row.id, "Category created");
        Ok(row.into())
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the name is taken.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(category_id = %id, name = name.as_str()))]
    pub async fn rename(
        &self,
        id: CategoryId,
        name: &CategoryName,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE categories SET name = $2 WHERE id = $1
            RETURNING id, name, status, created_at
            ",
        )
        .bind(id)
        .bind(name.as_str())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| duplicate_name(e, name))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Set a category's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(category_id = %id, status = %status))]
    pub async fn set_status(
        &self,
        id: CategoryId,
        status: CategoryStatus,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE categories SET status = $2 WHERE id = $1
            RETURNING id, name, status, created_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tracing::info!(category_id = %id, status = %status, "Category status updated");
        Ok(row.into())
    }
}

fn duplicate_name(err: sqlx::Error, name: &CategoryName) -> RepositoryError {
    RepositoryError::from_unique(
        err,
        format!("a category named {} already exists", name.as_str()),
    )
}
