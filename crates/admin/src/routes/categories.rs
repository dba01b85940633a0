//! Category route handlers.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use larder_core::catalog::{Category, CategoryName};
use larder_core::{CategoryId, CategoryStatus};

use super::{ApiResult, ok, parse_field};
use crate::extract::{Json, Path};
use crate::db::{CategoryRepository, RepositoryError};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Body of the create and rename endpoints.
#[derive(Debug, Deserialize)]
pub struct NameBody {
    pub name: String,
}

/// Body of the status endpoint. Accepts `Active`/`Inactive` in any case.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// All categories.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Vec<Category>> {
    let categories = CategoryRepository::new(state.pool()).list_all().await?;
    ok("Categories fetched successfully", categories)
}

/// Create a category.
#[instrument(skip(_admin, state))]
pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<NameBody>,
) -> ApiResult<Category> {
    let name = CategoryName::parse(&body.name)?;
    let category = CategoryRepository::new(state.pool())
        .create(&name)
        .await
        .map_err(|e| category_error(e, None))?;
    ok("Category created", category)
}

/// Rename a category.
#[instrument(skip(_admin, state))]
pub async fn rename(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(body): Json<NameBody>,
) -> ApiResult<Category> {
    let name = CategoryName::parse(&body.name)?;
    let category = CategoryRepository::new(state.pool())
        .rename(id, &name)
        .await
        .map_err(|e| category_error(e, Some(id)))?;
    ok("Category renamed", category)
}

/// Activate or deactivate a category. Member products keep their own flags.
#[instrument(skip(_admin, state))]
pub async fn set_status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Category> {
    let status: CategoryStatus = parse_field("status", &body.status.to_lowercase())?;
    let category = CategoryRepository::new(state.pool())
        .set_status(id, status)
        .await
        .map_err(|e| category_error(e, Some(id)))?;
    ok(format!("Category marked {status}"), category)
}

/// Duplicate names are a validation failure rather than a conflict.
fn category_error(err: RepositoryError, id: Option<CategoryId>) -> AppError {
    match (err, id) {
        (RepositoryError::Conflict(msg), _) => AppError::Validation(msg),
        (RepositoryError::NotFound, Some(id)) => {
            AppError::NotFound(format!("category {id} not found"))
        }
        (other, _) => other.into(),
    }
}
