//! Admin catalog route handlers.

use axum::extract::State;
use tracing::instrument;

use larder_core::listing::{ListView, Page};
use larder_core::{ListingState, ProductId};

use super::{ApiResult, ListParams, ok};
use crate::extract::{Path, Query};
use crate::db::{ProductRepository, RepositoryError};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::ProductDetail;
use crate::state::AppState;

/// Product listing.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<ProductDetail>> {
    let request = params.into_request::<ListingState>(ListView::Products)?;
    let page = ProductRepository::new(state.pool())
        .list_admin(&request)
        .await?;
    ok("Products fetched successfully", page)
}

/// Product detail with stock and visibility.
#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<ProductDetail> {
    let detail = ProductRepository::new(state.pool())
        .detail(id)
        .await
        .map_err(|e| not_found(e, id))?;
    ok("Product fetched successfully", detail)
}

/// Flip a product's listing flag.
#[instrument(skip(_admin, state))]
pub async fn toggle_listing(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<ProductDetail> {
    let detail = ProductRepository::new(state.pool())
        .toggle_listing(id)
        .await
        .map_err(|e| not_found(e, id))?;

    let message = if detail.product.un_listed {
        "Product unlisted"
    } else {
        "Product listed"
    };
    ok(message, detail)
}

fn not_found(err: RepositoryError, id: ProductId) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(format!("product {id} not found")),
        other => other.into(),
    }
}
