//! Customer management route handlers.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use larder_core::listing::{ListView, Page};
use larder_core::{CustomerState, UserId};

use super::{ApiResult, ListParams, ok};
use crate::extract::{Json, Path, Query};
use crate::db::{RepositoryError, UserRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{CustomerDetail, User};
use crate::state::AppState;

/// Body of the block endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockBody {
    pub is_blocked: bool,
}

/// Customer listing.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<User>> {
    let request = params.into_request::<CustomerState>(ListView::Customers)?;
    let page = UserRepository::new(state.pool())
        .list_customers(&request)
        .await?;
    ok("Customers fetched successfully", page)
}

/// Customer detail with order count.
#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> ApiResult<CustomerDetail> {
    let detail = UserRepository::new(state.pool())
        .customer_detail(id)
        .await
        .map_err(|e| not_found(e, id))?;
    ok("Customer fetched successfully", detail)
}

/// Block or unblock a customer.
#[instrument(skip(admin, state))]
pub async fn set_blocked(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(body): Json<BlockBody>,
) -> ApiResult<User> {
    if id == admin.id {
        return Err(AppError::Validation(
            "You cannot block your own account".to_string(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .set_blocked(id, body.is_blocked)
        .await
        .map_err(|e| not_found(e, id))?;

    let message = if user.is_blocked {
        "Customer blocked"
    } else {
        "Customer unblocked"
    };
    ok(message, user)
}

fn not_found(err: RepositoryError, id: UserId) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(format!("customer {id} not found")),
        other => other.into(),
    }
}
