//! Order route handlers.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use larder_core::listing::{ListView, Page};
use larder_core::{OrderId, OrderItemId, OrderStatus};

use super::{ApiResult, ListParams, ok, parse_field};
use crate::extract::{Json, Path, Query};
use crate::db::OrderRepository;
use crate::middleware::RequireAdmin;
use crate::models::{OrderDetail, OrderSummary};
use crate::services::OrderService;
use crate::state::AppState;

/// Body of the status endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub target_status: String,
}

/// Body of the return resolution endpoint.
#[derive(Debug, Deserialize)]
pub struct ResolveReturnBody {
    pub accept: bool,
}

/// Order listing.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<OrderSummary>> {
    let request = params.into_request::<OrderStatus>(ListView::Orders)?;
    let page = OrderRepository::new(state.pool()).list(&request).await?;
    ok("Orders fetched successfully", page)
}

/// Order detail with items.
#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> ApiResult<OrderDetail> {
    let order = OrderService::new(state.pool()).get(id).await?;
    ok("Order fetched successfully", OrderDetail::from(order))
}

/// Move an order to a new status.
#[instrument(skip(_admin, state))]
pub async fn change_status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusBody>,
) -> ApiResult<OrderDetail> {
    let target: OrderStatus = parse_field("targetStatus", &body.target_status)?;
    let order = OrderService::new(state.pool())
        .change_status(id, target)
        .await?;
    ok(
        format!("Order status updated to {target}"),
        OrderDetail::from(order),
    )
}

/// Accept or reject an item's return request.
#[instrument(skip(_admin, state))]
pub async fn resolve_return(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(OrderId, OrderItemId)>,
    Json(body): Json<ResolveReturnBody>,
) -> ApiResult<OrderDetail> {
    let order = OrderService::new(state.pool())
        .resolve_return(id, item_id, body.accept)
        .await?;
    let message = if body.accept {
        "Return accepted"
    } else {
        "Return rejected"
    };
    ok(message, OrderDetail::from(order))
}
