//! Storefront route handlers (customer role).

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use larder_core::listing::{ListView, NoStatus, Page};
use larder_core::{OrderId, OrderItemId};

use super::{ApiResult, ListParams, ok};
use crate::extract::{Json, Path, Query};
use crate::db::ProductRepository;
use crate::middleware::RequireCustomer;
use crate::models::{OrderDetail, StoreProduct};
use crate::services::OrderService;
use crate::state::AppState;

/// Body of the return request endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnBody {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Visible products: listed, in an active category.
#[instrument(skip(_customer, state))]
pub async fn products(
    RequireCustomer(_customer): RequireCustomer,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<StoreProduct>> {
    let request = params.into_request::<NoStatus>(ListView::Storefront)?;
    let page = ProductRepository::new(state.pool())
        .list_storefront(&request)
        .await?;
    ok("Products fetched successfully", page)
}

/// Request a return on one item of the customer's own order.
#[instrument(skip(customer, state))]
pub async fn request_return(
    RequireCustomer(customer): RequireCustomer,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(OrderId, OrderItemId)>,
    Json(body): Json<ReturnBody>,
) -> ApiResult<OrderDetail> {
    let order = OrderService::new(state.pool())
        .raise_return(customer, id, item_id, body.reason.as_deref())
        .await?;
    ok("Return requested", OrderDetail::from(order))
}
