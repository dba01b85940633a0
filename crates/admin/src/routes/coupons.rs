//! Coupon route handlers.
//!
//! Coupons are static reference data, so both endpoints work without the
//! store once the caller is authenticated.

use tracing::instrument;

use larder_core::coupon::{self, COUPONS, Coupon, CouponEffect};
use larder_core::listing::{ListView, NoStatus, Page, list_in_memory};

use super::{ApiResult, ListParams, ok};
use crate::extract::{Path, Query};
use crate::middleware::{RequireAdmin, RequireCustomer};

/// Coupon listing for administrators.
#[instrument(skip(_admin))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Coupon>> {
    let request = params.into_request::<NoStatus>(ListView::Coupons)?;
    ok("Coupons fetched successfully", list_in_memory(COUPONS, &request))
}

/// Resolve a coupon code to its effect. Exact, case-sensitive match.
#[instrument(skip(_customer))]
pub async fn resolve(
    RequireCustomer(_customer): RequireCustomer,
    Path(code): Path<String>,
) -> ApiResult<CouponEffect> {
    let coupon = coupon::resolve(&code)?;
    ok(coupon.description, coupon.effect)
}
