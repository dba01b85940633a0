//! Integration tests for coupon resolution and role separation.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The admin service running against it with the same credential secret
//!
//! Run with: cargo test -p larder-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;

use larder_core::Role;
use larder_integration_tests::{TestContext, tag};

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_coupon_codes_are_case_sensitive() {
    let ctx = TestContext::new().await;
    let customer = ctx.token(ctx.user(&format!("shopper {}", tag()), Role::Customer).await);

    let (status, body) = ctx.get("/api/store/coupons/SAVE10", &customer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "percentOff");
    assert_eq!(body["data"]["percent"], 10);

    let (status, body) = ctx.get("/api/store/coupons/FREESHIP", &customer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "freeShipping");

    let (status, body) = ctx.get("/api/store/coupons/save10", &customer).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "unknown_coupon");
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_roles_do_not_cross() {
    let ctx = TestContext::new().await;
    let t = tag();
    let admin = ctx.token(ctx.user(&format!("ops-{t}"), Role::Admin).await);
    let customer = ctx.token(ctx.user(&format!("shopper {t}"), Role::Customer).await);

    let (status, body) = ctx.get("/api/admin/coupons", &customer).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, body) = ctx.get("/api/store/products", &admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, body) = ctx.get("/api/admin/coupons?search=save", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
}
