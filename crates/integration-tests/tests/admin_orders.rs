//! Integration tests for the order lifecycle endpoints.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The admin service running against it with the same credential secret
//!
//! Run with: cargo test -p larder-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use reqwest::StatusCode;
use serde_json::json;

use larder_core::{CategoryStatus, OrderStatus, Role};
use larder_integration_tests::{TestContext, tag};

struct Scenario {
    ctx: TestContext,
    admin: String,
    customer: String,
    order: i64,
    item: i64,
}

/// An admin, a customer and one processing order with a single item.
async fn scenario() -> Scenario {
    let ctx = TestContext::new().await;
    let t = tag();
    let admin = ctx.user(&format!("ops-{t}"), Role::Admin).await;
    let customer = ctx.user(&format!("Anna K {t}"), Role::Customer).await;
    let category = ctx.category(&format!("Tea {t}"), CategoryStatus::Active).await;
    let product = ctx.product(&format!("Assam {t}"), category, false).await;
    let order = ctx.order(customer, OrderStatus::Processing, &[product]).await;

    let admin = ctx.token(admin);
    let customer = ctx.token(customer);
    let (status, body) = ctx
        .get(&format!("/api/admin/orders/{order}"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    let item = body["data"]["items"][0]["id"].as_i64().unwrap();

    Scenario {
        ctx,
        admin,
        customer,
        order: i64::from(order.as_i32()),
        item,
    }
}

impl Scenario {
    async fn move_to(&self, target: &str) -> (StatusCode, serde_json::Value) {
        self.ctx
            .put(
                &format!("/api/admin/orders/{}/status", self.order),
                &self.admin,
                &json!({ "targetStatus": target }),
            )
            .await
    }

    async fn status(&self) -> String {
        let (_, body) = self
            .ctx
            .get(&format!("/api/admin/orders/{}", self.order), &self.admin)
            .await;
        body["data"]["status"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_order_scenario_end_to_end() {
    let s = scenario().await;

    for target in ["shipped", "delivered"] {
        let (status, body) = s.move_to(target).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["status"], target);
    }

    // Customer flags the item
    let (status, body) = s
        .ctx
        .post(
            &format!("/api/store/orders/{}/items/{}/return", s.order, s.item),
            &s.customer,
            &json!({ "reason": "  Tin arrived dented  " }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "delivered");
    assert_eq!(body["data"]["returnRequested"], true);
    assert_eq!(
        body["data"]["items"][0]["returnRequest"]["reason"],
        "Tin arrived dented"
    );

    let (status, body) = s.move_to("returned").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "returned");
    assert_eq!(body["data"]["nextStatuses"], json!([]));

    for target in ["processing", "shipped", "delivered", "cancelled", "failed"] {
        let (status, body) = s.move_to(target).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{target}");
        assert_eq!(body["kind"], "invalid_transition");
    }
    assert_eq!(s.status().await, "returned");

    // The item can still be resolved after the order is terminal
    let (status, body) = s
        .ctx
        .put(
            &format!("/api/admin/orders/{}/items/{}/return", s.order, s.item),
            &s.admin,
            &json!({ "accept": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["returnRequested"], false);
    assert_eq!(body["data"]["items"][0]["returnRequest"]["accepted"], true);
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_invalid_transition_leaves_status_unchanged() {
    let s = scenario().await;

    let (status, body) = s.move_to("delivered").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_transition");
    assert_eq!(body["success"], false);
    assert_eq!(s.status().await, "processing");

    let (status, body) = s.move_to("teleported").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_returned_requires_a_return_request() {
    let s = scenario().await;
    s.move_to("shipped").await;
    s.move_to("delivered").await;

    let (status, body) = s.move_to("returned").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_transition");
    assert_eq!(s.status().await, "delivered");
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_rejected_return_does_not_license_returned() {
    let s = scenario().await;
    s.move_to("shipped").await;
    s.move_to("delivered").await;

    let return_path = format!("/api/store/orders/{}/items/{}/return", s.order, s.item);
    let (status, _) = s.ctx.post(&return_path, &s.customer, &json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // A second request on the same item is refused
    let (status, body) = s.ctx.post(&return_path, &s.customer, &json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_error");

    let (status, _) = s
        .ctx
        .put(
            &format!("/api/admin/orders/{}/items/{}/return", s.order, s.item),
            &s.admin,
            &json!({ "accept": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = s.move_to("returned").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_transition");
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_return_on_someone_elses_order_is_not_found() {
    let s = scenario().await;
    s.move_to("shipped").await;
    s.move_to("delivered").await;

    let stranger = s.ctx.user(&format!("bob-{}", tag()), Role::Customer).await;
    let stranger = s.ctx.token(stranger);
    let (status, body) = s
        .ctx
        .post(
            &format!("/api/store/orders/{}/items/{}/return", s.order, s.item),
            &stranger,
            &json!({ "reason": "not mine" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
#[ignore = "Requires running admin server and database"]
async fn test_order_search_and_status_filter() {
    let s = scenario().await;
    let name = s
        .ctx
        .get(&format!("/api/admin/orders/{}", s.order), &s.admin)
        .await
        .1["data"]["customer"]["username"]
        .as_str()
        .unwrap()
        .to_string();

    let search = name.to_uppercase().replace(' ', "%20");
    let (status, body) = s
        .ctx
        .get(
            &format!("/api/admin/orders?search={search}&status=processing"),
            &s.admin,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], s.order);
    assert_eq!(items[0]["customerName"], name.as_str());

    let (_, body) = s
        .ctx
        .get(
            &format!("/api/admin/orders?search={search}&status=shipped"),
            &s.admin,
        )
        .await;
    assert_eq!(body["data"]["items"], json!([]));
    assert_eq!(body["data"]["totalPages"], 1);
}
