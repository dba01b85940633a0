//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                      - Liveness
//! GET  /health/ready                                - Database ping
//!
//! # Admin (role: admin)
//! GET  /api/admin/customers                         - Customer listing
//! GET  /api/admin/customers/{id}                    - Customer detail
//! PUT  /api/admin/customers/{id}/block              - Block or unblock
//! GET  /api/admin/orders                            - Order listing
//! GET  /api/admin/orders/{id}                       - Order detail
//! PUT  /api/admin/orders/{id}/status                - Change status
//! PUT  /api/admin/orders/{id}/items/{item_id}/return - Resolve a return
//! GET  /api/admin/products                          - Product listing
//! GET  /api/admin/products/{id}                     - Product detail
//! PUT  /api/admin/products/{id}/listing             - Toggle listing
//! GET  /api/admin/categories                        - All categories
//! POST /api/admin/categories                        - Create
//! PUT  /api/admin/categories/{id}                   - Rename
//! PUT  /api/admin/categories/{id}/status            - Activate or deactivate
//! GET  /api/admin/coupons                           - Coupon listing
//!
//! # Storefront (role: customer)
//! GET  /api/store/products                          - Visible products
//! POST /api/store/orders/{id}/items/{item_id}/return - Request a return
//! GET  /api/store/coupons/{code}                    - Resolve a coupon
//! ```
//!
//! Successful responses use the envelope `{success, message, data}`; errors
//! use `{success, message, kind}` (see [`crate::error::AppError`]).

pub mod categories;
pub mod coupons;
pub mod customers;
pub mod orders;
pub mod products;
pub mod store;

use std::str::FromStr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use larder_core::listing::{ListRequest, ListView};

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

/// Success body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

/// Handler result carrying the success envelope.
pub type ApiResult<T> = Result<Json<Envelope<T>>, AppError>;

/// Wrap `data` in a success envelope.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        message: message.into(),
        data,
    }))
}

/// Query string shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
}

impl ListParams {
    /// Validate the parameters for `view`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an unknown status filter.
    pub fn into_request<S: FromStr>(self, view: ListView) -> Result<ListRequest<S>, AppError> {
        Ok(ListRequest::new(
            view,
            self.page,
            self.limit,
            self.search.as_deref(),
            self.status.as_deref(),
        )?)
    }
}

/// Parse a status-like field from a request body.
pub(crate) fn parse_field<T: FromStr>(field: &str, value: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::Validation(format!("{field}: {e}")))
}

/// All routes, without state.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        // Customers
        .route("/api/admin/customers", get(customers::index))
        .route("/api/admin/customers/{id}", get(customers::show))
        .route("/api/admin/customers/{id}/block", put(customers::set_blocked))
        // Orders
        .route("/api/admin/orders", get(orders::index))
        .route("/api/admin/orders/{id}", get(orders::show))
        .route("/api/admin/orders/{id}/status", put(orders::change_status))
        .route(
            "/api/admin/orders/{id}/items/{item_id}/return",
            put(orders::resolve_return),
        )
        // Products
        .route("/api/admin/products", get(products::index))
        .route("/api/admin/products/{id}", get(products::show))
        .route("/api/admin/products/{id}/listing", put(products::toggle_listing))
        // Categories
        .route(
            "/api/admin/categories",
            get(categories::index).post(categories::create),
        )
        .route("/api/admin/categories/{id}", put(categories::rename))
        .route("/api/admin/categories/{id}/status", put(categories::set_status))
        // Coupons
        .route("/api/admin/coupons", get(coupons::index))
        // Storefront
        .route("/api/store/products", get(store::products))
        .route(
            "/api/store/orders/{id}/items/{item_id}/return",
            post(store::request_return),
        )
        .route("/api/store/coupons/{code}", get(coupons::resolve))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match db::ping(state.pool()).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use larder_core::{CustomerState, OrderStatus};

    use super::*;

    #[test]
    fn test_list_params_defaults() {
        let request: ListRequest<OrderStatus> =
            ListParams::default().into_request(ListView::Orders).unwrap();
        assert_eq!(request.page(), 1);
        assert_eq!(request.page_size(), 5);
    }

    #[test]
    fn test_list_params_unknown_status_is_validation_error() {
        let params = ListParams {
            status: Some("frozen".to_string()),
            ..ListParams::default()
        };
        let err = params
            .into_request::<CustomerState>(ListView::Customers)
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_parse_field() {
        let status: OrderStatus = parse_field("targetStatus", " shipped ").unwrap();
        assert_eq!(status, OrderStatus::Shipped);

        let err = parse_field::<OrderStatus>("targetStatus", "teleported").unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    mod http {
        use std::time::Duration;

        use axum::body::Body;
        use axum::http::{Request, header};
        use secrecy::SecretString;
        use sqlx::postgres::PgPoolOptions;
        use tower::ServiceExt;

        use larder_core::{Principal, Role, UserId};

        use axum::http::StatusCode;

        use crate::config::{AdminConfig, DEFAULT_COOKIE_NAME};
        use crate::routes::routes;
        use crate::services::auth::DEFAULT_TTL;
        use crate::state::AppState;

        const SECRET: &str = "q8Vn2#Lr7!Xp4@Tz9$Kb1^Wm6&Hd3*Js";

        /// State whose pool points at a closed port: any store access fails fast.
        fn state() -> AppState {
            let config = AdminConfig {
                database_url: SecretString::from("postgres://larder@127.0.0.1:1/larder"),
                host: "127.0.0.1".parse().unwrap(),
                port: 3001,
                credential_secret: SecretString::from(SECRET),
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
                log_json: false,
                sentry_dsn: None,
                sentry_environment: None,
                sentry_sample_rate: 1.0,
                sentry_traces_sample_rate: 0.1,
                tls: None,
            };
            let pool = PgPoolOptions::new()
                .acquire_timeout(Duration::from_millis(250))
                .connect_lazy("postgres://larder@127.0.0.1:1/larder")
                .unwrap();
            AppState::new(config, pool)
        }

        fn token(state: &AppState, role: Role) -> String {
            let principal = Principal {
                id: UserId::new(1),
                role,
            };
            state.verifier().issue(principal, DEFAULT_TTL).unwrap()
        }

        async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
            let response = routes().with_state(state).oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            (status, body)
        }

        fn get(uri: &str) -> axum::http::request::Builder {
            Request::builder().method("GET").uri(uri)
        }

        #[tokio::test]
        async fn test_missing_credential_is_unauthenticated() {
            let (status, body) = send(
                state(),
                get("/api/admin/orders").body(Body::empty()).unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["kind"], "unauthenticated");
            assert_eq!(body["success"], false);
        }

        #[tokio::test]
        async fn test_expired_credential_is_session_expired() {
            let state = state();
            let expired = state
                .verifier()
                .issue_until(
                    Principal {
                        id: UserId::new(1),
                        role: Role::Admin,
                    },
                    chrono::Utc::now() - chrono::Duration::minutes(1),
                )
                .unwrap();
            let (status, body) = send(
                state,
                get("/api/admin/customers")
                    .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["kind"], "session_expired");
        }

        #[tokio::test]
        async fn test_customer_credential_is_forbidden_on_admin_routes() {
            let state = state();
            let customer = token(&state, Role::Customer);
            for uri in [
                "/api/admin/orders",
                "/api/admin/customers",
                "/api/admin/products",
                "/api/admin/categories",
                "/api/admin/coupons",
            ] {
                let (status, body) = send(
                    state.clone(),
                    get(uri)
                        .header(header::COOKIE, format!("{DEFAULT_COOKIE_NAME}={customer}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await;
                assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
                assert_eq!(body["kind"], "forbidden");
            }
        }

        #[tokio::test]
        async fn test_admin_credential_is_forbidden_on_store_routes() {
            let state = state();
            let admin = token(&state, Role::Admin);
            let (status, body) = send(
                state,
                get("/api/store/coupons/SAVE10")
                    .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["kind"], "forbidden");
        }

        #[tokio::test]
        async fn test_tampered_credential_is_unauthenticated() {
            let state = state();
            let mut forged = token(&state, Role::Customer);
            forged.push('0');
            let (status, body) = send(
                state,
                get("/api/admin/orders")
                    .header(header::AUTHORIZATION, format!("Bearer {forged}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["kind"], "unauthenticated");
        }

        #[tokio::test]
        async fn test_store_outage_is_query_failed() {
            let state = state();
            let admin = token(&state, Role::Admin);
            let (status, body) = send(
                state,
                get("/api/admin/orders")
                    .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body["kind"], "query_failed");
        }

        #[tokio::test]
        async fn test_health() {
            let (status, _) = send(state(), get("/health").body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[test]
    fn test_envelope_shape() {
        let Json(envelope) = ok("Fetched", vec![1, 2]).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Fetched");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }
}
