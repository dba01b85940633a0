//! Integration tests for Larder.
//!
//! The tests talk HTTP to a running admin service and insert their own rows
//! directly through the repositories, so they can run against a database
//! that already holds seed data. Every inserted name carries a random tag.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p larder-cli -- migrate
//!
//! # Start the service (same LARDER_CREDENTIAL_SECRET as the tests)
//! cargo run -p larder-admin
//!
//! # Run the ignored tests
//! cargo test -p larder-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_BASE_URL` - Service URL (default `http://localhost:3001`)
//! - `LARDER_DATABASE_URL` / `DATABASE_URL` - Database the service uses
//! - `LARDER_CREDENTIAL_SECRET` - Signing key shared with the service

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use larder_admin::config::{get_database_url, load_credential_secret};
use larder_admin::db::orders::{NewOrder, NewOrderCustomer, NewOrderItem};
use larder_admin::db::products::{NewProduct, NewVariant};
use larder_admin::db::users::NewUser;
use larder_admin::db::{self, CategoryRepository, OrderRepository, ProductRepository, UserRepository};
use larder_admin::services::CredentialVerifier;
use larder_admin::services::auth::DEFAULT_TTL;
use larder_core::catalog::{CategoryName, PackSizePrice};
use larder_core::{
    CategoryId, CategoryStatus, Email, OrderId, OrderStatus, Price, Principal, ProductId, Role,
};

/// Shared handles for one test.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub pool: PgPool,
    verifier: CredentialVerifier,
}

/// A short random tag that keeps test rows apart.
#[must_use]
pub fn tag() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

impl TestContext {
    /// Connect to the database and prepare a client.
    ///
    /// # Panics
    ///
    /// Panics if the environment is incomplete or the database is unreachable.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let base_url =
            std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());
        let database_url =
            get_database_url("LARDER_DATABASE_URL").expect("LARDER_DATABASE_URL not set");
        let secret = load_credential_secret("LARDER_CREDENTIAL_SECRET")
            .expect("LARDER_CREDENTIAL_SECRET missing or weak");
        let pool = db::create_pool(&database_url)
            .await
            .expect("Failed to connect to database");

        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            pool,
            verifier: CredentialVerifier::new(secret),
        }
    }

    /// Sign a credential for `principal`.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    #[must_use]
    pub fn token(&self, principal: Principal) -> String {
        self.verifier
            .issue(principal, DEFAULT_TTL)
            .expect("Failed to sign credential")
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    /// Insert an account and return its principal.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn user(&self, username: &str, role: Role) -> Principal {
        let local: String = username
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_lowercase();
        let email = Email::parse(&format!("{local}.{}@larder.test", tag())).expect("valid email");
        let user = UserRepository::new(&self.pool)
            .create(&NewUser {
                username: username.to_string(),
                email,
                phone: None,
                role,
                is_blocked: false,
            })
            .await
            .expect("Failed to create user");
        Principal { id: user.id, role }
    }

    /// Insert a category with the given status.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn category(&self, name: &str, status: CategoryStatus) -> CategoryId {
        let categories = CategoryRepository::new(&self.pool);
        let category = categories
            .create(&CategoryName::parse(name).expect("valid category name"))
            .await
            .expect("Failed to create category");
        if status != category.status {
            categories
                .set_status(category.id, status)
                .await
                .expect("Failed to set category status");
        }
        category.id
    }

    /// Insert a product with one variant priced at 10.00.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn product(&self, name: &str, category_id: CategoryId, un_listed: bool) -> ProductId {
        ProductRepository::new(&self.pool)
            .create(&NewProduct {
                name: name.to_string(),
                sku: Some(format!("IT-{}", tag().to_uppercase())),
                category_id,
                un_listed,
                variants: vec![NewVariant {
                    images: Vec::new(),
                    pack_size_pricing: vec![PackSizePrice {
                        pack_size: "100g".to_string(),
                        sale_price: unit_price(),
                        mrp: None,
                    }],
                    available_quantity: 12,
                }],
            })
            .await
            .expect("Failed to create product")
    }

    /// Insert an order for `customer` with one line per product.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn order(
        &self,
        customer: Principal,
        status: OrderStatus,
        products: &[ProductId],
    ) -> OrderId {
        let items = products
            .iter()
            .map(|&product_id| NewOrderItem {
                product_id,
                product_name: format!("Product {product_id}"),
                quantity: 1,
                price: unit_price(),
            })
            .collect();
        OrderRepository::new(&self.pool)
            .create(&NewOrder {
                customer: NewOrderCustomer::Registered(customer.id),
                status,
                items,
            })
            .await
            .expect("Failed to create order")
    }

    // =========================================================================
    // HTTP
    // =========================================================================

    /// GET `path` with a bearer credential.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent or the body is not JSON.
    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send request");
        read(response).await
    }

    /// PUT a JSON body to `path` with a bearer credential.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent or the body is not JSON.
    pub async fn put(&self, path: &str, token: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .put(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to send request");
        read(response).await
    }

    /// POST a JSON body to `path` with a bearer credential.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent or the body is not JSON.
    pub async fn post(&self, path: &str, token: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to send request");
        read(response).await
    }
}

fn unit_price() -> Price {
    Price::new(Decimal::new(1000, 2)).expect("positive price")
}

async fn read(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.json().await.expect("Response body is not JSON");
    (status, body)
}
