//! Seed the database with fixture data.
//!
//! Reads a YAML file of users, categories, products and orders and inserts
//! them through the admin repositories, so every row goes through the same
//! validation the service applies. The file is validated in full before the
//! first connection is opened.
//!
//! ```yaml
//! users:
//!   - username: anna
//!     email: anna@example.com
//!     role: customer
//! categories:
//!   - name: Spices
//! products:
//!   - name: Turmeric
//!     category: Spices
//!     variants:
//!       - availableQuantity: 40
//!         packSizePricing:
//!           - packSize: 100g
//!             salePrice: "4.50"
//! orders:
//!   - customer: anna
//!     status: delivered
//!     items:
//!       - product: Turmeric
//!         quantity: 2
//!         returnReason: Arrived damp
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use larder_admin::db::orders::{NewOrder, NewOrderCustomer, NewOrderItem};
use larder_admin::db::products::{NewProduct, NewVariant};
use larder_admin::db::users::NewUser;
use larder_admin::db::{CategoryRepository, OrderRepository, ProductRepository, UserRepository};
use larder_admin::services::OrderService;
use larder_core::catalog::{CategoryName, PackSizePrice};
use larder_core::order::GuestAddress;
use larder_core::{CategoryId, CategoryStatus, Email, OrderStatus, Price, Principal, ProductId, Role, UserId};

use super::{CliError, connect};

/// Top-level fixture document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<UserFixture>,
    #[serde(default)]
    pub categories: Vec<CategoryFixture>,
    #[serde(default)]
    pub products: Vec<ProductFixture>,
    #[serde(default)]
    pub orders: Vec<OrderFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserFixture {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryFixture {
    pub name: String,
    /// `active` (default) or `inactive`.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductFixture {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Category name, matched case-insensitively.
    pub category: String,
    #[serde(default)]
    pub un_listed: bool,
    pub variants: Vec<VariantFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VariantFixture {
    #[serde(default)]
    pub images: Vec<String>,
    pub pack_size_pricing: Vec<PackSizePrice>,
    pub available_quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderFixture {
    /// Username of a registered customer.
    #[serde(default)]
    pub customer: Option<String>,
    /// Shipping contact for a guest checkout.
    #[serde(default)]
    pub guest: Option<GuestAddress>,
    #[serde(default)]
    pub status: OrderStatus,
    pub items: Vec<OrderItemFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderItemFixture {
    /// Product name.
    pub product: String,
    pub quantity: i32,
    /// Raise a return request on this line after the order is created.
    #[serde(default)]
    pub return_reason: Option<String>,
}

impl ProductFixture {
    /// Lowest sale price across variants, used as the line price in orders.
    fn unit_price(&self) -> Option<Price> {
        self.variants
            .iter()
            .flat_map(|v| &v.pack_size_pricing)
            .map(|p| p.sale_price)
            .min()
    }
}

/// Check every cross-reference and value in the fixture.
///
/// Returns one message per problem; an empty list means the fixture is valid.
#[must_use]
pub fn validate(fixture: &Fixture) -> Vec<String> {
    let mut errors = Vec::new();

    let mut usernames = HashSet::new();
    for user in &fixture.users {
        if let Err(e) = Email::parse(&user.email) {
            errors.push(format!("user {}: {e}", user.username));
        }
        if !usernames.insert(user.username.as_str()) {
            errors.push(format!("user {}: duplicate username", user.username));
        }
    }

    let mut categories = HashSet::new();
    for category in &fixture.categories {
        if let Err(e) = CategoryName::parse(&category.name) {
            errors.push(format!("category {:?}: {e}", category.name));
        }
        if let Some(Err(e)) = category
            .status
            .as_ref()
            .map(|s| s.to_lowercase().parse::<CategoryStatus>())
        {
            errors.push(format!("category {}: {e}", category.name));
        }
        if !categories.insert(category.name.trim().to_lowercase()) {
            errors.push(format!("category {}: duplicate name", category.name));
        }
    }

    let mut products = HashSet::new();
    for product in &fixture.products {
        if !categories.contains(&product.category.trim().to_lowercase()) {
            errors.push(format!(
                "product {}: unknown category {}",
                product.name, product.category
            ));
        }
        if product.unit_price().is_none() {
            errors.push(format!("product {}: no pack size pricing", product.name));
        }
        if product.variants.iter().any(|v| v.available_quantity < 0) {
            errors.push(format!("product {}: negative available quantity", product.name));
        }
        products.insert(product.name.as_str());
    }

    for (index, order) in fixture.orders.iter().enumerate() {
        let label = format!("order #{}", index + 1);
        match (&order.customer, &order.guest) {
            (Some(username), None) => {
                let registered = fixture
                    .users
                    .iter()
                    .find(|u| &u.username == username);
                match registered {
                    Some(user) if user.role == Role::Customer => {}
                    Some(_) => errors.push(format!("{label}: {username} is not a customer")),
                    None => errors.push(format!("{label}: unknown customer {username}")),
                }
            }
            (None, Some(_)) => {
                if order.items.iter().any(|i| i.return_reason.is_some()) {
                    errors.push(format!("{label}: guest orders cannot request returns"));
                }
            }
            _ => errors.push(format!("{label}: set exactly one of customer or guest")),
        }
        if order.items.is_empty() {
            errors.push(format!("{label}: no items"));
        }
        for item in &order.items {
            if !products.contains(item.product.as_str()) {
                errors.push(format!("{label}: unknown product {}", item.product));
            }
            if item.quantity <= 0 {
                errors.push(format!("{label}: quantity must be positive"));
            }
            if item.return_reason.is_some() && !order.status.accepts_returns() {
                errors.push(format!(
                    "{label}: returns need a delivered order, not {}",
                    order.status
                ));
            }
        }
    }

    errors
}

/// Seed the database from a YAML fixture file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if a
/// database write fails.
pub async fn run(file_path: &str) -> Result<(), CliError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading fixture");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_string(),
            source,
        })?;
    let fixture: Fixture = serde_yaml::from_str(&content)?;

    let errors = validate(&fixture);
    if !errors.is_empty() {
        error!("Fixture validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::Invalid(format!(
            "{} validation errors found",
            errors.len()
        )));
    }

    let pool = connect().await?;

    let mut user_ids: HashMap<&str, UserId> = HashMap::new();
    let users = UserRepository::new(&pool);
    for user in &fixture.users {
        let created = users
            .create(&NewUser {
                username: user.username.clone(),
                email: Email::parse(&user.email).map_err(|e| CliError::Invalid(e.to_string()))?,
                phone: user.phone.clone(),
                role: user.role,
                is_blocked: user.blocked,
            })
            .await?;
        user_ids.insert(user.username.as_str(), created.id);
    }
    info!(count = user_ids.len(), "Users created");

    let mut category_ids: HashMap<String, CategoryId> = HashMap::new();
    let categories = CategoryRepository::new(&pool);
    for category in &fixture.categories {
        let name =
            CategoryName::parse(&category.name).map_err(|e| CliError::Invalid(e.to_string()))?;
        let created = categories.create(&name).await?;
        if let Some(status) = &category.status {
            let status: CategoryStatus = status
                .to_lowercase()
                .parse()
                .map_err(|e: larder_core::ParseStatusError| CliError::Invalid(e.to_string()))?;
            if status != created.status {
                categories.set_status(created.id, status).await?;
            }
        }
        category_ids.insert(category.name.trim().to_lowercase(), created.id);
    }
    info!(count = category_ids.len(), "Categories created");

    let mut product_ids: HashMap<&str, (ProductId, Price)> = HashMap::new();
    let products = ProductRepository::new(&pool);
    for product in &fixture.products {
        let category_id = category_ids
            .get(&product.category.trim().to_lowercase())
            .copied()
            .ok_or_else(|| CliError::Invalid(format!("unknown category {}", product.category)))?;
        let unit_price = product
            .unit_price()
            .ok_or_else(|| CliError::Invalid(format!("{} has no price", product.name)))?;
        let id = products
            .create(&NewProduct {
                name: product.name.clone(),
                sku: product.sku.clone(),
                category_id,
                un_listed: product.un_listed,
                variants: product
                    .variants
                    .iter()
                    .map(|v| NewVariant {
                        images: v.images.clone(),
                        pack_size_pricing: v.pack_size_pricing.clone(),
                        available_quantity: v.available_quantity,
                    })
                    .collect(),
            })
            .await?;
        product_ids.insert(product.name.as_str(), (id, unit_price));
    }
    info!(count = product_ids.len(), "Products created");

    let orders = OrderRepository::new(&pool);
    let service = OrderService::new(&pool);
    let mut returns = 0;
    for order in &fixture.orders {
        let customer = match (&order.customer, &order.guest) {
            (Some(username), _) => NewOrderCustomer::Registered(lookup(&user_ids, username)?),
            (None, Some(guest)) => NewOrderCustomer::Guest(guest.clone()),
            (None, None) => return Err(CliError::Invalid("order has no customer".to_string())),
        };
        let items = order
            .items
            .iter()
            .map(|item| {
                let (product_id, price) = lookup(&product_ids, &item.product)?;
                Ok(NewOrderItem {
                    product_id,
                    product_name: item.product.clone(),
                    quantity: item.quantity,
                    price,
                })
            })
            .collect::<Result<Vec<_>, CliError>>()?;

        let id = orders
            .create(&NewOrder {
                customer,
                status: order.status,
                items,
            })
            .await?;

        let Some(username) = &order.customer else {
            continue;
        };
        let principal = Principal {
            id: lookup(&user_ids, username)?,
            role: Role::Customer,
        };
        // Items come back in insertion order.
        let created = service.get(id).await?;
        for (line, item) in order.items.iter().zip(&created.items) {
            if let Some(reason) = &line.return_reason {
                service
                    .raise_return(principal, id, item.id, Some(reason))
                    .await?;
                returns += 1;
            }
        }
    }
    info!(count = fixture.orders.len(), returns, "Orders created");

    info!("Seeding complete!");
    Ok(())
}

fn lookup<T: Copy>(map: &HashMap<&str, T>, key: &str) -> Result<T, CliError> {
    map.get(key)
        .copied()
        .ok_or_else(|| CliError::Invalid(format!("unknown reference {key}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../../fixtures/demo.yaml");

    #[test]
    fn test_demo_fixture_is_valid() {
        let fixture: Fixture = serde_yaml::from_str(DEMO).unwrap();
        assert!(validate(&fixture).is_empty(), "{:?}", validate(&fixture));
        assert!(fixture.users.iter().any(|u| u.role == Role::Admin));
        assert!(fixture.orders.iter().any(|o| o.guest.is_some()));
    }

    #[test]
    fn test_prices_parse_from_strings() {
        let fixture: Fixture = serde_yaml::from_str(
            r#"
products:
  - name: Saffron
    category: Spices
    variants:
      - availableQuantity: 3
        packSizePricing:
          - packSize: 1g
            salePrice: "12.50"
          - packSize: 5g
            salePrice: "55.00"
            mrp: "60.00"
"#,
        )
        .unwrap();
        let price = fixture.products[0].unit_price().unwrap();
        assert_eq!(price.amount().to_string(), "12.50");
    }

    #[test]
    fn test_unknown_references_are_reported() {
        let fixture: Fixture = serde_yaml::from_str(
            r#"
users:
  - username: root
    email: root@example.com
    role: admin
orders:
  - customer: root
    items:
      - product: Ghost Pepper
        quantity: 0
  - items:
      - product: Ghost Pepper
        quantity: 1
"#,
        )
        .unwrap();
        let errors = validate(&fixture);
        assert!(errors.iter().any(|e| e.contains("root is not a customer")));
        assert!(errors.iter().any(|e| e.contains("unknown product Ghost Pepper")));
        assert!(errors.iter().any(|e| e.contains("quantity must be positive")));
        assert!(errors.iter().any(|e| e.contains("exactly one of customer or guest")));
    }

    #[test]
    fn test_returns_need_delivered_orders() {
        let fixture: Fixture = serde_yaml::from_str(
            r#"
users:
  - username: anna
    email: anna@example.com
    role: customer
categories:
  - name: Tea
products:
  - name: Assam
    category: tea
    variants:
      - availableQuantity: 10
        packSizePricing:
          - packSize: 250g
            salePrice: "8.00"
orders:
  - customer: anna
    status: shipped
    items:
      - product: Assam
        quantity: 1
        returnReason: Too strong
"#,
        )
        .unwrap();
        let errors = validate(&fixture);
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("returns need a delivered order"));
    }

    #[test]
    fn test_negative_stock_is_rejected() {
        let fixture: Fixture = serde_yaml::from_str(
            r#"
categories:
  - name: Tea
products:
  - name: Assam
    category: Tea
    variants:
      - availableQuantity: 4
        packSizePricing:
          - packSize: 250g
            salePrice: "8.00"
      - availableQuantity: -1
        packSizePricing:
          - packSize: 40 bags
            salePrice: "5.50"
"#,
        )
        .unwrap();
        let errors = validate(&fixture);
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("negative available quantity"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<Fixture, _> = serde_yaml::from_str("coupons: []");
        assert!(result.is_err());
    }
}
