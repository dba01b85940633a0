//! Order repository for database operations.
//!
//! Every write to an order is compare-and-swap on `orders.version`: the
//! caller passes the version it read, the statement only matches that
//! version, and a miss is reported as `RepositoryError::Conflict`.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use larder_core::listing::{ListRequest, Page};
use larder_core::order::{GuestAddress, Order, OrderCustomer, OrderItem, ReturnRequest};
use larder_core::{OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

use super::RepositoryError;
use super::listing::{like_pattern, limit_offset, row_total};
use crate::models::OrderSummary;

const ORDER_NUMBER_PREFIX: &str = "ORD-";
const ORDER_NUMBER_SUFFIX_LEN: usize = 6;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    user_id: Option<i32>,
    username: Option<String>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    guest_line1: Option<String>,
    guest_city: Option<String>,
    guest_postal_code: Option<String>,
    status: OrderStatus,
    total: Decimal,
    version: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    product_id: i32,
    product_name: String,
    quantity: i32,
    price: Decimal,
    return_requested: bool,
    return_reason: Option<String>,
    return_resolved: bool,
    return_accepted: Option<bool>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    id: i32,
    order_number: String,
    customer_name: String,
    status: OrderStatus,
    total: Decimal,
    item_count: i64,
    return_requested: bool,
    created_at: DateTime<Utc>,
}

fn price(amount: Decimal, what: &str) -> Result<Price, RepositoryError> {
    Price::new(amount).map_err(|e| RepositoryError::DataCorruption(format!("{what}: {e}")))
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let return_request = row.return_requested.then(|| ReturnRequest {
            requested: true,
            reason: row.return_reason,
            resolved: row.return_resolved,
            accepted: row.return_accepted,
        });

        Ok(Self {
            id: OrderItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            quantity: row.quantity,
            price: price(row.price, "order item price")?,
            return_request,
        })
    }
}

impl OrderRow {
    fn customer(&mut self) -> Result<OrderCustomer, RepositoryError> {
        let id = self.id;
        if let Some(user_id) = self.user_id {
            let username = self.username.take().ok_or_else(|| {
                RepositoryError::DataCorruption(format!("order {id} references a missing user"))
            })?;
            return Ok(OrderCustomer::Registered {
                user_id: UserId::new(user_id),
                username,
            });
        }

        let missing = || {
            RepositoryError::DataCorruption(format!("order {id} has an incomplete guest address"))
        };
        Ok(OrderCustomer::Guest(GuestAddress {
            name: self.guest_name.take().ok_or_else(missing)?,
            email: self.guest_email.take(),
            phone: self.guest_phone.take(),
            line1: self.guest_line1.take().ok_or_else(missing)?,
            city: self.guest_city.take().ok_or_else(missing)?,
            postal_code: self.guest_postal_code.take().ok_or_else(missing)?,
        }))
    }

    fn into_order(mut self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let customer = self.customer()?;
        Ok(Order {
            id: OrderId::new(self.id),
            order_id: self.order_number,
            customer,
            items,
            status: self.status,
            total: price(self.total, "order total")?,
            created_at: self.created_at,
            version: self.version,
        })
    }
}

impl TryFrom<OrderSummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: OrderSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            order_id: row.order_number,
            customer_name: row.customer_name,
            status: row.status,
            total: price(row.total, "order total")?,
            item_count: row.item_count,
            return_requested: row.return_requested,
            created_at: row.created_at,
        })
    }
}

/// Listing predicate. `$1` is an `ILIKE` pattern, `$2` the exact status.
const ORDER_FILTER: &str = r"
    ($1::text IS NULL
     OR o.order_number ILIKE $1 ESCAPE '\'
     OR COALESCE(u.username, o.guest_name) ILIKE $1 ESCAPE '\')
    AND ($2::order_status IS NULL OR o.status = $2)
";

const ORDER_SELECT: &str = r"
    SELECT o.id, o.order_number, o.user_id, u.username,
           o.guest_name, o.guest_email, o.guest_phone,
           o.guest_line1, o.guest_city, o.guest_postal_code,
           o.status, o.total, o.version, o.created_at
    FROM orders o
    LEFT JOIN users u ON u.id = o.user_id
";

const ITEM_COLUMNS: &str = "id, product_id, product_name, quantity, price, \
     return_requested, return_reason, return_resolved, return_accepted";

/// Who a new order is for.
#[derive(Debug, Clone)]
pub enum NewOrderCustomer {
    Registered(UserId),
    Guest(GuestAddress),
}

/// One line of a new order.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub price: Price,
}

/// Fields for a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer: NewOrderCustomer,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Sum of line totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the sum is not a valid price.
    pub fn total(&self) -> Result<Price, RepositoryError> {
        let sum: Decimal = self
            .items
            .iter()
            .map(|item| item.price.amount() * Decimal::from(item.quantity))
            .sum();
        price(sum, "order total")
    }
}

/// Generate a human-facing order number such as `ORD-7Q2K9X`.
#[must_use]
pub fn generate_order_number() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_uppercase())
        .collect();
    format!("{ORDER_NUMBER_PREFIX}{suffix}")
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Order listing, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, request), fields(page = request.page(), search = ?request.search()))]
    pub async fn list(
        &self,
        request: &ListRequest<OrderStatus>,
    ) -> Result<Page<OrderSummary>, RepositoryError> {
        let search = request.search().map(like_pattern);
        let status = request.status().as_option().copied();

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM orders o LEFT JOIN users u ON u.id = o.user_id \
             WHERE {ORDER_FILTER}"
        ))
        .bind(search.as_deref())
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let window = request.window(row_total(count)?);
        let (limit, offset) = limit_offset(&window)?;

        let rows = sqlx::query_as::<_, OrderSummaryRow>(&format!(
            r"
            SELECT o.id, o.order_number,
                   COALESCE(u.username, o.guest_name, '') AS customer_name,
                   o.status, o.total, o.created_at,
                   (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count,
                   EXISTS (
                       SELECT 1 FROM order_items i
                       WHERE i.order_id = o.id AND i.return_requested AND NOT i.return_resolved
                   ) AS return_requested
            FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            WHERE {ORDER_FILTER}
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(search.as_deref())
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<OrderSummary>, _>>()?;
        Ok(Page::new(items, &window))
    }

    /// Load an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<Vec<OrderItem>, _>>()?;

        row.into_order(items).map(Some)
    }

    /// Write a new whole-order status, conditional on `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order changed since it was read.
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        expected_version: i32,
    ) -> Result<i32, RepositoryError> {
        let version: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE orders SET status = $2, version = version + 1
            WHERE id = $1 AND version = $3
            RETURNING version
            ",
        )
        .bind(id)
        .bind(status)
        .bind(expected_version)
        .fetch_optional(self.pool)
        .await?;

        version.ok_or_else(stale_order)
    }

    /// Write one item's return request, conditional on `expected_version`.
    ///
    /// Bumps the order version and updates the item in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order changed since it was read.
    /// Returns `RepositoryError::NotFound` if the item is not on the order.
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, item), fields(order_id = %order_id, item_id = %item.id))]
    pub async fn save_return(
        &self,
        order_id: OrderId,
        item: &OrderItem,
        expected_version: i32,
    ) -> Result<i32, RepositoryError> {
        let request = item.return_request.as_ref();
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let version: i32 = sqlx::query_scalar(
            r"
            UPDATE orders SET version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            ",
        )
        .bind(order_id)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(stale_order)?;

        let updated = sqlx::query(
            r"
            UPDATE order_items
            SET return_requested = $3, return_reason = $4,
                return_resolved = $5, return_accepted = $6
            WHERE id = $1 AND order_id = $2
            ",
        )
        .bind(item.id)
        .bind(order_id)
        .bind(request.is_some_and(|r| r.requested))
        .bind(request.and_then(|r| r.reason.as_deref()))
        .bind(request.is_some_and(|r| r.resolved))
        .bind(request.and_then(|r| r.accepted))
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(version)
    }

    /// Create an order with its items. The total is the sum of line totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on an order number collision.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let total = order.total()?;
        let order_number = generate_order_number();
        let (user_id, guest) = match &order.customer {
            NewOrderCustomer::Registered(user_id) => (Some(*user_id), None),
            NewOrderCustomer::Guest(address) => (None, Some(address)),
        };

        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO orders (
                order_number, user_id, guest_name, guest_email, guest_phone,
                guest_line1, guest_city, guest_postal_code, status, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(&order_number)
        .bind(user_id)
        .bind(guest.map(|g| g.name.as_str()))
        .bind(guest.and_then(|g| g.email.as_deref()))
        .bind(guest.and_then(|g| g.phone.as_deref()))
        .bind(guest.map(|g| g.line1.as_str()))
        .bind(guest.map(|g| g.city.as_str()))
        .bind(guest.map(|g| g.postal_code.as_str()))
        .bind(order.status)
        .bind(total.amount())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            RepositoryError::from_unique(e, format!("order number {order_number} already exists"))
        })?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.price.amount())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(order_id = id, %order_number, "Order created");
        Ok(OrderId::new(id))
    }
}

fn stale_order() -> RepositoryError {
    RepositoryError::Conflict("order was modified by another request, reload and retry".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_shape() {
        let number = generate_order_number();
        assert!(number.starts_with("ORD-"));
        assert_eq!(number.len(), 10);
        assert!(
            number[4..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_new_order_total() {
        let order = NewOrder {
            customer: NewOrderCustomer::Registered(UserId::new(1)),
            status: OrderStatus::Processing,
            items: vec![
                NewOrderItem {
                    product_id: ProductId::new(1),
                    product_name: "Sencha".to_string(),
                    quantity: 2,
                    price: Price::new(Decimal::new(1_250, 2)).unwrap(),
                },
                NewOrderItem {
                    product_id: ProductId::new(2),
                    product_name: "Matcha".to_string(),
                    quantity: 1,
                    price: Price::new(Decimal::new(3_000, 2)).unwrap(),
                },
            ],
        };
        assert_eq!(order.total().unwrap().amount(), Decimal::new(5_500, 2));
    }
}
