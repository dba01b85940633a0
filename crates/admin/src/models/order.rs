//! Order views for the admin API.

use chrono::{DateTime, Utc};
use serde::Serialize;

use larder_core::order::Order;
use larder_core::{OrderId, OrderStatus, Price};

/// One row of the admin order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    /// Human-facing order number.
    pub order_id: String,
    /// Username for registered customers, guest name otherwise.
    pub customer_name: String,
    pub status: OrderStatus,
    pub total: Price,
    pub item_count: i64,
    /// Some item has an unresolved return request.
    pub return_requested: bool,
    pub created_at: DateTime<Utc>,
}

/// Order detail: the order plus its derived return flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub return_requested: bool,
    /// Statuses the order can move to next.
    pub next_statuses: Vec<OrderStatus>,
}

impl From<Order> for OrderDetail {
    fn from(order: Order) -> Self {
        let return_requested = order.return_requested();
        let next_statuses = order
            .status
            .successors()
            .iter()
            .copied()
            .filter(|&s| order.check_transition(s).is_ok())
            .collect();
        Self {
            order,
            return_requested,
            next_statuses,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use larder_core::order::{OrderCustomer, OrderItem};
    use larder_core::{OrderItemId, ProductId, UserId};
    use rust_decimal::Decimal;

    use super::*;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(1),
            order_id: "ORD-AB12CD".to_string(),
            customer: OrderCustomer::Registered {
                user_id: UserId::new(7),
                username: "Anna K".to_string(),
            },
            items: vec![OrderItem {
                id: OrderItemId::new(1),
                product_id: ProductId::new(3),
                product_name: "Sencha".to_string(),
                quantity: 1,
                price: Price::new(Decimal::new(1_250, 2)).unwrap(),
                return_request: None,
            }],
            status,
            total: Price::new(Decimal::new(1_250, 2)).unwrap(),
            created_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_detail_lists_next_statuses() {
        let detail = OrderDetail::from(order(OrderStatus::Processing));
        assert_eq!(
            detail.next_statuses,
            vec![OrderStatus::Shipped, OrderStatus::Cancelled, OrderStatus::Failed]
        );
        assert!(!detail.return_requested);
    }

    #[test]
    fn test_delivered_without_return_has_no_next_status() {
        let detail = OrderDetail::from(order(OrderStatus::Delivered));
        assert!(detail.next_statuses.is_empty());

        let mut delivered = order(OrderStatus::Delivered);
        delivered.raise_return(OrderItemId::new(1), Some("damaged")).unwrap();
        let detail = OrderDetail::from(delivered);
        assert_eq!(detail.next_statuses, vec![OrderStatus::Returned]);
        assert!(detail.return_requested);
    }

    #[test]
    fn test_detail_serializes_flat() {
        let json = serde_json::to_value(OrderDetail::from(order(OrderStatus::Shipped))).unwrap();
        assert_eq!(json["orderId"], "ORD-AB12CD");
        assert_eq!(json["status"], "shipped");
        assert_eq!(json["customer"]["type"], "registered");
        assert_eq!(json["returnRequested"], false);
    }
}
