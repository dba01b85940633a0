//! Order lifecycle.
//!
//! Whole-order status moves along a fixed set of edges:
//!
//! ```text
//! processing ──► shipped ──► delivered ──► returned
//!     │             │
//!     ├─────────────┴──► cancelled
//!     └─────────────┴──► failed
//! ```
//!
//! `delivered → returned` additionally requires a return request on at least
//! one item that is still outstanding or was accepted. `cancelled`,
//! `returned` and `failed` have no outgoing edges.
//!
//! Return requests live on individual items and never change the whole-order
//! status by themselves. Every operation here validates first and mutates
//! only on success, so a rejected call leaves the order exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

/// Longest accepted return reason, in characters.
pub const MAX_RETURN_REASON_LENGTH: usize = 500;

/// Errors raised by lifecycle operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The requested status change is not an allowed edge.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// Returns can only be raised on delivered orders.
    #[error("returns can only be requested once an order is delivered (order is {status})")]
    ReturnNotAllowed {
        /// Current status.
        status: OrderStatus,
    },

    /// The item does not belong to this order.
    #[error("order item {0} not found")]
    UnknownItem(OrderItemId),

    /// A return was already requested for this item.
    #[error("a return has already been requested for item {0}")]
    ReturnAlreadyRequested(OrderItemId),

    /// There is no return request to resolve.
    #[error("item {0} has no return request")]
    NoReturnRequest(OrderItemId),

    /// The return request was already resolved.
    #[error("the return request for item {0} is already resolved")]
    ReturnAlreadyResolved(OrderItemId),

    /// Return reason exceeds [`MAX_RETURN_REASON_LENGTH`].
    #[error("return reason must be at most {max} characters")]
    ReasonTooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

impl OrderStatus {
    /// Statuses reachable from `self` in one administrator action, ignoring
    /// the return-request guard on `delivered → returned`.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Processing => &[Self::Shipped, Self::Cancelled, Self::Failed],
            Self::Shipped => &[Self::Delivered, Self::Cancelled, Self::Failed],
            Self::Delivered => &[Self::Returned],
            Self::Cancelled | Self::Returned | Self::Failed => &[],
        }
    }

    /// Whether no further whole-order change is possible.
    ///
    /// `delivered` is not terminal here because of the return edge.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned | Self::Failed)
    }

    /// Whether customers may raise return requests in this status.
    #[must_use]
    pub const fn accepts_returns(self) -> bool {
        matches!(self, Self::Delivered | Self::Returned)
    }
}

/// A customer's request to return one order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    /// Set when the customer raises the request.
    pub requested: bool,
    /// Free-text reason from the customer.
    pub reason: Option<String>,
    /// Set once an administrator accepts or rejects the request.
    pub resolved: bool,
    /// The administrator's decision, present once resolved.
    pub accepted: Option<bool>,
}

impl ReturnRequest {
    fn raised(reason: Option<String>) -> Self {
        Self {
            requested: true,
            reason,
            resolved: false,
            accepted: None,
        }
    }

    /// Requested and waiting on an administrator.
    #[must_use]
    pub const fn is_outstanding(&self) -> bool {
        self.requested && !self.resolved
    }

    /// Counts towards the `delivered → returned` guard: outstanding or accepted.
    #[must_use]
    pub fn licenses_return(&self) -> bool {
        self.requested && (!self.resolved || self.accepted == Some(true))
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    /// Product name captured at order time.
    pub product_name: String,
    pub quantity: i32,
    /// Unit price captured at order time.
    pub price: Price,
    pub return_request: Option<ReturnRequest>,
}

/// Shipping contact for an order placed without an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestAddress {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub line1: String,
    pub city: String,
    pub postal_code: String,
}

/// Who placed the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum OrderCustomer {
    /// A registered customer account.
    Registered {
        #[serde(rename = "userId")]
        user_id: UserId,
        username: String,
    },
    /// A guest checkout.
    Guest(GuestAddress),
}

impl OrderCustomer {
    /// Name shown in listings and matched by search.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Registered { username, .. } => username,
            Self::Guest(address) => &address.name,
        }
    }

    /// The owning account, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Registered { user_id, .. } => Some(*user_id),
            Self::Guest(_) => None,
        }
    }
}

/// An order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Human-facing order number (e.g. `ORD-7Q2K9X`).
    pub order_id: String,
    pub customer: OrderCustomer,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    /// Fixed at creation.
    pub total: Price,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the store on every write.
    pub version: i32,
}

impl Order {
    /// Listing flag: some item has a return nobody has resolved yet.
    #[must_use]
    pub fn return_requested(&self) -> bool {
        self.items
            .iter()
            .filter_map(|item| item.return_request.as_ref())
            .any(ReturnRequest::is_outstanding)
    }

    /// Whether the return-request guard on `delivered → returned` holds.
    #[must_use]
    pub fn has_licensing_return(&self) -> bool {
        self.items
            .iter()
            .filter_map(|item| item.return_request.as_ref())
            .any(ReturnRequest::licenses_return)
    }

    /// Check whether moving to `target` is allowed, without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] if `target` is not a
    /// successor of the current status, or if it is `returned` and no item
    /// carries a qualifying return request.
    pub fn check_transition(&self, target: OrderStatus) -> Result<(), LifecycleError> {
        let invalid = LifecycleError::InvalidTransition {
            from: self.status,
            to: target,
        };

        if !self.status.successors().contains(&target) {
            return Err(invalid);
        }
        if target == OrderStatus::Returned && !self.has_licensing_return() {
            return Err(invalid);
        }
        Ok(())
    }

    /// Move the order to `target`.
    ///
    /// # Errors
    ///
    /// See [`Order::check_transition`]. On error the order is unchanged.
    pub fn transition(&mut self, target: OrderStatus) -> Result<(), LifecycleError> {
        self.check_transition(target)?;
        self.status = target;
        Ok(())
    }

    /// Raise a return request on one item.
    ///
    /// The reason is trimmed; a blank reason is stored as `None`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::ReturnNotAllowed`] unless the order is delivered
    ///   (or already returned)
    /// - [`LifecycleError::UnknownItem`] if the item is not on this order
    /// - [`LifecycleError::ReturnAlreadyRequested`] if the item has a request
    /// - [`LifecycleError::ReasonTooLong`] if the reason is too long
    pub fn raise_return(
        &mut self,
        item_id: OrderItemId,
        reason: Option<&str>,
    ) -> Result<(), LifecycleError> {
        if !self.status.accepts_returns() {
            return Err(LifecycleError::ReturnNotAllowed {
                status: self.status,
            });
        }

        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToString::to_string);
        if reason
            .as_ref()
            .is_some_and(|r| r.chars().count() > MAX_RETURN_REASON_LENGTH)
        {
            return Err(LifecycleError::ReasonTooLong {
                max: MAX_RETURN_REASON_LENGTH,
            });
        }

        let item = self.item_mut(item_id)?;
        if item.return_request.as_ref().is_some_and(|r| r.requested) {
            return Err(LifecycleError::ReturnAlreadyRequested(item_id));
        }
        item.return_request = Some(ReturnRequest::raised(reason));
        Ok(())
    }

    /// Accept or reject an item's return request.
    ///
    /// Allowed in any whole-order status, including terminal ones.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::UnknownItem`] if the item is not on this order
    /// - [`LifecycleError::NoReturnRequest`] if nothing was requested
    /// - [`LifecycleError::ReturnAlreadyResolved`] if already decided
    pub fn resolve_return(
        &mut self,
        item_id: OrderItemId,
        accept: bool,
    ) -> Result<(), LifecycleError> {
        let item = self.item_mut(item_id)?;
        let request = item
            .return_request
            .as_mut()
            .filter(|r| r.requested)
            .ok_or(LifecycleError::NoReturnRequest(item_id))?;
        if request.resolved {
            return Err(LifecycleError::ReturnAlreadyResolved(item_id));
        }
        request.resolved = true;
        request.accepted = Some(accept);
        Ok(())
    }

    /// Look up one item.
    #[must_use]
    pub fn item(&self, item_id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    fn item_mut(&mut self, item_id: OrderItemId) -> Result<&mut OrderItem, LifecycleError> {
        self.items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(LifecycleError::UnknownItem(item_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn item(id: i32) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(id),
            product_id: ProductId::new(100 + id),
            product_name: format!("Item {id}"),
            quantity: 1,
            price: Price::new(Decimal::new(19_900, 2)).unwrap(),
            return_request: None,
        }
    }

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(1),
            order_id: "ORD-TEST01".to_string(),
            customer: OrderCustomer::Registered {
                user_id: UserId::new(9),
                username: "Anna K".to_string(),
            },
            items: vec![item(1), item(2)],
            status,
            total: Price::new(Decimal::new(39_800, 2)).unwrap(),
            created_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_allowed_edges() {
        use OrderStatus::{Cancelled, Delivered, Failed, Processing, Shipped};

        for (from, to) in [
            (Processing, Shipped),
            (Shipped, Delivered),
            (Processing, Cancelled),
            (Shipped, Cancelled),
            (Processing, Failed),
            (Shipped, Failed),
        ] {
            let mut o = order(from);
            assert!(o.transition(to).is_ok(), "{from} -> {to} should be allowed");
            assert_eq!(o.status, to);
        }
    }

    #[test]
    fn test_every_other_edge_is_rejected_and_leaves_status() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let allowed = from.successors().contains(to);
                if allowed {
                    continue;
                }
                let mut o = order(*from);
                let before = o.clone();
                let err = o.transition(*to).unwrap_err();
                assert_eq!(
                    err,
                    LifecycleError::InvalidTransition {
                        from: *from,
                        to: *to
                    }
                );
                assert_eq!(o, before);
            }
        }
    }

    #[test]
    fn test_processing_to_delivered_rejected() {
        let mut o = order(OrderStatus::Processing);
        assert!(matches!(
            o.transition(OrderStatus::Delivered),
            Err(LifecycleError::InvalidTransition { .. })
        ));
        assert_eq!(o.status, OrderStatus::Processing);
    }

    #[test]
    fn test_returned_requires_return_request() {
        let mut o = order(OrderStatus::Delivered);
        assert!(o.transition(OrderStatus::Returned).is_err());
        assert_eq!(o.status, OrderStatus::Delivered);

        o.raise_return(OrderItemId::new(2), Some("damaged")).unwrap();
        assert!(o.transition(OrderStatus::Returned).is_ok());
    }

    #[test]
    fn test_rejected_return_does_not_license_returned() {
        let mut o = order(OrderStatus::Delivered);
        o.raise_return(OrderItemId::new(1), None).unwrap();
        o.resolve_return(OrderItemId::new(1), false).unwrap();
        assert!(!o.has_licensing_return());
        assert!(o.transition(OrderStatus::Returned).is_err());
    }

    #[test]
    fn test_accepting_last_return_licenses_returned() {
        let mut o = order(OrderStatus::Delivered);
        o.raise_return(OrderItemId::new(1), None).unwrap();
        o.raise_return(OrderItemId::new(2), None).unwrap();
        o.resolve_return(OrderItemId::new(1), false).unwrap();
        o.resolve_return(OrderItemId::new(2), true).unwrap();
        assert!(!o.return_requested());
        assert!(o.transition(OrderStatus::Returned).is_ok());
    }

    #[test]
    fn test_return_not_allowed_before_delivery() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
        ] {
            let mut o = order(status);
            assert_eq!(
                o.raise_return(OrderItemId::new(1), None),
                Err(LifecycleError::ReturnNotAllowed { status })
            );
            assert!(o.items.iter().all(|i| i.return_request.is_none()));
        }
    }

    #[test]
    fn test_raise_return_does_not_change_status() {
        let mut o = order(OrderStatus::Delivered);
        o.raise_return(OrderItemId::new(1), Some("  too small  "))
            .unwrap();
        assert_eq!(o.status, OrderStatus::Delivered);
        let request = o.items[0].return_request.as_ref().unwrap();
        assert_eq!(request.reason.as_deref(), Some("too small"));
        assert!(o.return_requested());
    }

    #[test]
    fn test_raise_return_twice_rejected() {
        let mut o = order(OrderStatus::Delivered);
        o.raise_return(OrderItemId::new(1), None).unwrap();
        assert_eq!(
            o.raise_return(OrderItemId::new(1), None),
            Err(LifecycleError::ReturnAlreadyRequested(OrderItemId::new(1)))
        );
    }

    #[test]
    fn test_raise_return_reason_too_long() {
        let mut o = order(OrderStatus::Delivered);
        let reason = "x".repeat(MAX_RETURN_REASON_LENGTH + 1);
        assert!(matches!(
            o.raise_return(OrderItemId::new(1), Some(&reason)),
            Err(LifecycleError::ReasonTooLong { .. })
        ));
        assert!(o.items[0].return_request.is_none());
    }

    #[test]
    fn test_resolve_return_errors() {
        let mut o = order(OrderStatus::Delivered);
        assert_eq!(
            o.resolve_return(OrderItemId::new(1), true),
            Err(LifecycleError::NoReturnRequest(OrderItemId::new(1)))
        );
        assert_eq!(
            o.resolve_return(OrderItemId::new(77), true),
            Err(LifecycleError::UnknownItem(OrderItemId::new(77)))
        );

        o.raise_return(OrderItemId::new(1), None).unwrap();
        o.resolve_return(OrderItemId::new(1), true).unwrap();
        assert_eq!(
            o.resolve_return(OrderItemId::new(1), false),
            Err(LifecycleError::ReturnAlreadyResolved(OrderItemId::new(1)))
        );
        assert_eq!(
            o.items[0].return_request.as_ref().unwrap().accepted,
            Some(true)
        );
    }

    #[test]
    fn test_returns_resolvable_after_terminal_status() {
        let mut o = order(OrderStatus::Delivered);
        o.raise_return(OrderItemId::new(1), None).unwrap();
        o.raise_return(OrderItemId::new(2), None).unwrap();
        o.transition(OrderStatus::Returned).unwrap();

        assert!(o.resolve_return(OrderItemId::new(2), true).is_ok());
        assert!(o.return_requested());
    }

    #[test]
    fn test_end_to_end_lifecycle() {
        let mut o = order(OrderStatus::Processing);
        o.transition(OrderStatus::Shipped).unwrap();
        o.transition(OrderStatus::Delivered).unwrap();
        assert!(o.transition(OrderStatus::Returned).is_err());

        o.raise_return(OrderItemId::new(1), Some("wrong flavour"))
            .unwrap();
        o.transition(OrderStatus::Returned).unwrap();

        for target in OrderStatus::ALL {
            assert!(o.transition(*target).is_err());
        }
        assert_eq!(o.status, OrderStatus::Returned);
    }

    #[test]
    fn test_guest_display_name() {
        let customer = OrderCustomer::Guest(GuestAddress {
            name: "Walk-in Buyer".to_string(),
            email: None,
            phone: Some("555-0100".to_string()),
            line1: "1 Market St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
        });
        assert_eq!(customer.display_name(), "Walk-in Buyer");
        assert!(customer.user_id().is_none());
    }
}
