//! Order lifecycle service.
//!
//! Each operation is one read-modify-write: load the order, apply the
//! lifecycle rule from `larder-core`, then persist conditional on the version
//! that was read. A rule violation never reaches the store.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use larder_core::order::{LifecycleError, Order};
use larder_core::{OrderId, OrderItemId, OrderStatus, Principal};

use crate::db::{OrderRepository, RepositoryError};
use crate::error::AppError;

/// Errors raised by order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No such order, or not visible to the caller.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// A lifecycle rule rejected the operation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(_) => Self::NotFound(err.to_string()),
            OrderError::Lifecycle(e) => e.into(),
            OrderError::Repository(e) => e.into(),
        }
    }
}

/// Order lifecycle operations.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Load an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    pub async fn get(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .get_by_id(id)
            .await?
            .ok_or(OrderError::NotFound(id))
    }

    /// Move an order to `target`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Lifecycle` if the transition is not allowed, and
    /// a `Conflict` repository error if the order changed concurrently.
    #[instrument(skip(self), fields(order_id = %id, target = %target))]
    pub async fn change_status(&self, id: OrderId, target: OrderStatus) -> Result<Order, OrderError> {
        let mut order = self.get(id).await?;
        let from = order.status;
        order.transition(target)?;

        order.version = self
            .orders
            .update_status(id, order.status, order.version)
            .await?;

        tracing::info!(
            order_id = %id,
            order_number = %order.order_id,
            from = %from,
            to = %target,
            "Order status changed"
        );
        Ok(order)
    }

    /// Raise a return request on one item, on behalf of the order's owner.
    ///
    /// Orders that belong to someone else, or to a guest, are reported as not
    /// found.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for unknown or foreign orders and
    /// `OrderError::Lifecycle` if the request is not allowed.
    #[instrument(skip(self, reason), fields(order_id = %id, item_id = %item_id, user_id = %principal.id))]
    pub async fn raise_return(
        &self,
        principal: Principal,
        id: OrderId,
        item_id: OrderItemId,
        reason: Option<&str>,
    ) -> Result<Order, OrderError> {
        let mut order = self.get(id).await?;
        if order.customer.user_id() != Some(principal.id) {
            return Err(OrderError::NotFound(id));
        }

        order.raise_return(item_id, reason)?;
        self.save_item(&mut order, item_id).await?;

        tracing::info!(order_id = %id, item_id = %item_id, "Return requested");
        Ok(order)
    }

    /// Accept or reject an item's return request.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Lifecycle` if there is nothing to resolve.
    #[instrument(skip(self), fields(order_id = %id, item_id = %item_id))]
    pub async fn resolve_return(
        &self,
        id: OrderId,
        item_id: OrderItemId,
        accept: bool,
    ) -> Result<Order, OrderError> {
        let mut order = self.get(id).await?;
        order.resolve_return(item_id, accept)?;
        self.save_item(&mut order, item_id).await?;

        tracing::info!(order_id = %id, item_id = %item_id, accept, "Return resolved");
        Ok(order)
    }

    async fn save_item(&self, order: &mut Order, item_id: OrderItemId) -> Result<(), OrderError> {
        let item = order
            .item(item_id)
            .ok_or(LifecycleError::UnknownItem(item_id))?;
        let version = self.orders.save_return(order.id, item, order.version).await?;
        order.version = version;
        Ok(())
    }
}
