use std::collections::HashMap;

use async_trait::async_trait;

use crate::{NewOrder, Order, OrderId, OrderItem, Result, StatusChange, UserId};

/// Durable order storage keyed by order id and by unique order number, with a
/// child collection of items per order.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Returns true if an order with this number is already persisted.
    async fn order_no_exists(&self, order_no: &str) -> Result<bool>;

    /// Persists the header and all items together, or nothing.
    ///
    /// Fails with `StorageError::DuplicateOrderNo` if the number is taken.
    async fn insert(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>)>;

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>>;

    async fn find_by_order_no(&self, order_no: &str) -> Result<Option<Order>>;

    /// Returns the user's orders, newest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Returns the items of one order.
    async fn items_for(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Returns the items of several orders in one round trip.
    async fn items_for_orders(&self, order_ids: &[OrderId])
    -> Result<HashMap<OrderId, Vec<OrderItem>>>;

    /// Applies `change` only if the stored status still equals `change.from`.
    ///
    /// Returns the updated order, or `None` if the precondition no longer
    /// held (or the order does not exist). Never overwrites a status set by a
    /// concurrent caller.
    async fn compare_and_set_status(&self, change: StatusChange) -> Result<Option<Order>>;
}
