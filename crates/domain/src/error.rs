//! Domain error types.

use storage::{OrderStatus, ProductId, StorageError, UserId};
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A conditional stock decrement was refused. Stock is untouched.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// The product does not exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product exists but cannot be sold.
    #[error("Product unavailable: {0}")]
    ProductUnavailable(ProductId),

    /// A quantity that must be positive was not.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// Shipping details failed validation.
    #[error("Invalid shipping info: {0}")]
    InvalidShippingInfo(String),

    /// The transition is not legal from the order's current status.
    #[error("Cannot {action} order {order_no} in status {current}")]
    InvalidOperation {
        order_no: String,
        current: OrderStatus,
        action: &'static str,
    },

    /// The caller does not own the order.
    #[error("Order {order} does not belong to user {user_id}")]
    OwnershipViolation { order: String, user_id: UserId },

    /// No order matches the given id or number.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// A backing store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DomainError {
    /// Returns true if the caller may retry the same call.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage(e) if e.is_transient())
    }
}
