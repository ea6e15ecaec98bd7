//! Checkout error types.

use domain::DomainError;
use storage::ProductId;
use thiserror::Error;

/// Errors that can occur during checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A domain rule rejected the request. Nothing was committed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The order had no lines to purchase.
    #[error("Order has no lines")]
    EmptyOrder,

    /// A store failed part-way through order creation. Every reservation made
    /// for the order has been rolled back.
    #[error("Order creation failed: {reason}")]
    OrderCreation {
        reason: &'static str,
        #[source]
        source: DomainError,
    },

    /// No unused order number was found.
    #[error("No unique order number after {attempts} attempts")]
    OrderNoExhausted { attempts: u32 },

    /// The order changed status but some of its stock could not be returned.
    #[error("Stock not restored for order {order_no}: products {products:?}")]
    CompensationIncomplete {
        order_no: String,
        products: Vec<ProductId>,
    },
}

impl CheckoutError {
    /// Returns the wrapped domain error, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            CheckoutError::Domain(e) | CheckoutError::OrderCreation { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Returns true if the caller may retry the same call.
    pub fn is_transient(&self) -> bool {
        self.domain().is_some_and(DomainError::is_transient)
    }

    /// Short label used for the failure metric.
    pub fn reason_label(&self) -> &'static str {
        match self {
            CheckoutError::Domain(DomainError::InsufficientStock { .. }) => "insufficient_stock",
            CheckoutError::Domain(DomainError::ProductNotFound(_)) => "product_not_found",
            CheckoutError::Domain(DomainError::ProductUnavailable(_)) => "product_unavailable",
            CheckoutError::Domain(
                DomainError::InvalidQuantity { .. } | DomainError::InvalidShippingInfo(_),
            )
            | CheckoutError::EmptyOrder => "invalid_request",
            CheckoutError::Domain(_) | CheckoutError::OrderCreation { .. } => "storage",
            CheckoutError::OrderNoExhausted { .. } => "order_no_exhausted",
            CheckoutError::CompensationIncomplete { .. } => "compensation",
        }
    }
}

impl From<storage::StorageError> for CheckoutError {
    fn from(err: storage::StorageError) -> Self {
        CheckoutError::Domain(DomainError::Storage(err))
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
