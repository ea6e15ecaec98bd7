use thiserror::Error;

use crate::ProductId;

/// Errors that can occur when interacting with a backing store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An order with the same order number is already persisted.
    #[error("Order number already exists: {0}")]
    DuplicateOrderNo(String),

    /// A cart quantity would no longer fit in its column. Nothing was written.
    #[error("Cart quantity overflow for product {0}")]
    QuantityOverflow(ProductId),

    /// A stored value could not be decoded.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl StorageError {
    /// Returns true if the failure says nothing about the stored state and the
    /// caller may retry the same call.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Unavailable(_) => true,
            StorageError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;
