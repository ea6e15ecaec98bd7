use async_trait::async_trait;

use crate::{Product, ProductId, Result};

/// Outcome of a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    /// The adjustment was applied; `remaining` is the stock afterwards.
    Applied { remaining: i64 },

    /// A decrement was refused because stock was below the requested amount.
    /// Stock is untouched.
    Insufficient { available: i64 },

    /// No such product.
    NotFound,
}

/// The catalog collaborator: authoritative product records plus atomic stock
/// primitives.
///
/// `decrease_stock` is a single conditional decrement. An implementation must
/// never read the stock, compare, and write it back in separate steps.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up a product.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Decrements stock by `quantity` only if at least `quantity` is available.
    async fn decrease_stock(&self, product_id: ProductId, quantity: i64)
    -> Result<StockAdjustment>;

    /// Unconditionally increments stock by `quantity`.
    async fn increase_stock(&self, product_id: ProductId, quantity: i64)
    -> Result<StockAdjustment>;
}
