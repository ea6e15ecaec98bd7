//! Stock adjustments over the catalog.

use storage::{ProductCatalog, ProductId, StockAdjustment};
use tracing::{info, warn};

use crate::error::DomainError;

/// Atomic stock adjustment primitive.
///
/// Both operations delegate to a single conditional statement in the catalog;
/// the ledger never reads stock and writes it back in separate steps.
#[derive(Debug, Clone)]
pub struct InventoryLedger<P: ProductCatalog> {
    catalog: P,
}

impl<P: ProductCatalog> InventoryLedger<P> {
    /// Creates a ledger over the given catalog.
    pub fn new(catalog: P) -> Self {
        Self { catalog }
    }

    /// Returns the underlying catalog.
    pub fn catalog(&self) -> &P {
        &self.catalog
    }

    /// Reserves `quantity` units, returning the remaining stock.
    ///
    /// Fails with `InsufficientStock` and leaves stock untouched if fewer
    /// than `quantity` units are available.
    #[tracing::instrument(skip(self))]
    pub async fn decrease(&self, product_id: ProductId, quantity: i64) -> Result<i64, DomainError> {
        ensure_positive(product_id, quantity)?;

        let outcome = self
            .catalog
            .decrease_stock(product_id, quantity)
            .await
            .inspect_err(|_| record("decrease", "error"))?;

        match outcome {
            StockAdjustment::Applied { remaining } => {
                record("decrease", "applied");
                info!(%product_id, quantity, remaining, "Stock reserved");
                Ok(remaining)
            }
            StockAdjustment::Insufficient { available } => {
                record("decrease", "insufficient");
                warn!(%product_id, quantity, available, "Insufficient stock");
                Err(DomainError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available,
                })
            }
            StockAdjustment::NotFound => {
                record("decrease", "not_found");
                Err(DomainError::ProductNotFound(product_id))
            }
        }
    }

    /// Returns `quantity` units to stock, returning the new stock level.
    #[tracing::instrument(skip(self))]
    pub async fn increase(&self, product_id: ProductId, quantity: i64) -> Result<i64, DomainError> {
        ensure_positive(product_id, quantity)?;

        let outcome = self
            .catalog
            .increase_stock(product_id, quantity)
            .await
            .inspect_err(|_| record("increase", "error"))?;

        match outcome {
            StockAdjustment::Applied { remaining } => {
                record("increase", "applied");
                info!(%product_id, quantity, remaining, "Stock restored");
                Ok(remaining)
            }
            StockAdjustment::Insufficient { .. } | StockAdjustment::NotFound => {
                record("increase", "not_found");
                Err(DomainError::ProductNotFound(product_id))
            }
        }
    }
}

fn ensure_positive(product_id: ProductId, quantity: i64) -> Result<(), DomainError> {
    if quantity <= 0 {
        return Err(DomainError::InvalidQuantity {
            product_id,
            quantity,
        });
    }
    Ok(())
}

fn record(direction: &'static str, outcome: &'static str) {
    metrics::counter!(
        "stock_adjustments_total",
        "direction" => direction,
        "outcome" => outcome
    )
    .increment(1);
}
