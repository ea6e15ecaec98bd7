//! Per-user shopping carts.
//!
//! A cart is a wish-list, not a reservation: adding an item never checks or
//! holds stock. Availability is only enforced at checkout.

mod snapshot;

pub use snapshot::{CartLine, CartSnapshot, UNAVAILABLE_NAME};

use std::collections::BTreeMap;

use storage::{CartRepository, ProductCatalog, ProductId, StorageError, UserId};
use tracing::{info, warn};

use crate::error::DomainError;
use crate::settings::CartSettings;

/// Service for managing carts.
#[derive(Debug, Clone)]
pub struct CartStore<C: CartRepository, P: ProductCatalog> {
    repository: C,
    catalog: P,
    settings: CartSettings,
}

impl<C: CartRepository, P: ProductCatalog> CartStore<C, P> {
    /// Creates a new cart store.
    pub fn new(repository: C, catalog: P, settings: CartSettings) -> Self {
        Self {
            repository,
            catalog,
            settings,
        }
    }

    /// Atomically adds `delta` units of a product and returns the new
    /// quantity.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, DomainError> {
        if delta <= 0 {
            return Err(DomainError::InvalidQuantity {
                product_id,
                quantity: delta,
            });
        }

        let quantity = self
            .repository
            .increment(user_id, product_id, delta, self.settings.ttl)
            .await
            .map_err(|e| match e {
                StorageError::QuantityOverflow(product_id) => DomainError::InvalidQuantity {
                    product_id,
                    quantity: delta,
                },
                other => other.into(),
            })?;
        metrics::counter!("cart_operations_total", "op" => "add").increment(1);
        info!(%user_id, %product_id, delta, quantity, "Added to cart");
        Ok(quantity)
    }

    /// Overwrites the quantity of a product. A quantity of zero or less
    /// removes the entry.
    #[tracing::instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), DomainError> {
        if quantity <= 0 {
            self.remove_item(user_id, product_id).await?;
            return Ok(());
        }

        self.repository
            .set_quantity(user_id, product_id, quantity, self.settings.ttl)
            .await?;
        metrics::counter!("cart_operations_total", "op" => "set").increment(1);
        info!(%user_id, %product_id, quantity, "Updated cart quantity");
        Ok(())
    }

    /// Removes one product. Returns false if it was not in the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, DomainError> {
        let removed = self.remove_items(user_id, &[product_id]).await?;
        if removed == 0 {
            warn!(%user_id, %product_id, "Item not found in cart to remove");
        }
        Ok(removed > 0)
    }

    /// Removes several products and returns how many were present.
    #[tracing::instrument(skip(self))]
    pub async fn remove_items(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<u64, DomainError> {
        if product_ids.is_empty() {
            return Ok(0);
        }

        let removed = self
            .repository
            .remove(user_id, product_ids, self.settings.ttl)
            .await?;
        metrics::counter!("cart_operations_total", "op" => "remove").increment(1);
        info!(%user_id, requested = product_ids.len(), removed, "Removed cart items");
        Ok(removed)
    }

    /// Empties the cart. Returns false if it was already empty.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<bool, DomainError> {
        let cleared = self.repository.clear(user_id).await?;
        metrics::counter!("cart_operations_total", "op" => "clear").increment(1);
        info!(%user_id, cleared, "Cleared cart");
        Ok(cleared)
    }

    /// Returns the raw product quantities without catalog enrichment.
    #[tracing::instrument(skip(self))]
    pub async fn entries(&self, user_id: UserId) -> Result<BTreeMap<ProductId, i64>, DomainError> {
        Ok(self.repository.load(user_id, self.settings.ttl).await?)
    }

    /// Returns the cart enriched with live catalog data.
    ///
    /// A product that is missing, inactive, or whose lookup fails stays in the
    /// snapshot as an invalid line. Only a failure of the cart store itself
    /// fails the call.
    #[tracing::instrument(skip(self))]
    pub async fn snapshot(&self, user_id: UserId) -> Result<CartSnapshot, DomainError> {
        let entries = self.entries(user_id).await?;
        metrics::counter!("cart_operations_total", "op" => "snapshot").increment(1);

        let mut lines = Vec::with_capacity(entries.len());
        for (product_id, quantity) in entries {
            let line = match self.catalog.get_product(product_id).await {
                Ok(Some(product)) if product.is_active() => {
                    let line = CartLine::priced(&product, quantity);
                    if !line.available {
                        warn!(%user_id, %product_id, quantity, "Cart line total overflows");
                    }
                    line
                }
                Ok(Some(product)) => {
                    warn!(
                        %user_id,
                        %product_id,
                        status = ?product.status,
                        "Cart product is not on sale"
                    );
                    CartLine::inactive(&product, quantity)
                }
                Ok(None) => {
                    warn!(%user_id, %product_id, "Cart product not found");
                    CartLine::unresolved(product_id, quantity)
                }
                Err(e) => {
                    warn!(%user_id, %product_id, error = %e, "Cart product lookup failed");
                    CartLine::unresolved(product_id, quantity)
                }
            };
            lines.push(line);
        }

        Ok(CartSnapshot::from_lines(user_id, lines))
    }
}
