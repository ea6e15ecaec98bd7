use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::Money;
use tokio::sync::RwLock;

use crate::{
    Product, ProductCatalog, ProductId, ProductStatus, Result, StockAdjustment, StorageError,
};

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, Product>,
    unavailable: bool,
    failing_lookups: HashSet<ProductId>,
    failing_adjustments: HashSet<ProductId>,
}

impl InMemoryCatalogState {
    fn ensure_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(StorageError::Unavailable("catalog".to_string()));
        }
        Ok(())
    }

    fn ensure_adjustable(&self, product_id: ProductId) -> Result<()> {
        self.ensure_available()?;
        if self.failing_adjustments.contains(&product_id) {
            return Err(StorageError::Unavailable(format!(
                "stock adjustment for product {product_id}"
            )));
        }
        Ok(())
    }
}

/// In-memory product catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryProductCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub async fn insert(&self, product: Product) {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product);
    }

    /// Returns the current stock of a product.
    pub async fn stock_of(&self, product_id: ProductId) -> Option<i64> {
        self.state
            .read()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock_quantity)
    }

    /// Changes a product's listing status.
    pub async fn set_status(&self, product_id: ProductId, status: ProductStatus) {
        if let Some(product) = self.state.write().await.products.get_mut(&product_id) {
            product.status = status;
        }
    }

    /// Changes a product's price.
    pub async fn set_price(&self, product_id: ProductId, price: Money) {
        if let Some(product) = self.state.write().await.products.get_mut(&product_id) {
            product.price = price;
        }
    }

    /// Makes every subsequent call fail with `StorageError::Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Makes lookups of one product fail.
    pub async fn fail_lookups_for(&self, product_id: ProductId) {
        self.state.write().await.failing_lookups.insert(product_id);
    }

    /// Makes stock adjustments of one product fail without touching stock.
    pub async fn fail_adjustments_for(&self, product_id: ProductId) {
        self.state
            .write()
            .await
            .failing_adjustments
            .insert(product_id);
    }

    /// Removes all injected failures.
    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.unavailable = false;
        state.failing_lookups.clear();
        state.failing_adjustments.clear();
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        if state.failing_lookups.contains(&product_id) {
            return Err(StorageError::Unavailable(format!(
                "lookup of product {product_id}"
            )));
        }
        Ok(state.products.get(&product_id).cloned())
    }

    async fn decrease_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<StockAdjustment> {
        let mut state = self.state.write().await;
        state.ensure_adjustable(product_id)?;

        let Some(product) = state.products.get_mut(&product_id) else {
            return Ok(StockAdjustment::NotFound);
        };
        if product.stock_quantity < quantity {
            return Ok(StockAdjustment::Insufficient {
                available: product.stock_quantity,
            });
        }
        product.stock_quantity -= quantity;
        Ok(StockAdjustment::Applied {
            remaining: product.stock_quantity,
        })
    }

    async fn increase_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<StockAdjustment> {
        let mut state = self.state.write().await;
        state.ensure_adjustable(product_id)?;

        let Some(product) = state.products.get_mut(&product_id) else {
            return Ok(StockAdjustment::NotFound);
        };
        product.stock_quantity += quantity;
        Ok(StockAdjustment::Applied {
            remaining: product.stock_quantity,
        })
    }
}
