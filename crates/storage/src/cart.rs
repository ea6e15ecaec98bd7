use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Duration;

use crate::{ProductId, Result, UserId};

/// Per-user cart storage: a field-per-product quantity map with a
/// refreshable lifetime.
///
/// Every call that touches a user's cart (read or write) restarts that cart's
/// lifetime at `ttl`. A cart whose lifetime has run out reads as empty.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Atomically adds `delta` to the stored quantity, creating the entry if
    /// absent, and returns the new quantity.
    ///
    /// Concurrent increments on the same key must never lose an update.
    async fn increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        delta: i64,
        ttl: Duration,
    ) -> Result<i64>;

    /// Overwrites the stored quantity.
    async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        ttl: Duration,
    ) -> Result<()>;

    /// Deletes the given entries and returns how many existed.
    async fn remove(&self, user_id: UserId, product_ids: &[ProductId], ttl: Duration)
    -> Result<u64>;

    /// Deletes the whole cart. Returns false if there was nothing to delete.
    async fn clear(&self, user_id: UserId) -> Result<bool>;

    /// Returns every entry of the cart.
    async fn load(&self, user_id: UserId, ttl: Duration) -> Result<BTreeMap<ProductId, i64>>;
}
