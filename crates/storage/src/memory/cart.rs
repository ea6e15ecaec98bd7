use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::{CartRepository, ProductId, Result, StorageError, UserId};

#[derive(Debug)]
struct CartEntries {
    items: BTreeMap<ProductId, i64>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, CartEntries>,
    unavailable: bool,
}

impl InMemoryCartState {
    fn ensure_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(StorageError::Unavailable("cart store".to_string()));
        }
        Ok(())
    }

    /// Returns the live cart for writing, purging it first if it expired, and
    /// restarts its lifetime.
    fn touch(&mut self, user_id: UserId, ttl: Duration, now: DateTime<Utc>) -> &mut CartEntries {
        let cart = self.carts.entry(user_id).or_insert_with(|| CartEntries {
            items: BTreeMap::new(),
            expires_at: now,
        });
        if cart.expires_at <= now {
            cart.items.clear();
        }
        cart.expires_at = now + ttl;
        cart
    }

    fn drop_if_empty(&mut self, user_id: UserId) {
        if self
            .carts
            .get(&user_id)
            .is_some_and(|cart| cart.items.is_empty())
        {
            self.carts.remove(&user_id);
        }
    }
}

/// In-memory cart store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartRepository {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartRepository {
    /// Creates an empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StorageError::Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Returns the number of carts currently held, expired or not.
    pub async fn cart_count(&self) -> usize {
        self.state.read().await.carts.len()
    }

    /// Returns when the user's cart expires, if it exists.
    pub async fn expires_at(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .await
            .carts
            .get(&user_id)
            .map(|cart| cart.expires_at)
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        delta: i64,
        ttl: Duration,
    ) -> Result<i64> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        let cart = state.touch(user_id, ttl, Utc::now());
        let current = cart.items.get(&product_id).copied().unwrap_or(0);
        let new_quantity = current
            .checked_add(delta)
            .ok_or(StorageError::QuantityOverflow(product_id))?;
        cart.items.insert(product_id, new_quantity);
        if new_quantity <= 0 {
            cart.items.remove(&product_id);
        }
        state.drop_if_empty(user_id);
        Ok(new_quantity)
    }

    async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        ttl: Duration,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        let cart = state.touch(user_id, ttl, Utc::now());
        if quantity <= 0 {
            cart.items.remove(&product_id);
        } else {
            cart.items.insert(product_id, quantity);
        }
        state.drop_if_empty(user_id);
        Ok(())
    }

    async fn remove(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
        ttl: Duration,
    ) -> Result<u64> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        if !state.carts.contains_key(&user_id) {
            return Ok(0);
        }
        let cart = state.touch(user_id, ttl, Utc::now());
        let removed = product_ids
            .iter()
            .filter(|product_id| cart.items.remove(*product_id).is_some())
            .count() as u64;
        state.drop_if_empty(user_id);
        Ok(removed)
    }

    async fn clear(&self, user_id: UserId) -> Result<bool> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        let now = Utc::now();
        Ok(state
            .carts
            .remove(&user_id)
            .is_some_and(|cart| cart.expires_at > now && !cart.items.is_empty()))
    }

    async fn load(&self, user_id: UserId, ttl: Duration) -> Result<BTreeMap<ProductId, i64>> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        if !state.carts.contains_key(&user_id) {
            return Ok(BTreeMap::new());
        }
        let items = state.touch(user_id, ttl, Utc::now()).items.clone();
        state.drop_if_empty(user_id);
        Ok(items)
    }
}
