use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    NewOrder, Order, OrderId, OrderItem, OrderRepository, OrderStatus, Result, StatusChange,
    StorageError, UserId,
};

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: BTreeMap<OrderId, Order>,
    by_order_no: HashMap<String, OrderId>,
    items: HashMap<OrderId, Vec<OrderItem>>,
    next_id: i64,
    unavailable: bool,
    fail_on_insert: bool,
    order_no_lookup_misses: bool,
}

impl InMemoryOrderState {
    fn ensure_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(StorageError::Unavailable("order store".to_string()));
        }
        Ok(())
    }
}

/// In-memory order store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderRepository {
    /// Creates an empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StorageError::Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Makes subsequent inserts fail without persisting anything.
    pub async fn set_fail_on_insert(&self, fail: bool) {
        self.state.write().await.fail_on_insert = fail;
    }

    /// Makes `order_no_exists` report every number as free, so a taken
    /// number is only caught by `insert`.
    pub async fn set_order_no_lookup_misses(&self, misses: bool) {
        self.state.write().await.order_no_lookup_misses = misses;
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn order_no_exists(&self, order_no: &str) -> Result<bool> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(!state.order_no_lookup_misses && state.by_order_no.contains_key(order_no))
    }

    async fn insert(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>)> {
        let mut state = self.state.write().await;
        state.ensure_available()?;
        if state.fail_on_insert {
            return Err(StorageError::Unavailable("order insert".to_string()));
        }
        if state.by_order_no.contains_key(&order.order_no) {
            return Err(StorageError::DuplicateOrderNo(order.order_no));
        }

        state.next_id += 1;
        let id = OrderId::new(state.next_id);
        let header = Order {
            id,
            order_no: order.order_no,
            user_id: order.user_id,
            total_amount: order.total_amount,
            payable_amount: order.payable_amount,
            status: OrderStatus::PendingPayment,
            payment_method: order.payment_method,
            shipping: order.shipping,
            created_at: order.created_at,
            updated_at: order.created_at,
            paid_at: None,
            shipped_at: None,
            completed_at: None,
            cancelled_at: None,
            refunded_at: None,
        };
        let items: Vec<OrderItem> = order
            .items
            .into_iter()
            .map(|item| item.into_item(id))
            .collect();

        state.by_order_no.insert(header.order_no.clone(), id);
        state.orders.insert(id, header.clone());
        state.items.insert(id, items.clone());
        Ok((header, items))
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn find_by_order_no(&self, order_no: &str) -> Result<Option<Order>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state
            .by_order_no
            .get(order_no)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn items_for(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn items_for_orders(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(order_ids
            .iter()
            .filter_map(|id| state.items.get(id).map(|items| (*id, items.clone())))
            .collect())
    }

    async fn compare_and_set_status(&self, change: StatusChange) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        match state.orders.get_mut(&change.order_id) {
            Some(order) if order.status == change.from => {
                order.apply_change(&change);
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }
}
