use serde::Serialize;
use storage::{Order, OrderId, OrderItem, OrderRepository, UserId};

use crate::error::DomainError;

/// An order header with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Owner-checked reads over persisted orders.
#[derive(Debug, Clone)]
pub struct OrderQueries<O: OrderRepository> {
    orders: O,
}

impl<O: OrderRepository> OrderQueries<O> {
    pub fn new(orders: O) -> Self {
        Self { orders }
    }

    /// Loads an order by id for its owner.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetails, DomainError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))?;
        self.details_for(user_id, order).await
    }

    /// Loads an order by number for its owner.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_order_no(
        &self,
        user_id: UserId,
        order_no: &str,
    ) -> Result<OrderDetails, DomainError> {
        let order = self
            .orders
            .find_by_order_no(order_no)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(order_no.to_string()))?;
        self.details_for(user_id, order).await
    }

    /// Lists a user's orders, newest first, with their items fetched in one
    /// batch.
    #[tracing::instrument(skip(self))]
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<OrderDetails>, DomainError> {
        let orders = self.orders.find_by_user(user_id).await?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = orders.iter().map(|order| order.id).collect();
        let mut items = self.orders.items_for_orders(&ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| OrderDetails {
                items: items.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }

    async fn details_for(&self, user_id: UserId, order: Order) -> Result<OrderDetails, DomainError> {
        if order.user_id != user_id {
            return Err(DomainError::OwnershipViolation {
                order: order.order_no,
                user_id,
            });
        }
        let items = self.orders.items_for(order.id).await?;
        Ok(OrderDetails { order, items })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use storage::{
        InMemoryOrderRepository, Money, NewOrder, NewOrderItem, PaymentMethod, ProductId,
        ShippingInfo,
    };

    use super::*;

    fn new_order(order_no: &str, user: i64, minutes_ago: i64) -> NewOrder {
        NewOrder {
            order_no: order_no.into(),
            user_id: UserId::new(user),
            total_amount: Money::from_cents(500),
            payable_amount: Money::from_cents(500),
            payment_method: PaymentMethod::Simulated,
            shipping: ShippingInfo::new("Ann", "12345", "1 Main St"),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            items: vec![NewOrderItem {
                product_id: ProductId::new(3),
                product_name: "Widget".into(),
                unit_price: Money::from_cents(500),
                quantity: 1,
                subtotal: Money::from_cents(500),
            }],
        }
    }

    #[tokio::test]
    async fn owner_reads_order_with_items() {
        let repo = InMemoryOrderRepository::new();
        let (order, _) = repo.insert(new_order("N1", 1, 0)).await.unwrap();
        let queries = OrderQueries::new(repo);

        let by_id = queries.get_by_id(UserId::new(1), order.id).await.unwrap();
        assert_eq!(by_id.items.len(), 1);

        let by_no = queries.get_by_order_no(UserId::new(1), "N1").await.unwrap();
        assert_eq!(by_no, by_id);
    }

    #[tokio::test]
    async fn other_users_are_refused() {
        let repo = InMemoryOrderRepository::new();
        let (order, _) = repo.insert(new_order("N1", 1, 0)).await.unwrap();
        let queries = OrderQueries::new(repo);

        assert!(matches!(
            queries.get_by_id(UserId::new(2), order.id).await,
            Err(DomainError::OwnershipViolation { .. })
        ));
        assert!(matches!(
            queries.get_by_order_no(UserId::new(1), "N404").await,
            Err(DomainError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let repo = InMemoryOrderRepository::new();
        repo.insert(new_order("OLD", 1, 30)).await.unwrap();
        repo.insert(new_order("NEW", 1, 1)).await.unwrap();
        repo.insert(new_order("OTHER", 2, 0)).await.unwrap();
        let queries = OrderQueries::new(repo);

        let listed = queries.list_by_user(UserId::new(1)).await.unwrap();
        let numbers: Vec<_> = listed.iter().map(|d| d.order.order_no.as_str()).collect();
        assert_eq!(numbers, vec!["NEW", "OLD"]);
        assert!(listed.iter().all(|d| d.items.len() == 1));
    }

    #[test]
    fn details_serialize_flat() {
        let now = Utc::now();
        let details = OrderDetails {
            order: Order {
                id: OrderId::new(1),
                order_no: "N1".into(),
                user_id: UserId::new(1),
                total_amount: Money::from_cents(500),
                payable_amount: Money::from_cents(500),
                status: Default::default(),
                payment_method: PaymentMethod::Simulated,
                shipping: ShippingInfo::new("Ann", "12345", "1 Main St"),
                created_at: now,
                updated_at: now,
                paid_at: None,
                shipped_at: None,
                completed_at: None,
                cancelled_at: None,
                refunded_at: None,
            },
            items: Vec::new(),
        };

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["order_no"], "N1");
        assert_eq!(json["status"], "PENDING_PAYMENT");
        assert!(json["items"].as_array().unwrap().is_empty());
    }
}
