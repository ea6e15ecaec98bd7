//! Stock compensation for cancelled and refunded orders.

use domain::{InventoryLedger, OrderStateMachine};
use storage::{Order, OrderId, OrderItem, OrderRepository, ProductCatalog, ProductId, UserId};
use tracing::{error, info};

use crate::error::{CheckoutError, Result};

/// Moves an order to `CANCELLED` or `REFUNDED` and returns its reserved
/// stock.
///
/// Stock is only restored when this call won the status transition. If the
/// compare-and-set fails (for example because a payment landed first) the
/// caller gets `InvalidOperation` and stock is untouched.
#[derive(Debug, Clone)]
pub struct CancellationCompensator<P: ProductCatalog, O: OrderRepository> {
    machine: OrderStateMachine<O>,
    ledger: InventoryLedger<P>,
}

impl<P: ProductCatalog, O: OrderRepository> CancellationCompensator<P, O> {
    /// Creates a new compensator.
    pub fn new(machine: OrderStateMachine<O>, ledger: InventoryLedger<P>) -> Self {
        Self { machine, ledger }
    }

    /// Cancels an unpaid order on behalf of its owner and restores the stock
    /// it reserved.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let items = self.machine.orders().items_for(order_id).await?;
        let order = self.machine.cancel(user_id, order_id).await?;
        self.restore(&order, &items).await?;
        Ok(order)
    }

    /// Refunds a paid, unshipped order and restores the stock it reserved.
    #[tracing::instrument(skip(self))]
    pub async fn refund(&self, order_id: OrderId) -> Result<Order> {
        let items = self.machine.orders().items_for(order_id).await?;
        let order = self.machine.refund(order_id).await?;
        self.restore(&order, &items).await?;
        Ok(order)
    }

    /// Increments stock by exactly the reserved quantity of every item. Keeps
    /// going past failures so as much stock as possible is returned.
    async fn restore(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
        let mut unrestored: Vec<ProductId> = Vec::new();

        for item in items {
            match self.ledger.increase(item.product_id, item.quantity).await {
                Ok(_) => {
                    metrics::counter!("stock_rollbacks_total", "outcome" => "restored")
                        .increment(1);
                }
                Err(e) => {
                    metrics::counter!("stock_rollbacks_total", "outcome" => "failed").increment(1);
                    error!(
                        order_no = %order.order_no,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        error = %e,
                        "Failed to restore stock"
                    );
                    unrestored.push(item.product_id);
                }
            }
        }

        if !unrestored.is_empty() {
            return Err(CheckoutError::CompensationIncomplete {
                order_no: order.order_no.clone(),
                products: unrestored,
            });
        }

        info!(
            order_no = %order.order_no,
            status = %order.status,
            lines = items.len(),
            "Reserved stock restored"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use domain::DomainError;
    use storage::{
        InMemoryOrderRepository, InMemoryProductCatalog, Money, NewOrder, NewOrderItem,
        OrderStatus, PaymentMethod, Product, ShippingInfo,
    };

    use super::*;

    struct Fixture {
        catalog: InMemoryProductCatalog,
        orders: InMemoryOrderRepository,
        compensator: CancellationCompensator<InMemoryProductCatalog, InMemoryOrderRepository>,
    }

    /// Stock 17 for product 1 and 9 for product 2, with an order holding
    /// 3 and 1 of them.
    async fn fixture() -> (Fixture, Order) {
        let catalog = InMemoryProductCatalog::new();
        catalog
            .insert(Product::new(1, "Widget", Money::from_cents(1000), 17))
            .await;
        catalog
            .insert(Product::new(2, "Gadget", Money::from_cents(500), 9))
            .await;
        let orders = InMemoryOrderRepository::new();

        let item = |id: i64, name: &str, cents: i64, quantity: i64| NewOrderItem {
            product_id: ProductId::new(id),
            product_name: name.to_string(),
            unit_price: Money::from_cents(cents),
            quantity,
            subtotal: Money::from_cents(cents * quantity),
        };
        let (order, _) = orders
            .insert(NewOrder {
                order_no: "N1".to_string(),
                user_id: UserId::new(1),
                total_amount: Money::from_cents(3500),
                payable_amount: Money::from_cents(3500),
                payment_method: PaymentMethod::Simulated,
                shipping: ShippingInfo::new("Ann", "12345", "1 Main St"),
                created_at: Utc::now(),
                items: vec![item(1, "Widget", 1000, 3), item(2, "Gadget", 500, 1)],
            })
            .await
            .unwrap();

        let compensator = CancellationCompensator::new(
            OrderStateMachine::new(orders.clone()),
            InventoryLedger::new(catalog.clone()),
        );
        (
            Fixture {
                catalog,
                orders,
                compensator,
            },
            order,
        )
    }

    #[tokio::test]
    async fn cancel_restores_reserved_stock() {
        let (fx, order) = fixture().await;

        let cancelled = fx.compensator.cancel_order(UserId::new(1), order.id).await.unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(fx.catalog.stock_of(ProductId::new(1)).await, Some(20));
        assert_eq!(fx.catalog.stock_of(ProductId::new(2)).await, Some(10));
    }

    #[tokio::test]
    async fn rejected_cancel_leaves_stock_alone() {
        let (fx, order) = fixture().await;
        let machine = OrderStateMachine::new(fx.orders.clone());
        machine.pay("N1", PaymentMethod::Simulated).await.unwrap();

        let err = fx
            .compensator
            .cancel_order(UserId::new(1), order.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(DomainError::InvalidOperation {
                current: OrderStatus::PendingShipment,
                ..
            })
        ));
        assert_eq!(fx.catalog.stock_of(ProductId::new(1)).await, Some(17));
    }

    #[tokio::test]
    async fn second_cancel_does_not_restore_twice() {
        let (fx, order) = fixture().await;
        fx.compensator.cancel_order(UserId::new(1), order.id).await.unwrap();

        assert!(fx.compensator.cancel_order(UserId::new(1), order.id).await.is_err());
        assert_eq!(fx.catalog.stock_of(ProductId::new(1)).await, Some(20));
    }

    #[tokio::test]
    async fn refund_restores_stock_after_payment() {
        let (fx, order) = fixture().await;
        let machine = OrderStateMachine::new(fx.orders.clone());
        machine.pay("N1", PaymentMethod::Card).await.unwrap();

        let refunded = fx.compensator.refund(order.id).await.unwrap();

        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(fx.catalog.stock_of(ProductId::new(1)).await, Some(20));
    }

    #[tokio::test]
    async fn failed_restore_is_reported_but_status_sticks() {
        let (fx, order) = fixture().await;
        fx.catalog.fail_adjustments_for(ProductId::new(2)).await;

        let err = fx
            .compensator
            .cancel_order(UserId::new(1), order.id)
            .await
            .unwrap_err();

        match err {
            CheckoutError::CompensationIncomplete { order_no, products } => {
                assert_eq!(order_no, "N1");
                assert_eq!(products, vec![ProductId::new(2)]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fx.catalog.stock_of(ProductId::new(1)).await, Some(20));
        let stored = fx.orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
    }
}
