//! End-to-end checkout scenarios over the in-memory stores.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use checkout::{
    CancellationCompensator, CheckoutError, LineRequest, OrderFactory, OrderLines, OrderRequest,
    PaymentCallbackHandler,
};
use domain::{
    CartSettings, CartStore, CheckoutSettings, DomainError, InventoryLedger, Money,
    OrderNoGenerator, OrderStateMachine, OrderStatus, PaymentMethod, Product, ProductId,
    ProductStatus, ShippingInfo, UserId,
};
use storage::{
    InMemoryCartRepository, InMemoryOrderRepository, InMemoryProductCatalog, OrderRepository,
};

type Factory =
    OrderFactory<InMemoryCartRepository, InMemoryProductCatalog, InMemoryOrderRepository>;

struct World {
    catalog: InMemoryProductCatalog,
    orders: InMemoryOrderRepository,
    cart: CartStore<InMemoryCartRepository, InMemoryProductCatalog>,
    factory: Factory,
    compensator: CancellationCompensator<InMemoryProductCatalog, InMemoryOrderRepository>,
    payments: PaymentCallbackHandler<InMemoryOrderRepository>,
}

impl World {
    async fn new(products: &[(i64, i64, i64)]) -> Self {
        let catalog = InMemoryProductCatalog::new();
        for &(id, price_cents, stock) in products {
            catalog
                .insert(Product::new(
                    id,
                    format!("Product {id}"),
                    Money::from_cents(price_cents),
                    stock,
                ))
                .await;
        }

        let orders = InMemoryOrderRepository::new();
        let cart = CartStore::new(
            InMemoryCartRepository::new(),
            catalog.clone(),
            CartSettings::default(),
        );
        let ledger = InventoryLedger::new(catalog.clone());
        let machine = OrderStateMachine::new(orders.clone());

        Self {
            factory: OrderFactory::new(
                cart.clone(),
                ledger.clone(),
                orders.clone(),
                CheckoutSettings::default(),
            ),
            compensator: CancellationCompensator::new(machine.clone(), ledger),
            payments: PaymentCallbackHandler::new(machine),
            catalog,
            orders,
            cart,
        }
    }

    async fn stock(&self, product_id: i64) -> i64 {
        self.catalog
            .stock_of(ProductId::new(product_id))
            .await
            .unwrap()
    }
}

fn shipping() -> ShippingInfo {
    ShippingInfo::new("Ann Lee", "+8613800000000", "1 Main St")
}

fn explicit(user: i64, lines: &[(i64, i64)]) -> OrderRequest {
    OrderRequest::explicit(
        UserId::new(user),
        lines
            .iter()
            .map(|&(product_id, quantity)| LineRequest::new(product_id, quantity))
            .collect(),
        shipping(),
    )
}

/// Always proposes the same number.
struct FixedOrderNo(&'static str);

impl OrderNoGenerator for FixedOrderNo {
    fn generate(&self, _user_id: UserId, _now: DateTime<Utc>) -> String {
        self.0.to_string()
    }
}

/// Proposes the queued numbers in order, repeating the last one, and counts
/// how often it was asked.
#[derive(Clone)]
struct ScriptedOrderNo {
    numbers: Arc<Mutex<VecDeque<&'static str>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedOrderNo {
    fn new(numbers: &[&'static str]) -> Self {
        Self {
            numbers: Arc::new(Mutex::new(numbers.iter().copied().collect())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OrderNoGenerator for ScriptedOrderNo {
    fn generate(&self, _user_id: UserId, _now: DateTime<Utc>) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut numbers = self.numbers.lock().unwrap();
        let next = if numbers.len() > 1 {
            numbers.pop_front().unwrap()
        } else {
            numbers[0]
        };
        next.to_string()
    }
}

mod creation {
    use super::*;

    #[tokio::test]
    async fn order_snapshots_catalog_prices() {
        let world = World::new(&[(1, 1000, 10), (2, 250, 5)]).await;

        let details = world
            .factory
            .create_order(explicit(1, &[(1, 2), (2, 4)]))
            .await
            .unwrap();

        assert_eq!(details.order.status, OrderStatus::PendingPayment);
        assert_eq!(details.order.total_amount, Money::from_cents(3000));
        assert_eq!(details.order.payable_amount, Money::from_cents(3000));
        assert_eq!(details.items.len(), 2);
        assert_eq!(details.items[0].product_name, "Product 1");
        assert_eq!(details.items[1].subtotal, Money::from_cents(1000));
        assert_eq!(world.stock(1).await, 8);
        assert_eq!(world.stock(2).await, 1);

        world.catalog.set_price(ProductId::new(1), Money::from_cents(9999)).await;
        let stored = world.orders.items_for(details.order.id).await.unwrap();
        assert_eq!(stored[0].unit_price, Money::from_cents(1000));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_for_scarce_stock_have_one_winner() {
        let world = Arc::new(World::new(&[(1, 1000, 10)]).await);

        let a = {
            let world = Arc::clone(&world);
            tokio::spawn(async move { world.factory.create_order(explicit(1, &[(1, 6)])).await })
        };
        let b = {
            let world = Arc::clone(&world);
            tokio::spawn(async move { world.factory.create_order(explicit(2, &[(1, 6)])).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let failure = results.into_iter().find_map(Result::err).unwrap();
        assert!(matches!(
            failure,
            CheckoutError::Domain(DomainError::InsufficientStock {
                requested: 6,
                available: 4,
                ..
            })
        ));
        assert_eq!(world.stock(1).await, 4);
        assert_eq!(world.orders.order_count().await, 1);
    }

    #[tokio::test]
    async fn insufficient_line_rolls_back_earlier_lines() {
        let world = World::new(&[(1, 1000, 10), (2, 1000, 1)]).await;

        let err = world
            .factory
            .create_order(explicit(1, &[(1, 3), (2, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Domain(DomainError::InsufficientStock { .. })
        ));
        assert_eq!(world.stock(1).await, 10);
        assert_eq!(world.stock(2).await, 1);
        assert_eq!(world.orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn store_failure_mid_reservation_restores_stock() {
        let world = World::new(&[(1, 1000, 10), (2, 1000, 10), (3, 1000, 10)]).await;
        world.catalog.fail_adjustments_for(ProductId::new(3)).await;

        let err = world
            .factory
            .create_order(explicit(1, &[(1, 2), (2, 2), (3, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::OrderCreation {
                reason: "stock reservation failed",
                ..
            }
        ));
        assert!(err.is_transient());
        assert_eq!(world.stock(1).await, 10);
        assert_eq!(world.stock(2).await, 10);
        assert_eq!(world.stock(3).await, 10);
    }

    #[tokio::test]
    async fn failed_insert_restores_stock_and_keeps_cart() {
        let world = World::new(&[(1, 1000, 10)]).await;
        world
            .cart
            .add_item(UserId::new(1), ProductId::new(1), 3)
            .await
            .unwrap();
        world.orders.set_fail_on_insert(true).await;

        let err = world
            .factory
            .create_order(OrderRequest::from_cart(UserId::new(1), shipping()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::OrderCreation {
                reason: "order persistence failed",
                ..
            }
        ));
        assert_eq!(world.stock(1).await, 10);
        let entries = world.cart.entries(UserId::new(1)).await.unwrap();
        assert_eq!(entries.get(&ProductId::new(1)), Some(&3));
    }

    #[tokio::test]
    async fn unavailable_or_missing_products_are_refused() {
        let world = World::new(&[(1, 1000, 10), (2, 1000, 10)]).await;
        world
            .catalog
            .set_status(ProductId::new(2), ProductStatus::Inactive)
            .await;

        let err = world
            .factory
            .create_order(explicit(1, &[(1, 1), (2, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(DomainError::ProductUnavailable(id)) if id == ProductId::new(2)
        ));

        let err = world
            .factory
            .create_order(explicit(1, &[(1, 1), (9, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(DomainError::ProductNotFound(id)) if id == ProductId::new(9)
        ));
        assert_eq!(world.stock(1).await, 10);
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_reserving() {
        let world = World::new(&[(1, 1000, 10)]).await;

        let err = world.factory.create_order(explicit(1, &[])).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyOrder));

        let err = world
            .factory
            .create_order(explicit(1, &[(1, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(DomainError::InvalidQuantity { .. })
        ));

        let mut request = explicit(1, &[(1, 1)]);
        request.shipping = ShippingInfo::new("Ann", "not a phone", "1 Main St");
        let err = world.factory.create_order(request).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(DomainError::InvalidShippingInfo(_))
        ));

        let err = world
            .factory
            .create_order(OrderRequest::from_cart(UserId::new(1), shipping()))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyOrder));
        assert_eq!(world.stock(1).await, 10);
    }

    #[tokio::test]
    async fn repeated_products_are_merged() {
        let world = World::new(&[(1, 1000, 10)]).await;

        let details = world
            .factory
            .create_order(explicit(1, &[(1, 2), (1, 3)]))
            .await
            .unwrap();

        assert_eq!(details.items.len(), 1);
        assert_eq!(details.items[0].quantity, 5);
        assert_eq!(world.stock(1).await, 5);
    }

    #[tokio::test]
    async fn order_number_collisions_exhaust_attempts() {
        let world = World::new(&[(1, 1000, 10)]).await;
        let factory = world
            .factory
            .clone()
            .with_order_no_generator(FixedOrderNo("20261015000000000100"));

        factory.create_order(explicit(1, &[(1, 1)])).await.unwrap();
        let err = factory.create_order(explicit(1, &[(1, 2)])).await.unwrap_err();

        assert!(matches!(err, CheckoutError::OrderNoExhausted { attempts: 5 }));
        assert_eq!(world.stock(1).await, 9);
        assert_eq!(world.orders.order_count().await, 1);
    }

    #[tokio::test]
    async fn taken_order_number_is_regenerated() {
        let world = World::new(&[(1, 1000, 10)]).await;
        let taken = "20261015000000000100";
        world
            .factory
            .clone()
            .with_order_no_generator(FixedOrderNo(taken))
            .create_order(explicit(1, &[(1, 1)]))
            .await
            .unwrap();

        let numbers = ScriptedOrderNo::new(&[taken, "20261015000000000200"]);
        let details = world
            .factory
            .clone()
            .with_order_no_generator(numbers.clone())
            .create_order(explicit(1, &[(1, 2)]))
            .await
            .unwrap();

        assert_eq!(details.order.order_no, "20261015000000000200");
        assert_eq!(numbers.calls(), 2);
        assert_eq!(world.stock(1).await, 7);
        assert_eq!(world.orders.order_count().await, 2);
    }

    #[tokio::test]
    async fn duplicate_at_insert_consumes_an_attempt() {
        let world = World::new(&[(1, 1000, 10)]).await;
        let taken = "20261015000000000100";
        world
            .factory
            .clone()
            .with_order_no_generator(FixedOrderNo(taken))
            .create_order(explicit(1, &[(1, 1)]))
            .await
            .unwrap();
        world.orders.set_order_no_lookup_misses(true).await;

        let numbers = ScriptedOrderNo::new(&[taken, "20261015000000000200"]);
        let details = world
            .factory
            .clone()
            .with_order_no_generator(numbers.clone())
            .create_order(explicit(1, &[(1, 2)]))
            .await
            .unwrap();

        assert_eq!(details.order.order_no, "20261015000000000200");
        assert_eq!(numbers.calls(), 2);
        assert_eq!(world.stock(1).await, 7);
    }

    #[tokio::test]
    async fn duplicates_at_insert_count_towards_exhaustion() {
        let world = World::new(&[(1, 1000, 10)]).await;
        let taken = "20261015000000000100";
        let factory = world
            .factory
            .clone()
            .with_order_no_generator(FixedOrderNo(taken));
        factory.create_order(explicit(1, &[(1, 1)])).await.unwrap();
        world.orders.set_order_no_lookup_misses(true).await;

        let numbers = ScriptedOrderNo::new(&[taken]);
        let err = world
            .factory
            .clone()
            .with_order_no_generator(numbers.clone())
            .create_order(explicit(1, &[(1, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::OrderNoExhausted { attempts: 5 }));
        assert_eq!(numbers.calls(), 5);
        assert_eq!(world.stock(1).await, 9);
        assert_eq!(world.orders.order_count().await, 1);
    }

    #[tokio::test]
    async fn quantity_too_large_to_price_is_invalid() {
        let world = World::new(&[(1, 1000, 10)]).await;

        let err = world
            .factory
            .create_order(explicit(1, &[(1, 10_000_000_000_000_000)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Domain(DomainError::InvalidQuantity { .. })
        ));
        assert_eq!(world.stock(1).await, 10);
        assert_eq!(world.orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn large_quantity_that_prices_is_refused_for_stock() {
        let world = World::new(&[(1, 1000, 10)]).await;

        let err = world
            .factory
            .create_order(explicit(1, &[(1, 1_000_000_000_000)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Domain(DomainError::InsufficientStock { available: 10, .. })
        ));
        assert_eq!(world.stock(1).await, 10);
    }
}

mod from_cart {
    use super::*;

    #[tokio::test]
    async fn whole_cart_is_purchased_and_purged() {
        let world = World::new(&[(1, 1000, 10), (2, 500, 10)]).await;
        let user = UserId::new(7);
        world.cart.add_item(user, ProductId::new(1), 2).await.unwrap();
        world.cart.add_item(user, ProductId::new(2), 1).await.unwrap();

        let details = world
            .factory
            .create_order(OrderRequest::from_cart(user, shipping()))
            .await
            .unwrap();

        assert_eq!(details.order.total_amount, Money::from_cents(2500));
        assert!(world.cart.entries(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn selected_products_leave_the_rest_in_the_cart() {
        let world = World::new(&[(1, 1000, 10), (2, 500, 10)]).await;
        let user = UserId::new(7);
        world.cart.add_item(user, ProductId::new(1), 2).await.unwrap();
        world.cart.add_item(user, ProductId::new(2), 1).await.unwrap();

        let request = OrderRequest {
            lines: OrderLines::FromCart {
                product_ids: Some(vec![ProductId::new(2)]),
            },
            ..OrderRequest::from_cart(user, shipping())
        };
        let details = world.factory.create_order(request).await.unwrap();

        assert_eq!(details.items.len(), 1);
        assert_eq!(details.items[0].product_id, ProductId::new(2));
        let entries = world.cart.entries(user).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get(&ProductId::new(1)), Some(&2));
        assert_eq!(world.stock(2).await, 9);
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn cancel_restores_stock() {
        let world = World::new(&[(1, 1000, 20)]).await;
        let details = world
            .factory
            .create_order(explicit(1, &[(1, 3)]))
            .await
            .unwrap();
        assert_eq!(world.stock(1).await, 17);

        let cancelled = world
            .compensator
            .cancel_order(UserId::new(1), details.order.id)
            .await
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(world.stock(1).await, 20);
    }

    #[tokio::test]
    async fn duplicate_payment_callbacks_pay_once() {
        let world = World::new(&[(1, 1000, 20)]).await;
        let details = world
            .factory
            .create_order(explicit(1, &[(1, 1)]))
            .await
            .unwrap();
        let order_no = details.order.order_no.as_str();

        let first = world
            .payments
            .process_payment_success(order_no, PaymentMethod::Alipay)
            .await
            .unwrap();
        let second = world
            .payments
            .process_payment_success(order_no, PaymentMethod::Alipay)
            .await
            .unwrap();

        assert!(first.is_applied());
        assert!(!second.is_applied());
        let stored = world
            .orders
            .find_by_order_no(order_no)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::PendingShipment);
        assert_eq!(stored.paid_at, first.order().paid_at);
    }

    #[tokio::test]
    async fn paid_order_cannot_be_cancelled() {
        let world = World::new(&[(1, 1000, 20)]).await;
        let details = world
            .factory
            .create_order(explicit(1, &[(1, 3)]))
            .await
            .unwrap();
        world
            .payments
            .process_payment_success(&details.order.order_no, PaymentMethod::Simulated)
            .await
            .unwrap();

        let err = world
            .compensator
            .cancel_order(UserId::new(1), details.order.id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Domain(DomainError::InvalidOperation {
                current: OrderStatus::PendingShipment,
                ..
            })
        ));
        assert_eq!(world.stock(1).await, 17);
    }

    #[tokio::test]
    async fn refund_restores_stock() {
        let world = World::new(&[(1, 1000, 20)]).await;
        let details = world
            .factory
            .create_order(explicit(1, &[(1, 4)]))
            .await
            .unwrap();
        world
            .payments
            .process_payment_success(&details.order.order_no, PaymentMethod::Card)
            .await
            .unwrap();

        let refunded = world.compensator.refund(details.order.id).await.unwrap();

        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(world.stock(1).await, 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_cancel_and_payment_restore_stock_only_if_cancelled() {
        for user in 1..=10 {
            let world = Arc::new(World::new(&[(1, 1000, 20)]).await);
            let details = world
                .factory
                .create_order(explicit(user, &[(1, 5)]))
                .await
                .unwrap();

            let order_no = details.order.order_no.clone();
            let paying = {
                let world = Arc::clone(&world);
                tokio::spawn(async move {
                    world
                        .payments
                        .process_payment_success(&order_no, PaymentMethod::Simulated)
                        .await
                })
            };
            let cancelling = {
                let world = Arc::clone(&world);
                let order_id = details.order.id;
                tokio::spawn(async move {
                    world
                        .compensator
                        .cancel_order(UserId::new(user), order_id)
                        .await
                })
            };

            let paid = paying.await.unwrap().unwrap().is_applied();
            let cancelled = cancelling.await.unwrap().is_ok();
            assert!(paid ^ cancelled);
            assert_eq!(world.stock(1).await, if cancelled { 20 } else { 15 });
        }
    }
}
