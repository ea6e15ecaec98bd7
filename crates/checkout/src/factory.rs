//! Order creation with all-or-nothing stock reservation.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use domain::{
    CartStore, CheckoutSettings, DomainError, InventoryLedger, OrderDetails, OrderNoGenerator,
    RandomOrderNo, validate_shipping,
};
use storage::{
    CartRepository, Money, NewOrder, NewOrderItem, Order, OrderItem, OrderRepository,
    PaymentMethod, ProductCatalog, ProductId, ShippingInfo, StorageError, UserId,
};
use tracing::{error, info, warn};

use crate::error::{CheckoutError, Result};
use crate::request::{LineRequest, OrderLines, OrderRequest};

/// Builds durable orders out of carts or explicit lines.
///
/// Reservation across several products is not atomic at the storage layer,
/// so the factory keeps track of every decrement it applied and reverses
/// them before returning any error. A failed checkout never changes stock.
#[derive(Clone)]
pub struct OrderFactory<C, P, O>
where
    C: CartRepository,
    P: ProductCatalog,
    O: OrderRepository,
{
    cart: CartStore<C, P>,
    ledger: InventoryLedger<P>,
    orders: O,
    order_no: Arc<dyn OrderNoGenerator>,
    settings: CheckoutSettings,
}

impl<C, P, O> OrderFactory<C, P, O>
where
    C: CartRepository,
    P: ProductCatalog,
    O: OrderRepository,
{
    /// Creates a new order factory.
    pub fn new(
        cart: CartStore<C, P>,
        ledger: InventoryLedger<P>,
        orders: O,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            cart,
            ledger,
            orders,
            order_no: Arc::new(RandomOrderNo),
            settings,
        }
    }

    /// Replaces the order number generator.
    pub fn with_order_no_generator(mut self, generator: impl OrderNoGenerator + 'static) -> Self {
        self.order_no = Arc::new(generator);
        self
    }

    /// Creates an order, reserving stock for every line.
    ///
    /// On success the purchased products are removed from the user's cart.
    /// On failure no stock is left reserved and nothing is persisted.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_order(&self, request: OrderRequest) -> Result<OrderDetails> {
        let started = Instant::now();
        let result = self.build(request).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(details) => {
                metrics::counter!("orders_created_total").increment(1);
                info!(
                    order_no = %details.order.order_no,
                    total = %details.order.total_amount,
                    lines = details.items.len(),
                    "Order created"
                );
            }
            Err(e) => {
                metrics::counter!("order_creation_failures_total", "reason" => e.reason_label())
                    .increment(1);
                warn!(error = %e, "Order creation failed");
            }
        }
        result
    }

    async fn build(&self, request: OrderRequest) -> Result<OrderDetails> {
        let user_id = request.user_id;
        let shipping = validate_shipping(&request.shipping)?;
        let lines = self.resolve_lines(user_id, &request.lines).await?;

        // 1. Price every line from the catalog
        info!(step = "price_lines", lines = lines.len(), "checkout step started");
        let (items, total_amount) = self.price_lines(&lines).await?;

        // 2. Reserve stock, all or nothing
        info!(step = "reserve_stock", "checkout step started");
        let reserved = self.reserve(&items).await?;

        // 3. Persist header and lines together
        info!(step = "persist_order", "checkout step started");
        let (order, items) = match self
            .persist(user_id, total_amount, request.payment_method, shipping, items)
            .await
        {
            Ok(persisted) => persisted,
            Err(e) => {
                self.release(&reserved).await;
                return Err(e);
            }
        };

        // 4. Purge purchased products from the cart
        let product_ids: Vec<ProductId> = items.iter().map(|item| item.product_id).collect();
        if let Err(e) = self.cart.remove_items(user_id, &product_ids).await {
            warn!(
                order_no = %order.order_no,
                error = %e,
                "Failed to purge cart after checkout"
            );
        }

        Ok(OrderDetails { order, items })
    }

    /// Turns the request into validated, merged (product, quantity) pairs.
    async fn resolve_lines(
        &self,
        user_id: UserId,
        lines: &OrderLines,
    ) -> Result<Vec<LineRequest>> {
        let resolved = match lines {
            OrderLines::Explicit(lines) => merge_lines(lines)?,
            OrderLines::FromCart { product_ids } => {
                let entries = self.cart.entries(user_id).await?;
                match product_ids {
                    None => entries
                        .into_iter()
                        .map(|(product_id, quantity)| LineRequest {
                            product_id,
                            quantity,
                        })
                        .collect(),
                    Some(product_ids) => {
                        let chosen: Vec<LineRequest> = product_ids
                            .iter()
                            .filter_map(|product_id| {
                                entries.get(product_id).map(|&quantity| LineRequest {
                                    product_id: *product_id,
                                    quantity,
                                })
                            })
                            .collect();
                        if chosen.len() < product_ids.len() {
                            warn!(%user_id, "Some requested products are not in the cart");
                        }
                        merge_lines(&chosen)?
                    }
                }
            }
        };

        if resolved.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }
        Ok(resolved)
    }

    /// Snapshots the authoritative name and price of every line and returns
    /// the order total. A quantity whose amount does not fit in `Money` is
    /// invalid.
    async fn price_lines(&self, lines: &[LineRequest]) -> Result<(Vec<NewOrderItem>, Money)> {
        let mut items = Vec::with_capacity(lines.len());
        let mut total = Money::zero();
        for line in lines {
            let product = self
                .ledger
                .catalog()
                .get_product(line.product_id)
                .await
                .map_err(|e| CheckoutError::OrderCreation {
                    reason: "product lookup failed",
                    source: e.into(),
                })?
                .ok_or(DomainError::ProductNotFound(line.product_id))?;

            if !product.is_active() || !product.price.is_positive() {
                return Err(DomainError::ProductUnavailable(line.product_id).into());
            }

            let invalid = || DomainError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            };
            let subtotal = product
                .price
                .checked_multiply(line.quantity)
                .ok_or_else(invalid)?;
            total = total.checked_add(subtotal).ok_or_else(invalid)?;

            items.push(NewOrderItem {
                product_id: product.id,
                product_name: product.name,
                unit_price: product.price,
                quantity: line.quantity,
                subtotal,
            });
        }
        Ok((items, total))
    }

    /// Decrements stock for every item. On the first failure every decrement
    /// already applied is reversed before the error is returned.
    async fn reserve(&self, items: &[NewOrderItem]) -> Result<Vec<(ProductId, i64)>> {
        let mut reserved = Vec::with_capacity(items.len());
        for item in items {
            match self.ledger.decrease(item.product_id, item.quantity).await {
                Ok(_) => reserved.push((item.product_id, item.quantity)),
                Err(e) => {
                    self.release(&reserved).await;
                    return Err(match e {
                        DomainError::InsufficientStock { .. } | DomainError::ProductNotFound(_) => {
                            e.into()
                        }
                        other => CheckoutError::OrderCreation {
                            reason: "stock reservation failed",
                            source: other,
                        },
                    });
                }
            }
        }
        Ok(reserved)
    }

    /// Generates a fresh order number and inserts the order, retrying on
    /// collisions up to the configured number of attempts.
    async fn persist(
        &self,
        user_id: UserId,
        total_amount: Money,
        payment_method: PaymentMethod,
        shipping: ShippingInfo,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)> {
        let attempts = self.settings.order_no_max_attempts.max(1);

        for attempt in 1..=attempts {
            let now = Utc::now();
            let order_no = self.order_no.generate(user_id, now);

            let taken = self
                .orders
                .order_no_exists(&order_no)
                .await
                .map_err(|e| CheckoutError::OrderCreation {
                    reason: "order number check failed",
                    source: e.into(),
                })?;
            if taken {
                warn!(%order_no, attempt, "Order number collision");
                continue;
            }

            let new_order = NewOrder {
                order_no,
                user_id,
                total_amount,
                payable_amount: total_amount,
                payment_method,
                shipping: shipping.clone(),
                created_at: now,
                items: items.clone(),
            };

            match self.orders.insert(new_order).await {
                Ok(persisted) => return Ok(persisted),
                Err(StorageError::DuplicateOrderNo(order_no)) => {
                    warn!(%order_no, attempt, "Order number taken at insert");
                }
                Err(e) => {
                    return Err(CheckoutError::OrderCreation {
                        reason: "order persistence failed",
                        source: e.into(),
                    });
                }
            }
        }

        Err(CheckoutError::OrderNoExhausted { attempts })
    }

    /// Returns reserved stock, newest reservation first.
    async fn release(&self, reserved: &[(ProductId, i64)]) {
        for &(product_id, quantity) in reserved.iter().rev() {
            match self.ledger.increase(product_id, quantity).await {
                Ok(_) => {
                    metrics::counter!("stock_rollbacks_total", "outcome" => "restored")
                        .increment(1);
                }
                Err(e) => {
                    metrics::counter!("stock_rollbacks_total", "outcome" => "failed").increment(1);
                    error!(
                        %product_id,
                        quantity,
                        error = %e,
                        "Failed to roll back reserved stock"
                    );
                }
            }
        }
    }
}

/// Rejects non-positive quantities and merges repeated products, keeping the
/// order in which products first appear.
fn merge_lines(lines: &[LineRequest]) -> Result<Vec<LineRequest>> {
    let mut merged: Vec<LineRequest> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(DomainError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            }
            .into());
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or(
                    DomainError::InvalidQuantity {
                        product_id: line.product_id,
                        quantity: line.quantity,
                    },
                )?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}
