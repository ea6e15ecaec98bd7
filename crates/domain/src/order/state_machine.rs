use chrono::Utc;
use storage::{Order, OrderId, OrderRepository, PaymentMethod, StatusChange, UserId};
use tracing::{info, warn};

use super::Transition;
use crate::error::DomainError;

/// Result of an idempotent transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// This call moved the order.
    Applied(Order),

    /// The order was already past the transition's source status; nothing
    /// changed.
    Unchanged(Order),
}

impl TransitionOutcome {
    pub fn order(&self) -> &Order {
        match self {
            TransitionOutcome::Applied(order) | TransitionOutcome::Unchanged(order) => order,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Guarded status mutations over persisted orders.
///
/// Every transition is a single compare-and-set on `(order id, expected
/// status)`. A transition whose precondition no longer holds fails cleanly
/// and never overwrites a status set by a concurrent caller.
#[derive(Debug, Clone)]
pub struct OrderStateMachine<O: OrderRepository> {
    orders: O,
}

impl<O: OrderRepository> OrderStateMachine<O> {
    /// Creates a state machine over the given order store.
    pub fn new(orders: O) -> Self {
        Self { orders }
    }

    /// Returns the underlying order store.
    pub fn orders(&self) -> &O {
        &self.orders
    }

    /// Records payment. Moves `PENDING_PAYMENT` to `PENDING_SHIPMENT`.
    ///
    /// Idempotent: from any other status (including when a concurrent caller
    /// won the race) the call changes nothing and returns `Unchanged`.
    #[tracing::instrument(skip(self))]
    pub async fn pay(
        &self,
        order_no: &str,
        payment_method: PaymentMethod,
    ) -> Result<TransitionOutcome, DomainError> {
        let order = self
            .orders
            .find_by_order_no(order_no)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(order_no.to_string()))?;

        if !Transition::Pay.is_allowed_from(order.status) {
            warn!(
                order_no,
                status = %order.status,
                "Payment for order that is not awaiting payment"
            );
            return Ok(TransitionOutcome::Unchanged(order));
        }

        match self.apply(&order, Transition::Pay, Some(payment_method)).await? {
            Some(paid) => Ok(TransitionOutcome::Applied(paid)),
            None => {
                let current = self.reload(order.id, &order.order_no).await?;
                warn!(
                    order_no,
                    status = %current.status,
                    "Payment lost a concurrent transition"
                );
                Ok(TransitionOutcome::Unchanged(current))
            }
        }
    }

    /// Moves `PENDING_SHIPMENT` to `PENDING_RECEIPT`.
    #[tracing::instrument(skip(self))]
    pub async fn ship(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let order = self.load(order_id).await?;
        self.guarded(order, Transition::Ship).await
    }

    /// Moves `PENDING_RECEIPT` to `COMPLETED`. Only the owner may confirm.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_receipt(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, DomainError> {
        let order = self.load_owned(user_id, order_id).await?;
        self.guarded(order, Transition::ConfirmReceipt).await
    }

    /// Moves `PENDING_PAYMENT` to `CANCELLED`. Only the owner may cancel.
    ///
    /// Stock is not touched here; restoring it is the caller's job once this
    /// returns successfully.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: UserId, order_id: OrderId) -> Result<Order, DomainError> {
        let order = self.load_owned(user_id, order_id).await?;
        self.guarded(order, Transition::Cancel).await
    }

    /// Moves `PENDING_SHIPMENT` to `REFUNDED`.
    ///
    /// As with `cancel`, stock is restored by the caller.
    #[tracing::instrument(skip(self))]
    pub async fn refund(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let order = self.load(order_id).await?;
        self.guarded(order, Transition::Refund).await
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))
    }

    async fn load_owned(&self, user_id: UserId, order_id: OrderId) -> Result<Order, DomainError> {
        let order = self.load(order_id).await?;
        if order.user_id != user_id {
            return Err(DomainError::OwnershipViolation {
                order: order.order_no,
                user_id,
            });
        }
        Ok(order)
    }

    async fn reload(&self, order_id: OrderId, order_no: &str) -> Result<Order, DomainError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(order_no.to_string()))
    }

    /// Applies a non-idempotent transition, reporting the current status if
    /// it is not legal or a concurrent caller got there first.
    async fn guarded(&self, order: Order, transition: Transition) -> Result<Order, DomainError> {
        if !transition.is_allowed_from(order.status) {
            return Err(DomainError::InvalidOperation {
                order_no: order.order_no,
                current: order.status,
                action: transition.action(),
            });
        }

        match self.apply(&order, transition, None).await? {
            Some(updated) => Ok(updated),
            None => {
                let current = self.reload(order.id, &order.order_no).await?;
                Err(DomainError::InvalidOperation {
                    order_no: current.order_no,
                    current: current.status,
                    action: transition.action(),
                })
            }
        }
    }

    async fn apply(
        &self,
        order: &Order,
        transition: Transition,
        payment_method: Option<PaymentMethod>,
    ) -> Result<Option<Order>, DomainError> {
        let change = StatusChange {
            order_id: order.id,
            from: transition.source(),
            to: transition.target(),
            at: Utc::now(),
            payment_method,
        };

        let updated = self.orders.compare_and_set_status(change).await?;
        if let Some(updated) = &updated {
            metrics::counter!("order_transitions_total", "to" => updated.status.as_str())
                .increment(1);
            info!(
                order_no = %updated.order_no,
                from = %change.from,
                to = %change.to,
                "Order status changed"
            );
        }
        Ok(updated)
    }
}
