//! Payment gateway callbacks.

use domain::{DomainError, OrderStateMachine, TransitionOutcome};
use storage::{OrderRepository, PaymentMethod};
use tracing::{error, info, warn};

use crate::error::Result;

/// What the gateway is told after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackReply {
    Success,
    Fail,
}

impl CallbackReply {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackReply::Success => "SUCCESS",
            CallbackReply::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for CallbackReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Idempotent sink for payment-success notifications.
///
/// The gateway may deliver the same confirmation any number of times. Only
/// the first delivery moves the order; the rest change nothing.
#[derive(Debug, Clone)]
pub struct PaymentCallbackHandler<O: OrderRepository> {
    machine: OrderStateMachine<O>,
}

impl<O: OrderRepository> PaymentCallbackHandler<O> {
    pub fn new(machine: OrderStateMachine<O>) -> Self {
        Self { machine }
    }

    /// Records payment for an order.
    #[tracing::instrument(skip(self))]
    pub async fn process_payment_success(
        &self,
        order_no: &str,
        payment_method: PaymentMethod,
    ) -> Result<TransitionOutcome> {
        let outcome = self
            .machine
            .pay(order_no, payment_method)
            .await
            .inspect_err(|e| {
                let label = match e {
                    DomainError::OrderNotFound(_) => "not_found",
                    _ => "error",
                };
                metrics::counter!("payment_callbacks_total", "outcome" => label).increment(1);
            })?;

        if outcome.is_applied() {
            metrics::counter!("payment_callbacks_total", "outcome" => "applied").increment(1);
            info!(order_no, %payment_method, "Order payment processed");
        } else {
            metrics::counter!("payment_callbacks_total", "outcome" => "duplicate").increment(1);
            warn!(
                order_no,
                status = %outcome.order().status,
                "Payment callback absorbed"
            );
        }
        Ok(outcome)
    }

    /// Processes a callback and maps the result to the gateway's reply.
    ///
    /// Duplicates are acknowledged with `Success` so the gateway stops
    /// redelivering.
    pub async fn reply(&self, order_no: &str, payment_method: PaymentMethod) -> CallbackReply {
        match self.process_payment_success(order_no, payment_method).await {
            Ok(_) => CallbackReply::Success,
            Err(e) => {
                error!(order_no, error = %e, "Payment callback failed");
                CallbackReply::Fail
            }
        }
    }
}
