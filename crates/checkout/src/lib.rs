//! Checkout orchestration for the order lifecycle engine.
//!
//! - `OrderFactory` turns a cart (or explicit lines) into a persisted order,
//!   reserving stock all-or-nothing and rolling back on any failure
//! - `CancellationCompensator` cancels or refunds an order and returns its
//!   reserved stock
//! - `PaymentCallbackHandler` is the idempotent sink for payment confirmations

pub mod compensator;
pub mod error;
pub mod factory;
pub mod payment;
pub mod request;

pub use compensator::CancellationCompensator;
pub use error::{CheckoutError, Result};
pub use factory::OrderFactory;
pub use payment::{CallbackReply, PaymentCallbackHandler};
pub use request::{LineRequest, OrderLines, OrderRequest};
