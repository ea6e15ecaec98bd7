//! Domain layer for the order lifecycle engine.
//!
//! This crate provides:
//! - `CartStore`: per-user carts with atomic increments and a refreshable lifetime
//! - `InventoryLedger`: conditional stock decrements and compensating increments
//! - `OrderStateMachine`: compare-and-set status transitions over persisted orders
//! - `OrderQueries`: owner-checked order reads
//! - order number generation and shipping validation

pub mod cart;
pub mod error;
pub mod inventory;
pub mod order;
pub mod settings;

pub use cart::{CartLine, CartSnapshot, CartStore};
pub use error::DomainError;
pub use inventory::InventoryLedger;
pub use order::{
    OrderDetails, OrderNoGenerator, OrderQueries, OrderStateMachine, RandomOrderNo, Transition,
    TransitionOutcome, validate_shipping,
};
pub use settings::{CartSettings, CheckoutSettings};
pub use storage::{
    Money, Order, OrderId, OrderItem, OrderStatus, PaymentMethod, Product, ProductId,
    ProductStatus, ShippingInfo, UserId,
};
