//! Backing stores for carts, the product catalog and orders.
//!
//! Each store is a trait with an in-memory implementation (tests, local runs)
//! and a PostgreSQL implementation. Both honor the same atomicity contract:
//! cart increments, stock adjustments and order status changes are single
//! indivisible operations with respect to concurrent callers.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod memory;
pub mod model;
pub mod orders;
pub mod postgres;

pub use cart::CartRepository;
pub use catalog::{ProductCatalog, StockAdjustment};
pub use common::{Money, OrderId, ProductId, UserId};
pub use error::{Result, StorageError};
pub use memory::{InMemoryCartRepository, InMemoryOrderRepository, InMemoryProductCatalog};
pub use model::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PaymentMethod, Product, ProductStatus,
    ShippingInfo, StatusChange,
};
pub use orders::OrderRepository;
pub use postgres::{PgCartRepository, PgOrderRepository, PgProductCatalog};
