//! In-memory stores for tests and local runs.
//!
//! Each store keeps its state behind a single lock and performs every
//! read-modify-write inside one acquisition, which gives the same atomicity
//! guarantees as the PostgreSQL statements. All stores can be told to fail so
//! callers' error paths can be exercised.

mod cart;
mod catalog;
mod orders;

pub use cart::InMemoryCartRepository;
pub use catalog::InMemoryProductCatalog;
pub use orders::InMemoryOrderRepository;
