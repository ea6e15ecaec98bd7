//! Shared types used across the cart, inventory and order crates.

mod money;
mod types;

pub use money::Money;
pub use types::{OrderId, ProductId, UserId};
