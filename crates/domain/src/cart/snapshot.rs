use serde::Serialize;
use storage::{Money, Product, ProductId, ProductStatus, UserId};

/// Display name used when a product could not be resolved.
pub const UNAVAILABLE_NAME: &str = "Unavailable product";

/// One cart entry enriched with live catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub name: String,
    pub unit_price: Money,
    pub line_total: Money,
    pub stock_quantity: Option<i64>,
    pub status: Option<ProductStatus>,
    /// False if the product is missing, inactive or its lookup failed.
    pub available: bool,
}

impl CartLine {
    /// Builds a line from a resolved, active product. A line whose total
    /// does not fit in `Money` is returned unavailable.
    pub fn priced(product: &Product, quantity: i64) -> Self {
        match product.price.checked_multiply(quantity) {
            Some(line_total) => Self {
                product_id: product.id,
                quantity,
                name: product.name.clone(),
                unit_price: product.price,
                line_total,
                stock_quantity: Some(product.stock_quantity),
                status: Some(product.status),
                available: true,
            },
            None => Self::inactive(product, quantity),
        }
    }

    /// Builds an invalid line for a product that cannot be priced. The name is
    /// kept so the caller can still tell what it was.
    pub fn inactive(product: &Product, quantity: i64) -> Self {
        Self {
            product_id: product.id,
            quantity,
            name: product.name.clone(),
            unit_price: Money::zero(),
            line_total: Money::zero(),
            stock_quantity: Some(product.stock_quantity),
            status: Some(product.status),
            available: false,
        }
    }

    /// Builds an invalid line for a product that could not be resolved.
    pub fn unresolved(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            name: UNAVAILABLE_NAME.to_string(),
            unit_price: Money::zero(),
            line_total: Money::zero(),
            stock_quantity: None,
            status: None,
            available: false,
        }
    }

    fn mark_unavailable(&mut self) {
        self.unit_price = Money::zero();
        self.line_total = Money::zero();
        self.available = false;
    }
}

/// A user's cart at one point in time.
///
/// Aggregates only count available lines; invalid lines stay visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub total_quantity: i64,
    pub total_price: Money,
    pub item_count: usize,
}

impl CartSnapshot {
    /// Computes the aggregates over `lines`. A valid line that would overflow
    /// either total is demoted to unavailable.
    pub fn from_lines(user_id: UserId, mut lines: Vec<CartLine>) -> Self {
        let mut total_quantity = 0_i64;
        let mut total_price = Money::zero();
        let mut item_count = 0;

        for line in lines.iter_mut().filter(|line| line.available) {
            match (
                total_quantity.checked_add(line.quantity),
                total_price.checked_add(line.line_total),
            ) {
                (Some(quantity), Some(price)) => {
                    total_quantity = quantity;
                    total_price = price;
                    item_count += 1;
                }
                _ => line.mark_unavailable(),
            }
        }

        Self {
            user_id,
            lines,
            total_quantity,
            total_price,
            item_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the stored quantity of a product, valid or not.
    pub fn quantity_of(&self, product_id: ProductId) -> Option<i64> {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    /// Returns the lines that could be priced.
    pub fn valid_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|line| line.available)
    }
}
