//! Order creation requests.

use serde::Deserialize;
use storage::{PaymentMethod, ProductId, ShippingInfo, UserId};

/// One requested product and quantity. Prices are never taken from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Where the order lines come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderLines {
    /// Lines given by the caller. Repeated products are merged.
    Explicit(Vec<LineRequest>),

    /// The caller's cart: every entry, or only the listed products.
    FromCart { product_ids: Option<Vec<ProductId>> },
}

/// Everything needed to create an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub lines: OrderLines,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
}

impl OrderRequest {
    /// Orders explicit lines with the default payment method.
    pub fn explicit(user_id: UserId, lines: Vec<LineRequest>, shipping: ShippingInfo) -> Self {
        Self {
            user_id,
            lines: OrderLines::Explicit(lines),
            shipping,
            payment_method: PaymentMethod::default(),
        }
    }

    /// Orders the whole cart with the default payment method.
    pub fn from_cart(user_id: UserId, shipping: ShippingInfo) -> Self {
        Self {
            user_id,
            lines: OrderLines::FromCart { product_ids: None },
            shipping,
            payment_method: PaymentMethod::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_deserialize_from_either_source() {
        let explicit: OrderLines =
            serde_json::from_str(r#"{"explicit":[{"product_id":7,"quantity":2}]}"#).unwrap();
        assert_eq!(explicit, OrderLines::Explicit(vec![LineRequest::new(7, 2)]));

        let subset: OrderLines =
            serde_json::from_str(r#"{"from_cart":{"product_ids":[1,2]}}"#).unwrap();
        assert_eq!(
            subset,
            OrderLines::FromCart {
                product_ids: Some(vec![ProductId::new(1), ProductId::new(2)])
            }
        );
    }
}
