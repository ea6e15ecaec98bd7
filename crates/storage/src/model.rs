//! Records as they are persisted by the stores.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored enum value that matches none of the known variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Listing status of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// Taken off the shelf; cannot be ordered.
    Inactive,

    /// On sale.
    #[default]
    Active,

    /// Soft-deleted by the merchant.
    Deleted,
}

impl ProductStatus {
    /// Returns the numeric code stored in the catalog.
    pub fn code(&self) -> i16 {
        match self {
            ProductStatus::Inactive => 0,
            ProductStatus::Active => 1,
            ProductStatus::Deleted => 2,
        }
    }

    /// Decodes a stored numeric code.
    pub fn from_code(code: i16) -> Result<Self, UnknownVariant> {
        match code {
            0 => Ok(ProductStatus::Inactive),
            1 => Ok(ProductStatus::Active),
            2 => Ok(ProductStatus::Deleted),
            other => Err(UnknownVariant {
                kind: "product status",
                value: other.to_string(),
            }),
        }
    }
}

/// Authoritative product record owned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
    #[serde(default)]
    pub status: ProductStatus,
}

impl Product {
    /// Creates an active product.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money, stock: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock_quantity: stock,
            status: ProductStatus::Active,
        }
    }

    /// Returns a copy with the given status.
    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns true if the product can be sold.
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

/// Status of an order in its lifecycle.
///
/// ```text
/// PendingPayment ──► PendingShipment ──► PendingReceipt ──► Completed
///       │                   │
///       └──► Cancelled      └──► Refunded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created, stock reserved, awaiting payment.
    #[default]
    PendingPayment,

    /// Paid, awaiting shipment.
    PendingShipment,

    /// Shipped, awaiting receipt confirmation.
    PendingReceipt,

    /// Received by the customer (terminal state).
    Completed,

    /// Cancelled before payment (terminal state).
    Cancelled,

    /// Refunded after payment (terminal state).
    Refunded,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::PendingPayment,
        OrderStatus::PendingShipment,
        OrderStatus::PendingReceipt,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Returns the stored status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "PENDING_PAYMENT",
            OrderStatus::PendingShipment => "PENDING_SHIPMENT",
            OrderStatus::PendingReceipt => "PENDING_RECEIPT",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "order status",
                value: s.to_string(),
            })
    }
}

/// How an order is (to be) paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "SIMULATED_PAY")]
    Simulated,
    #[serde(rename = "ALIPAY")]
    Alipay,
    #[serde(rename = "WECHAT_PAY")]
    WechatPay,
    #[serde(rename = "CARD")]
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Simulated => "SIMULATED_PAY",
            PaymentMethod::Alipay => "ALIPAY",
            PaymentMethod::WechatPay => "WECHAT_PAY",
            PaymentMethod::Card => "CARD",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            PaymentMethod::Simulated,
            PaymentMethod::Alipay,
            PaymentMethod::WechatPay,
            PaymentMethod::Card,
        ]
        .into_iter()
        .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| UnknownVariant {
            kind: "payment method",
            value: s.to_string(),
        })
    }
}

/// Receiver details copied onto the order at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub receiver_name: String,
    pub receiver_phone: String,
    pub address: String,
}

impl ShippingInfo {
    pub fn new(
        receiver_name: impl Into<String>,
        receiver_phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            receiver_name: receiver_name.into(),
            receiver_phone: receiver_phone.into(),
            address: address.into(),
        }
    }
}

/// A persisted order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_no: String,
    pub user_id: UserId,
    pub total_amount: Money,
    pub payable_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping: ShippingInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Applies a status change that has already passed its compare-and-set
    /// check, stamping the timestamp that belongs to the new status.
    pub fn apply_change(&mut self, change: &StatusChange) {
        self.status = change.to;
        self.updated_at = change.at;
        if let Some(method) = change.payment_method {
            self.payment_method = method;
        }
        match change.to {
            OrderStatus::PendingShipment => self.paid_at = Some(change.at),
            OrderStatus::PendingReceipt => self.shipped_at = Some(change.at),
            OrderStatus::Completed => self.completed_at = Some(change.at),
            OrderStatus::Cancelled => self.cancelled_at = Some(change.at),
            OrderStatus::Refunded => self.refunded_at = Some(change.at),
            OrderStatus::PendingPayment => {}
        }
    }
}

/// A persisted order line. Prices are snapshots taken at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
}

/// An order header and its lines, ready to be inserted together.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_no: String,
    pub user_id: UserId,
    pub total_amount: Money,
    pub payable_amount: Money,
    pub payment_method: PaymentMethod,
    pub shipping: ShippingInfo,
    pub created_at: DateTime<Utc>,
    pub items: Vec<NewOrderItem>,
}

/// An order line before it is assigned to an order id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
}

impl NewOrderItem {
    /// Attaches the line to a persisted order.
    pub fn into_item(self, order_id: OrderId) -> OrderItem {
        OrderItem {
            order_id,
            product_id: self.product_id,
            product_name: self.product_name,
            unit_price: self.unit_price,
            quantity: self.quantity,
            subtotal: self.subtotal,
        }
    }
}

/// A compare-and-set on an order's status.
///
/// Applied only if the stored status still equals `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
    pub payment_method: Option<PaymentMethod>,
}
