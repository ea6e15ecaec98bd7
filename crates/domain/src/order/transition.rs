use serde::{Deserialize, Serialize};
use storage::OrderStatus;

/// A legal edge of the order status graph.
///
/// ```text
/// PENDING_PAYMENT ──pay──► PENDING_SHIPMENT ──ship──► PENDING_RECEIPT ──confirm receipt──► COMPLETED
///       │                        │
///     cancel                   refund
///       ▼                        ▼
///   CANCELLED                 REFUNDED
/// ```
///
/// Terminal statuses have no outgoing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    Pay,
    Ship,
    ConfirmReceipt,
    Cancel,
    Refund,
}

impl Transition {
    pub const ALL: [Transition; 5] = [
        Transition::Pay,
        Transition::Ship,
        Transition::ConfirmReceipt,
        Transition::Cancel,
        Transition::Refund,
    ];

    /// The only status this transition may be applied from.
    pub fn source(&self) -> OrderStatus {
        match self {
            Transition::Pay | Transition::Cancel => OrderStatus::PendingPayment,
            Transition::Ship | Transition::Refund => OrderStatus::PendingShipment,
            Transition::ConfirmReceipt => OrderStatus::PendingReceipt,
        }
    }

    /// The status the order ends in.
    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::Pay => OrderStatus::PendingShipment,
            Transition::Ship => OrderStatus::PendingReceipt,
            Transition::ConfirmReceipt => OrderStatus::Completed,
            Transition::Cancel => OrderStatus::Cancelled,
            Transition::Refund => OrderStatus::Refunded,
        }
    }

    /// Returns true if the transition may be applied to an order in `status`.
    pub fn is_allowed_from(&self, status: OrderStatus) -> bool {
        self.source() == status
    }

    /// Returns the transitions that may be applied from `status`.
    pub fn available_from(status: OrderStatus) -> impl Iterator<Item = Transition> {
        Transition::ALL
            .into_iter()
            .filter(move |transition| transition.is_allowed_from(status))
    }

    /// Verb used in error messages and logs.
    pub fn action(&self) -> &'static str {
        match self {
            Transition::Pay => "pay",
            Transition::Ship => "ship",
            Transition::ConfirmReceipt => "confirm receipt of",
            Transition::Cancel => "cancel",
            Transition::Refund => "refund",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.action())
    }
}
