//! Tunables passed to the services at construction time.

use chrono::Duration;

/// Cart lifetime policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSettings {
    /// Inactivity window after which a cart reads as empty.
    pub ttl: Duration,
}

impl CartSettings {
    /// Creates settings with a lifetime of `days` days.
    pub fn with_ttl_days(days: i64) -> Self {
        Self {
            ttl: Duration::days(days),
        }
    }
}

impl Default for CartSettings {
    fn default() -> Self {
        Self::with_ttl_days(7)
    }
}

/// Checkout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// How many order numbers to try before giving up.
    pub order_no_max_attempts: u32,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            order_no_max_attempts: 5,
        }
    }
}
