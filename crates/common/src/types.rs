use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

numeric_id! {
    /// Identity of an authenticated caller.
    ///
    /// The core never authenticates; it only trusts that the boundary
    /// resolved the caller to this id.
    UserId
}

numeric_id! {
    /// Identifier of a catalog product.
    ProductId
}

numeric_id! {
    /// Store-assigned identifier of a persisted order.
    OrderId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_preserve_raw_value() {
        assert_eq!(UserId::new(7).as_i64(), 7);
        assert_eq!(i64::from(ProductId::from(42)), 42);
    }

    #[test]
    fn ids_parse_from_strings() {
        let id: OrderId = " 123 ".parse().unwrap();
        assert_eq!(id, OrderId::new(123));
        assert!("abc".parse::<ProductId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ProductId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProductId::new(42));
    }

    #[test]
    fn ids_display_raw_value() {
        assert_eq!(UserId::new(1).to_string(), "1");
    }
}
