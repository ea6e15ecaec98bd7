//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::{CartSettings, CheckoutSettings};

/// Longest accepted cart lifetime, in days.
const MAX_CART_TTL_DAYS: i64 = 3650;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset means in-memory stores
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `CART_TTL_DAYS`: cart inactivity lifetime, 1 to 3650 (default: `7`)
/// - `ORDER_NO_MAX_ATTEMPTS`: order number tries per checkout (default: `5`)
/// - `CATALOG_SEED_FILE`: JSON product list loaded into the in-memory catalog
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub cart_ttl_days: i64,
    pub order_no_max_attempts: u32,
    pub catalog_seed_file: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            cart_ttl_days: parsed(&lookup, "CART_TTL_DAYS")
                .filter(|days: &i64| (1..=MAX_CART_TTL_DAYS).contains(days))
                .unwrap_or(defaults.cart_ttl_days),
            order_no_max_attempts: parsed(&lookup, "ORDER_NO_MAX_ATTEMPTS")
                .filter(|attempts: &u32| *attempts > 0)
                .unwrap_or(defaults.order_no_max_attempts),
            catalog_seed_file: lookup("CATALOG_SEED_FILE")
                .filter(|path| !path.trim().is_empty()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cart_settings(&self) -> CartSettings {
        CartSettings::with_ttl_days(self.cart_ttl_days)
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            order_no_max_attempts: self.order_no_max_attempts,
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            cart_ttl_days: 7,
            order_no_max_attempts: 5,
            catalog_seed_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = config_from(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.cart_settings(), CartSettings::default());
        assert_eq!(config.checkout_settings(), CheckoutSettings::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("CART_TTL_DAYS", "2"),
            ("ORDER_NO_MAX_ATTEMPTS", "9"),
            ("CATALOG_SEED_FILE", "products.json"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(config.cart_settings(), CartSettings::with_ttl_days(2));
        assert_eq!(config.checkout_settings().order_no_max_attempts, 9);
        assert_eq!(config.catalog_seed_file.as_deref(), Some("products.json"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("ORDER_NO_MAX_ATTEMPTS", "0"),
            ("DATABASE_URL", " "),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.order_no_max_attempts, 5);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_cart_ttl_out_of_range_falls_back() {
        for days in ["0", "-3", "3651", "9223372036854775807"] {
            let config = config_from(&[("CART_TTL_DAYS", days)]);
            assert_eq!(config.cart_ttl_days, 7, "CART_TTL_DAYS={days}");
        }
        let config = config_from(&[("CART_TTL_DAYS", "3650")]);
        assert_eq!(config.cart_ttl_days, 3650);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
