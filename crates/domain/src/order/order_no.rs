use chrono::{DateTime, Utc};
use rand::Rng;
use storage::UserId;

/// Produces candidate order numbers. Uniqueness is checked by the caller.
pub trait OrderNoGenerator: Send + Sync {
    fn generate(&self, user_id: UserId, now: DateTime<Utc>) -> String;
}

/// `yyyyMMddHHmmss` + last four digits of the user id + three random digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOrderNo;

impl OrderNoGenerator for RandomOrderNo {
    fn generate(&self, user_id: UserId, now: DateTime<Utc>) -> String {
        let suffix: u16 = rand::rng().random_range(0..1000);
        format!(
            "{}{:04}{:03}",
            now.format("%Y%m%d%H%M%S"),
            user_id.as_i64().rem_euclid(10_000),
            suffix
        )
    }
}
