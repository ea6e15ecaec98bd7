use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{CartRepository, ProductId, Result, StorageError, UserId};

/// SQLSTATE for `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// PostgreSQL-backed cart store.
///
/// A cart is a `carts` row holding the expiry plus its `cart_items` rows.
/// Expired carts are purged lazily by the next call that touches them.
#[derive(Debug, Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Creates a new cart store on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deletes the cart if it has expired.
    async fn purge_expired(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("DELETE FROM carts WHERE user_id = $1 AND expires_at <= $2")
            .bind(user_id.as_i64())
            .bind(now)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Creates the cart if needed and restarts its lifetime. Locks the cart
    /// row until the transaction ends.
    async fn touch(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<()> {
        Self::purge_expired(tx, user_id, now).await?;
        sqlx::query(
            r#"
            INSERT INTO carts (user_id, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(user_id.as_i64())
        .bind(now + ttl)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Restarts the lifetime of a live cart. Returns false if there is none.
    async fn refresh(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Self::purge_expired(tx, user_id, now).await?;
        let refreshed = sqlx::query("UPDATE carts SET expires_at = $2 WHERE user_id = $1")
            .bind(user_id.as_i64())
            .bind(now + ttl)
            .execute(&mut **tx)
            .await?;
        Ok(refreshed.rows_affected() > 0)
    }

    async fn drop_if_empty(tx: &mut Transaction<'_, Postgres>, user_id: UserId) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM carts
            WHERE user_id = $1
              AND NOT EXISTS (SELECT 1 FROM cart_items WHERE user_id = $1)
            "#,
        )
        .bind(user_id.as_i64())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        delta: i64,
        ttl: Duration,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        Self::touch(&mut tx, user_id, ttl, Utc::now()).await?;

        let quantity: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING quantity
            "#,
        )
        .bind(user_id.as_i64())
        .bind(product_id.as_i64())
        .bind(delta)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE)
            {
                return StorageError::QuantityOverflow(product_id);
            }
            StorageError::Database(e)
        })?;

        if quantity <= 0 {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id.as_i64())
                .bind(product_id.as_i64())
                .execute(&mut *tx)
                .await?;
            Self::drop_if_empty(&mut tx, user_id).await?;
        }

        tx.commit().await?;
        Ok(quantity)
    }

    async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        ttl: Duration,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::touch(&mut tx, user_id, ttl, Utc::now()).await?;

        if quantity <= 0 {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id.as_i64())
                .bind(product_id.as_i64())
                .execute(&mut *tx)
                .await?;
            Self::drop_if_empty(&mut tx, user_id).await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO cart_items (user_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
                "#,
            )
            .bind(user_id.as_i64())
            .bind(product_id.as_i64())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
        ttl: Duration,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        if !Self::refresh(&mut tx, user_id, ttl, Utc::now()).await? {
            tx.commit().await?;
            return Ok(0);
        }

        let ids: Vec<i64> = product_ids.iter().map(ProductId::as_i64).collect();
        let removed =
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
                .bind(user_id.as_i64())
                .bind(&ids)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        Self::drop_if_empty(&mut tx, user_id).await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn clear(&self, user_id: UserId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let live_items = sqlx::query(
            r#"
            DELETE FROM cart_items i
            USING carts c
            WHERE i.user_id = c.user_id AND c.user_id = $1 AND c.expires_at > $2
            "#,
        )
        .bind(user_id.as_i64())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(live_items > 0)
    }

    async fn load(&self, user_id: UserId, ttl: Duration) -> Result<BTreeMap<ProductId, i64>> {
        let mut tx = self.pool.begin().await?;
        if !Self::refresh(&mut tx, user_id, ttl, Utc::now()).await? {
            tx.commit().await?;
            return Ok(BTreeMap::new());
        }

        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT product_id, quantity FROM cart_items WHERE user_id = $1")
                .bind(user_id.as_i64())
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(rows
            .into_iter()
            .map(|(product_id, quantity)| (ProductId::new(product_id), quantity))
            .collect())
    }
}
