use async_trait::async_trait;
use common::Money;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Product, ProductCatalog, ProductId, ProductStatus, Result, StockAdjustment, StorageError,
};

/// PostgreSQL-backed product catalog.
#[derive(Debug, Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    /// Creates a new catalog on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a product and returns it with its assigned id.
    pub async fn create_product(
        &self,
        name: &str,
        price: Money,
        stock_quantity: i64,
        status: ProductStatus,
    ) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price_cents, stock_quantity, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, price_cents, stock_quantity, status
            "#,
        )
        .bind(name)
        .bind(price.cents())
        .bind(stock_quantity)
        .bind(status.code())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let status = ProductStatus::from_code(row.try_get("status")?)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock_quantity: row.try_get("stock_quantity")?,
            status,
        })
    }

    async fn current_stock(&self, product_id: ProductId) -> Result<Option<i64>> {
        let stock = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
            .bind(product_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        Ok(stock)
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, stock_quantity, status FROM products WHERE id = $1",
        )
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn decrease_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<StockAdjustment> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $2, updated_at = NOW()
            WHERE id = $1 AND stock_quantity >= $2
            RETURNING stock_quantity
            "#,
        )
        .bind(product_id.as_i64())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(StockAdjustment::Applied { remaining });
        }

        // Refused: report what was there, for the error message only.
        Ok(match self.current_stock(product_id).await? {
            Some(available) => StockAdjustment::Insufficient { available },
            None => StockAdjustment::NotFound,
        })
    }

    async fn increase_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<StockAdjustment> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING stock_quantity
            "#,
        )
        .bind(product_id.as_i64())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match remaining {
            Some(remaining) => StockAdjustment::Applied { remaining },
            None => StockAdjustment::NotFound,
        })
    }
}
