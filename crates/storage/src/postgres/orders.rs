use std::collections::HashMap;

use async_trait::async_trait;
use common::Money;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    NewOrder, Order, OrderId, OrderItem, OrderRepository, OrderStatus, PaymentMethod, ProductId,
    Result, ShippingInfo, StatusChange, StorageError, UserId,
};

const ORDER_COLUMNS: &str = "id, order_no, user_id, total_amount_cents, payable_amount_cents, \
     status, payment_method, receiver_name, receiver_phone, address, created_at, updated_at, \
     paid_at, shipped_at, completed_at, cancelled_at, refunded_at";

const ITEM_COLUMNS: &str =
    "order_id, product_id, product_name, unit_price_cents, quantity, subtotal_cents";

/// PostgreSQL-backed order store.
#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Creates a new order store on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let payment_method: String = row.try_get("payment_method")?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            order_no: row.try_get("order_no")?,
            user_id: UserId::new(row.try_get("user_id")?),
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            payable_amount: Money::from_cents(row.try_get("payable_amount_cents")?),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StorageError::Corrupt(e.to_string()))?,
            payment_method: payment_method
                .parse::<PaymentMethod>()
                .map_err(|e| StorageError::Corrupt(e.to_string()))?,
            shipping: ShippingInfo {
                receiver_name: row.try_get("receiver_name")?,
                receiver_phone: row.try_get("receiver_phone")?,
                address: row.try_get("address")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            paid_at: row.try_get("paid_at")?,
            shipped_at: row.try_get("shipped_at")?,
            completed_at: row.try_get("completed_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
            refunded_at: row.try_get("refunded_at")?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            quantity: row.try_get("quantity")?,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        })
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn order_no_exists(&self, order_no: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE order_no = $1)")
                .bind(order_no)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>)> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (order_no, user_id, total_amount_cents, payable_amount_cents,
                                status, payment_method, receiver_name, receiver_phone, address,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(&order.order_no)
        .bind(order.user_id.as_i64())
        .bind(order.total_amount.cents())
        .bind(order.payable_amount.cents())
        .bind(OrderStatus::PendingPayment.as_str())
        .bind(order.payment_method.as_str())
        .bind(&order.shipping.receiver_name)
        .bind(&order.shipping.receiver_phone)
        .bind(&order.shipping.address)
        .bind(order.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_order_no")
            {
                return StorageError::DuplicateOrderNo(order.order_no.clone());
            }
            StorageError::Database(e)
        })?;
        let header = Self::row_to_order(row)?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, unit_price_cents,
                                         quantity, subtotal_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(header.id.as_i64())
            .bind(item.product_id.as_i64())
            .bind(&item.product_name)
            .bind(item.unit_price.cents())
            .bind(item.quantity)
            .bind(item.subtotal.cents())
            .execute(&mut *tx)
            .await?;

            items.push(item.into_item(header.id));
        }

        tx.commit().await?;
        Ok((header, items))
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_by_order_no(&self, order_no: &str) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_no = $1"
        ))
        .bind(order_no)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn items_for(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn items_for_orders(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<i64> = order_ids.iter().map(OrderId::as_i64).collect();
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let item = Self::row_to_item(row)?;
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    async fn compare_and_set_status(&self, change: StatusChange) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET
                status = $3,
                updated_at = $4,
                payment_method = COALESCE($5, payment_method),
                paid_at = CASE WHEN $3 = 'PENDING_SHIPMENT' THEN $4 ELSE paid_at END,
                shipped_at = CASE WHEN $3 = 'PENDING_RECEIPT' THEN $4 ELSE shipped_at END,
                completed_at = CASE WHEN $3 = 'COMPLETED' THEN $4 ELSE completed_at END,
                cancelled_at = CASE WHEN $3 = 'CANCELLED' THEN $4 ELSE cancelled_at END,
                refunded_at = CASE WHEN $3 = 'REFUNDED' THEN $4 ELSE refunded_at END
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(change.order_id.as_i64())
        .bind(change.from.as_str())
        .bind(change.to.as_str())
        .bind(change.at)
        .bind(change.payment_method.map(|m| m.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }
}
