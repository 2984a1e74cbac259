use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

use super::rows::{self, ORDER_ITEM_COLUMNS};
use crate::domain::{
    NewOrder, NewOrderItem, OrderId, OrderItem, OrderItemId, OrderStatus, PaymentMethod,
    ProductId, ShippingDetails, ShippingInfoId,
};
use crate::transaction_aware::Observers;
use crate::{
    Executor, OrderWriter, StockWriter, StoreResult, TransactionAware, UnitOfWork,
    UnitOfWorkSession,
};

/// Default implementation of UnitOfWork for PostgreSQL.
#[derive(Clone)]
pub struct PostgresUnitOfWork {
    pool: Arc<PgPool>,
}

impl PostgresUnitOfWork {
    /// Create a new PostgresUnitOfWork with the given connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    type Session = PostgresUnitOfWorkSession;

    async fn begin(&self) -> StoreResult<Self::Session> {
        let tx = self.pool.begin().await?;
        Ok(PostgresUnitOfWorkSession::new(tx))
    }
}

/// Default implementation of UnitOfWorkSession for PostgreSQL.
pub struct PostgresUnitOfWorkSession {
    executor: Executor,
    observers: Observers,
}

impl PostgresUnitOfWorkSession {
    /// Create a new session from a PostgreSQL transaction.
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            executor: Executor::new(tx),
            observers: Observers::default(),
        }
    }

    /// Get the executor for this session, so other repositories can join it.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}

#[async_trait]
impl OrderWriter for PostgresUnitOfWorkSession {
    async fn insert_order(&self, order: &NewOrder) -> StoreResult<OrderId> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let row = sqlx::query(
            r#"
            INSERT INTO orders (user_id, status, total_amount, payment_method, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(order.user_id.0)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(order.payment_method.as_str())
        .bind(order.created_at)
        .fetch_one(conn)
        .await?;
        Ok(OrderId(row.try_get("id")?))
    }

    async fn insert_order_item(&self, item: &NewOrderItem) -> StoreResult<OrderItemId> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let row = sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(item.order_id.0)
        .bind(item.product_id.0)
        .bind(item.quantity)
        .bind(item.price)
        .bind(item.created_at)
        .fetch_one(conn)
        .await?;
        Ok(OrderItemId(row.try_get("id")?))
    }

    async fn insert_shipping(
        &self,
        order_id: OrderId,
        details: &ShippingDetails,
        at: DateTime<Utc>,
    ) -> StoreResult<ShippingInfoId> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let row = sqlx::query(
            r#"
            INSERT INTO shipping_info
                (order_id, address, city, state, country, postal_code, phone_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING id
            "#,
        )
        .bind(order_id.0)
        .bind(&details.address)
        .bind(&details.city)
        .bind(&details.state)
        .bind(&details.country)
        .bind(&details.postal_code)
        .bind(&details.phone_number)
        .bind(at)
        .fetch_one(conn)
        .await?;
        Ok(ShippingInfoId(row.try_get("id")?))
    }

    async fn upsert_shipping(
        &self,
        order_id: OrderId,
        details: &ShippingDetails,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        sqlx::query(
            r#"
            INSERT INTO shipping_info
                (order_id, address, city, state, country, postal_code, phone_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (order_id) DO UPDATE SET
                address = EXCLUDED.address,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                country = EXCLUDED.country,
                postal_code = EXCLUDED.postal_code,
                phone_number = EXCLUDED.phone_number,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(order_id.0)
        .bind(&details.address)
        .bind(&details.city)
        .bind(&details.state)
        .bind(&details.country)
        .bind(&details.postal_code)
        .bind(&details.phone_number)
        .bind(at)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn lock_order(&self, order_id: OrderId) -> StoreResult<bool> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let row = sqlx::query("SELECT id FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id.0)
            .fetch_optional(conn)
            .await?;
        Ok(row.is_some())
    }

    async fn update_order(
        &self,
        order_id: OrderId,
        status: Option<OrderStatus>,
        payment_method: Option<PaymentMethod>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = COALESCE($1, status),
                payment_method = COALESCE($2, payment_method),
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(status.map(OrderStatus::as_str))
        .bind(payment_method.map(PaymentMethod::as_str))
        .bind(at)
        .bind(order_id.0)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    async fn add_to_order_total(
        &self,
        order_id: OrderId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        sqlx::query(
            "UPDATE orders SET total_amount = total_amount + $1, updated_at = $2 WHERE id = $3",
        )
        .bind(amount)
        .bind(at)
        .bind(order_id.0)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let query =
            format!("SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id");
        let rows = sqlx::query(&query)
            .bind(order_id.0)
            .fetch_all(conn)
            .await?;
        rows.iter().map(rows::order_item).collect()
    }

    async fn delete_shipping(&self, order_id: OrderId) -> StoreResult<u64> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let result = sqlx::query("DELETE FROM shipping_info WHERE order_id = $1")
            .bind(order_id.0)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_order_items(&self, order_id: OrderId) -> StoreResult<u64> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let result = sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id.0)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_order(&self, order_id: OrderId) -> StoreResult<u64> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.0)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StockWriter for PostgresUnitOfWorkSession {
    async fn product_stock(&self, product_id: ProductId) -> StoreResult<Option<i32>> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let row = sqlx::query("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.0)
            .fetch_optional(conn)
            .await?;
        row.map(|r| r.try_get("stock")).transpose().map_err(Into::into)
    }

    async fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i32,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<i32>> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        // Single conditional update; the row lock it takes serializes
        // concurrent adjustments of the same product until commit.
        let row = sqlx::query(
            "UPDATE products SET stock = stock + $1, updated_at = $2 WHERE id = $3 RETURNING stock",
        )
        .bind(delta)
        .bind(at)
        .bind(product_id.0)
        .fetch_optional(conn)
        .await?;
        row.map(|r| r.try_get("stock")).transpose().map_err(Into::into)
    }
}

#[async_trait]
impl UnitOfWorkSession for PostgresUnitOfWorkSession {
    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.register(observer);
    }

    async fn commit(self) -> StoreResult<()> {
        let tx = self.executor.take_transaction().await?;
        tx.commit().await?;
        self.observers.notify_commit().await
    }

    async fn rollback(self) -> StoreResult<()> {
        let tx = self.executor.take_transaction().await?;
        tx.rollback().await?;
        self.observers.notify_rollback().await
    }
}
