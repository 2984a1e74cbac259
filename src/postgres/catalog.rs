use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::rows::{self, ORDER_COLUMNS, ORDER_ITEM_COLUMNS, SHIPPING_COLUMNS};
use crate::domain::{Order, OrderFilter, OrderId, OrderSummary, Product, ProductId, User, UserId};
use crate::{OrderQueries, ProductLookup, StoreResult, UserLookup};

/// Pool-backed reads: users, products and committed orders.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: Arc<PgPool>,
}

impl PostgresCatalog {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLookup for PostgresCatalog {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, email, role FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(rows::user).transpose()
    }
}

#[async_trait]
impl ProductLookup for PostgresCatalog {
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, sku, price, stock, category_id FROM products WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&*self.pool)
        .await?;
        row.as_ref().map(rows::product).transpose()
    }
}

#[async_trait]
impl OrderQueries for PostgresCatalog {
    /// Reads the header, items and shipping row from one `REPEATABLE READ`
    /// snapshot, so a concurrent delete cannot split the result.
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let Some(row) = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };
        let header = rows::order_summary(&row)?;

        let query =
            format!("SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id");
        let items = sqlx::query(&query)
            .bind(id.0)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(rows::order_item)
            .collect::<StoreResult<Vec<_>>>()?;

        let query = format!("SELECT {SHIPPING_COLUMNS} FROM shipping_info WHERE order_id = $1");
        let shipping = sqlx::query(&query)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?
            .as_ref()
            .map(rows::shipping_info)
            .transpose()?;
        tx.commit().await?;

        Ok(Some(Order {
            id: header.id,
            user_id: header.user_id,
            status: header.status,
            total_amount: header.total_amount,
            payment_method: header.payment_method,
            items,
            shipping,
            created_at: header.created_at,
            updated_at: header.updated_at,
        }))
    }

    async fn list_orders(
        &self,
        filter: OrderFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<OrderSummary>, i64)> {
        let (user_id, status) = match filter {
            OrderFilter::All => (None, None),
            OrderFilter::User(user_id) => (Some(user_id.0), None),
            OrderFilter::Status(status) => (None, Some(status.as_str())),
        };

        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::BIGINT IS NULL OR user_id = $1) AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY id LIMIT $3 OFFSET $4"
        );
        let orders = sqlx::query(&query)
            .bind(user_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.pool)
            .await?
            .iter()
            .map(rows::order_summary)
            .collect::<StoreResult<Vec<_>>>()?;

        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM orders \
             WHERE ($1::BIGINT IS NULL OR user_id = $1) AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&*self.pool)
        .await?
        .try_get("count")?;

        Ok((orders, total))
    }
}
