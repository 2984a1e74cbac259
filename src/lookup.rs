//! Read-side collaborators consumed by the order workflow.

use async_trait::async_trait;

use crate::domain::{Order, OrderFilter, OrderId, OrderSummary, Product, ProductId, User, UserId};
use crate::StoreResult;

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;
}

#[async_trait]
pub trait OrderQueries: Send + Sync {
    /// The order with its items (in insertion order) and shipping record.
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// One page of order headers ordered by id, plus the total match count.
    async fn list_orders(
        &self,
        filter: OrderFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<OrderSummary>, i64)>;
}
