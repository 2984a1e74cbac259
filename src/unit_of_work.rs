use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::domain::{
    NewOrder, NewOrderItem, OrderId, OrderItem, OrderItemId, OrderStatus, PaymentMethod,
    ProductId, ShippingDetails, ShippingInfoId,
};
use crate::{StoreResult, TransactionAware};

/// Unit of Work pattern for managing database transactions.
///
/// The UnitOfWork is a factory for sessions; each session is one
/// all-or-nothing transaction.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: UnitOfWorkSession;

    /// Begin a new transaction session.
    async fn begin(&self) -> StoreResult<Self::Session>;
}

/// Row writes against orders and their owned children.
#[async_trait]
pub trait OrderWriter: Send + Sync {
    /// Inserts the order header and returns its generated identifier.
    async fn insert_order(&self, order: &NewOrder) -> StoreResult<OrderId>;

    async fn insert_order_item(&self, item: &NewOrderItem) -> StoreResult<OrderItemId>;

    async fn insert_shipping(
        &self,
        order_id: OrderId,
        details: &ShippingDetails,
        at: DateTime<Utc>,
    ) -> StoreResult<ShippingInfoId>;

    /// Inserts the shipping record, or replaces every field of the existing one.
    async fn upsert_shipping(
        &self,
        order_id: OrderId,
        details: &ShippingDetails,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Locks the order row for the rest of the session.
    /// Returns `false` when the order does not exist.
    async fn lock_order(&self, order_id: OrderId) -> StoreResult<bool>;

    /// Sets the given header fields and returns the number of rows matched.
    async fn update_order(
        &self,
        order_id: OrderId,
        status: Option<OrderStatus>,
        payment_method: Option<PaymentMethod>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    async fn add_to_order_total(
        &self,
        order_id: OrderId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>>;

    async fn delete_shipping(&self, order_id: OrderId) -> StoreResult<u64>;

    async fn delete_order_items(&self, order_id: OrderId) -> StoreResult<u64>;

    async fn delete_order(&self, order_id: OrderId) -> StoreResult<u64>;
}

/// Stock counter access inside a transaction.
///
/// Stock is only ever mutated through [`StockWriter::adjust_stock`], a single
/// conditional update serialized per product row by the store.
#[async_trait]
pub trait StockWriter: Send + Sync {
    /// Current stock, or `None` for an unknown product.
    async fn product_stock(&self, product_id: ProductId) -> StoreResult<Option<i32>>;

    /// Adds `delta` to the stock and returns the resulting value, which may be
    /// negative; `None` for an unknown product. Callers treat a negative
    /// result as the insufficient-stock signal and roll the session back.
    async fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i32,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<i32>>;
}

/// Represents a single database transaction session.
///
/// Besides the row writes it carries, a session can notify registered
/// transaction-aware components once it commits or rolls back. Dropping a
/// session without finishing it rolls the transaction back.
#[async_trait]
pub trait UnitOfWorkSession: OrderWriter + StockWriter {
    /// Register a component that needs to be notified of transaction events.
    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>);

    /// Commit the transaction and notify all registered observers.
    async fn commit(self) -> StoreResult<()>;

    /// Rollback the transaction and notify all registered observers.
    async fn rollback(self) -> StoreResult<()>;
}
