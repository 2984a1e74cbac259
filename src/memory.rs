//! In-memory backend for tests and local development.
//!
//! A session takes exclusive ownership of the store for its whole lifetime,
//! which gives serializable isolation, and writes to a private copy of the
//! tables. The copy replaces the shared tables only on commit; rollback or
//! dropping the session discards it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex as SyncMutex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::order::MAX_AMOUNT;
use crate::domain::{
    NewOrder, NewOrderItem, Order, OrderFilter, OrderId, OrderItem, OrderItemId, OrderStatus,
    OrderSummary, PaymentMethod, Product, ProductId, Role, ShippingDetails, ShippingInfo,
    ShippingInfoId, User, UserId,
};
use crate::transaction_aware::Observers;
use crate::{
    OrderQueries, OrderWriter, ProductLookup, StockWriter, StoreError, StoreResult,
    TransactionAware, UnitOfWork, UnitOfWorkSession, UserLookup,
};

#[derive(Debug, Clone, Default)]
struct Sequences {
    user: i64,
    product: i64,
    order: i64,
    item: i64,
    shipping: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, OrderSummary>,
    items: BTreeMap<OrderItemId, OrderItem>,
    shipping: BTreeMap<OrderId, ShippingInfo>,
    seq: Sequences,
}

impl Tables {
    fn items_of(&self, order_id: OrderId) -> Vec<OrderItem> {
        self.items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    fn remove_items_of(&mut self, order_id: OrderId) -> u64 {
        let before = self.items.len();
        self.items.retain(|_, item| item.order_id != order_id);
        (before - self.items.len()) as u64
    }
}

/// Shared in-memory store implementing every backend trait.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, username: &str, email: &str, role: Role) -> User {
        let mut tables = self.tables.lock().await;
        let user = User {
            id: UserId(next(&mut tables.seq.user)),
            username: username.to_string(),
            email: email.to_string(),
            role,
        };
        tables.users.insert(user.id, user.clone());
        user
    }

    pub async fn add_product(&self, name: &str, sku: &str, price: Decimal, stock: i32) -> Product {
        let mut tables = self.tables.lock().await;
        let product = Product {
            id: ProductId(next(&mut tables.seq.product)),
            name: name.to_string(),
            sku: sku.to_string(),
            price,
            stock,
            category_id: 1,
        };
        tables.products.insert(product.id, product.clone());
        product
    }

    /// Changes a product's live price; existing order items keep theirs.
    pub async fn set_price(&self, product_id: ProductId, price: Decimal) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.products.get_mut(&product_id) {
            Some(product) => {
                product.price = price;
                true
            }
            None => false,
        }
    }

    pub async fn stock_of(&self, product_id: ProductId) -> Option<i32> {
        let tables = self.tables.lock().await;
        tables.products.get(&product_id).map(|p| p.stock)
    }

    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    pub async fn item_count(&self, order_id: OrderId) -> usize {
        self.tables.lock().await.items_of(order_id).len()
    }

    pub async fn has_shipping(&self, order_id: OrderId) -> bool {
        self.tables.lock().await.shipping.contains_key(&order_id)
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    type Session = MemorySession;

    async fn begin(&self) -> StoreResult<Self::Session> {
        let guard = self.tables.clone().lock_owned().await;
        let working = Tables::clone(&guard);
        Ok(MemorySession {
            guard,
            working: SyncMutex::new(working),
            observers: Observers::default(),
        })
    }
}

/// One in-memory transaction.
pub struct MemorySession {
    guard: OwnedMutexGuard<Tables>,
    working: SyncMutex<Tables>,
    observers: Observers,
}

#[async_trait]
impl OrderWriter for MemorySession {
    async fn insert_order(&self, order: &NewOrder) -> StoreResult<OrderId> {
        let mut tables = self.working.lock();
        if !tables.users.contains_key(&order.user_id) {
            return Err(StoreError::ForeignKey(format!(
                "user {} does not exist",
                order.user_id
            )));
        }
        let id = OrderId(next(&mut tables.seq.order));
        tables.orders.insert(
            id,
            OrderSummary {
                id,
                user_id: order.user_id,
                status: order.status,
                total_amount: order.total_amount,
                payment_method: order.payment_method,
                created_at: order.created_at,
                updated_at: order.created_at,
            },
        );
        Ok(id)
    }

    async fn insert_order_item(&self, item: &NewOrderItem) -> StoreResult<OrderItemId> {
        let mut tables = self.working.lock();
        if !tables.orders.contains_key(&item.order_id) {
            return Err(StoreError::ForeignKey(format!(
                "order {} does not exist",
                item.order_id
            )));
        }
        if !tables.products.contains_key(&item.product_id) {
            return Err(StoreError::ForeignKey(format!(
                "product {} does not exist",
                item.product_id
            )));
        }
        let id = OrderItemId(next(&mut tables.seq.item));
        tables.items.insert(
            id,
            OrderItem {
                id,
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                created_at: item.created_at,
                updated_at: item.created_at,
            },
        );
        Ok(id)
    }

    async fn insert_shipping(
        &self,
        order_id: OrderId,
        details: &ShippingDetails,
        at: DateTime<Utc>,
    ) -> StoreResult<ShippingInfoId> {
        let mut tables = self.working.lock();
        if !tables.orders.contains_key(&order_id) {
            return Err(StoreError::ForeignKey(format!(
                "order {order_id} does not exist"
            )));
        }
        if tables.shipping.contains_key(&order_id) {
            return Err(StoreError::Duplicate(format!(
                "shipping info for order {order_id} already exists"
            )));
        }
        let id = ShippingInfoId(next(&mut tables.seq.shipping));
        tables.shipping.insert(
            order_id,
            ShippingInfo {
                id,
                order_id,
                details: details.clone(),
                created_at: at,
                updated_at: at,
            },
        );
        Ok(id)
    }

    async fn upsert_shipping(
        &self,
        order_id: OrderId,
        details: &ShippingDetails,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        {
            let mut tables = self.working.lock();
            if let Some(existing) = tables.shipping.get_mut(&order_id) {
                existing.details = details.clone();
                existing.updated_at = at;
                return Ok(());
            }
        }
        self.insert_shipping(order_id, details, at).await.map(|_| ())
    }

    async fn lock_order(&self, order_id: OrderId) -> StoreResult<bool> {
        Ok(self.working.lock().orders.contains_key(&order_id))
    }

    async fn update_order(
        &self,
        order_id: OrderId,
        status: Option<OrderStatus>,
        payment_method: Option<PaymentMethod>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut tables = self.working.lock();
        let Some(order) = tables.orders.get_mut(&order_id) else {
            return Ok(0);
        };
        if let Some(status) = status {
            order.status = status;
        }
        if let Some(payment_method) = payment_method {
            order.payment_method = payment_method;
        }
        order.updated_at = at;
        Ok(1)
    }

    async fn add_to_order_total(
        &self,
        order_id: OrderId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.working.lock();
        if let Some(order) = tables.orders.get_mut(&order_id) {
            order.total_amount = order
                .total_amount
                .checked_add(amount)
                .filter(|total| *total <= MAX_AMOUNT)
                .ok_or_else(|| {
                    StoreError::OutOfRange(format!("total of order {order_id} overflows"))
                })?;
            order.updated_at = at;
        }
        Ok(())
    }

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        Ok(self.working.lock().items_of(order_id))
    }

    async fn delete_shipping(&self, order_id: OrderId) -> StoreResult<u64> {
        let removed = self.working.lock().shipping.remove(&order_id);
        Ok(u64::from(removed.is_some()))
    }

    async fn delete_order_items(&self, order_id: OrderId) -> StoreResult<u64> {
        Ok(self.working.lock().remove_items_of(order_id))
    }

    async fn delete_order(&self, order_id: OrderId) -> StoreResult<u64> {
        let mut tables = self.working.lock();
        if tables.orders.remove(&order_id).is_none() {
            return Ok(0);
        }
        // ON DELETE CASCADE
        tables.remove_items_of(order_id);
        tables.shipping.remove(&order_id);
        Ok(1)
    }
}

#[async_trait]
impl StockWriter for MemorySession {
    async fn product_stock(&self, product_id: ProductId) -> StoreResult<Option<i32>> {
        Ok(self.working.lock().products.get(&product_id).map(|p| p.stock))
    }

    async fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i32,
        _at: DateTime<Utc>,
    ) -> StoreResult<Option<i32>> {
        let mut tables = self.working.lock();
        let Some(product) = tables.products.get_mut(&product_id) else {
            return Ok(None);
        };
        product.stock = product.stock.checked_add(delta).ok_or_else(|| {
            StoreError::OutOfRange(format!("stock of product {product_id} overflows"))
        })?;
        Ok(Some(product.stock))
    }
}

#[async_trait]
impl UnitOfWorkSession for MemorySession {
    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.register(observer);
    }

    async fn commit(self) -> StoreResult<()> {
        let MemorySession {
            mut guard,
            working,
            observers,
        } = self;
        *guard = working.into_inner();
        drop(guard);
        observers.notify_commit().await
    }

    async fn rollback(self) -> StoreResult<()> {
        let MemorySession {
            guard, observers, ..
        } = self;
        drop(guard);
        observers.notify_rollback().await
    }
}

#[async_trait]
impl UserLookup for MemoryStore {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl ProductLookup for MemoryStore {
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }
}

#[async_trait]
impl OrderQueries for MemoryStore {
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.get(&id).map(|header| Order {
            id: header.id,
            user_id: header.user_id,
            status: header.status,
            total_amount: header.total_amount,
            payment_method: header.payment_method,
            items: tables.items_of(id),
            shipping: tables.shipping.get(&id).cloned(),
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
        let tables = self.tables.lock().await;
        let matching: Vec<&OrderSummary> = tables
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect();
        Ok((page, total))
    }
}
