//! The order workflow: create, amend, extend and delete orders as
//! all-or-nothing units, plus the read operations the API layer needs.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;

use crate::config::OrderConfig;
use crate::domain::order::{add_to_total, line_total};
use crate::domain::{
    validate_price, CreateOrder, NewOrder, NewOrderItem, Order, OrderFilter, OrderId, OrderItem,
    OrderPatch, OrderStatus, OrderSummary, Page, PaymentMethod, ProductId, ShippingDetails,
    ShippingInfo, UserId,
};
use crate::inventory::apply_stock_delta;
use crate::{
    ErrorKind, OrderError, OrderQueries, OrderResult, OrderWriter, ProductLookup, StockWriter,
    StoreError, TransactionAware, UnitOfWork, UnitOfWorkSession, UserLookup,
};

/// A line item after validation, priced from the catalog.
#[derive(Debug, Clone, Copy)]
struct PricedLine {
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
}

/// Orchestrates order operations over a unit of work and its read-side
/// collaborators.
///
/// Every operation is bounded by [`OrderConfig::operation_timeout`]. A
/// transactional unit that does not finish in time is dropped, which rolls it
/// back, and the caller gets [`OrderError::DeadlineExceeded`].
pub struct OrderService<U, C> {
    uow: U,
    catalog: C,
    config: OrderConfig,
    observers: RwLock<Vec<Arc<dyn TransactionAware>>>,
}

impl<U, C> OrderService<U, C>
where
    U: UnitOfWork,
    C: UserLookup + ProductLookup + OrderQueries,
{
    pub fn new(uow: U, catalog: C, config: OrderConfig) -> Self {
        Self {
            uow,
            catalog,
            config,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Registers an observer on every session this service opens from now on.
    pub fn register_observer(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    /// Creates a pending order with its items and shipping record, decrementing
    /// stock for every item, as one transactional unit.
    ///
    /// Unit prices come from the catalog, not from the request, and the total
    /// is computed here. The stock checks before the transaction only fail
    /// fast; the authoritative floor check is the conditional decrement inside
    /// it.
    #[tracing::instrument(
        skip_all,
        fields(user_id = %request.user_id, items = request.items.len())
    )]
    pub async fn create_order(&self, request: CreateOrder) -> OrderResult<Order> {
        let outcome = self.bounded(self.create_order_unbounded(request)).await;
        match &outcome {
            Ok(order) => tracing::info!(
                order_id = %order.id,
                total = %order.total_amount,
                "Order created"
            ),
            Err(err) => Self::log_failure("create order", err),
        }
        outcome
    }

    async fn create_order_unbounded(&self, request: CreateOrder) -> OrderResult<Order> {
        let buyer = self
            .catalog
            .get_user(request.user_id)
            .await?
            .ok_or_else(|| OrderError::invalid(format!("invalid user ID: {}", request.user_id)))?;

        if request.items.is_empty() {
            return Err(OrderError::invalid("order must have at least one item"));
        }

        let shipping = request.shipping.filter(ShippingDetails::is_supplied);
        if let Some(details) = &shipping {
            details.validate()?;
        }

        let mut lines = Vec::with_capacity(request.items.len());
        let mut total = Decimal::ZERO;
        for item in &request.items {
            if item.quantity < 1 {
                return Err(OrderError::invalid(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
            let product = self
                .catalog
                .get_product(item.product_id)
                .await?
                .ok_or_else(|| {
                    OrderError::invalid(format!("invalid product ID: {}", item.product_id))
                })?;
            if product.stock < item.quantity {
                return Err(OrderError::invalid(format!(
                    "insufficient stock for product: {}",
                    product.name
                )));
            }
            total = add_to_total(total, line_total(product.price, item.quantity)?)?;
            lines.push(PricedLine {
                product_id: product.id,
                quantity: item.quantity,
                price: product.price,
            });
        }

        let now = Utc::now();
        let header = NewOrder {
            user_id: buyer.id,
            status: OrderStatus::Pending,
            total_amount: total,
            payment_method: request.payment_method,
            created_at: now,
        };

        let session = self.begin().await?;
        let outcome = Self::persist_order(&session, &header, &lines, shipping.as_ref(), now).await;
        let (id, items, shipping) = self.finish(session, outcome).await?;

        Ok(Order {
            id,
            user_id: header.user_id,
            status: header.status,
            total_amount: header.total_amount,
            payment_method: header.payment_method,
            items,
            shipping,
            created_at: now,
            updated_at: now,
        })
    }

    async fn persist_order(
        session: &U::Session,
        header: &NewOrder,
        lines: &[PricedLine],
        shipping: Option<&ShippingDetails>,
        now: DateTime<Utc>,
    ) -> OrderResult<(OrderId, Vec<OrderItem>, Option<ShippingInfo>)> {
        let order_id = session.insert_order(header).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let new_item = NewOrderItem {
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
                created_at: now,
            };
            let item_id = session.insert_order_item(&new_item).await?;
            apply_stock_delta(session, line.product_id, -line.quantity, now).await?;
            items.push(OrderItem {
                id: item_id,
                order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
                created_at: now,
                updated_at: now,
            });
        }

        let shipping = match shipping {
            Some(details) => {
                let id = session.insert_shipping(order_id, details, now).await?;
                Some(ShippingInfo {
                    id,
                    order_id,
                    details: details.clone(),
                    created_at: now,
                    updated_at: now,
                })
            }
            None => None,
        };

        Ok((order_id, items, shipping))
    }

    /// Appends an item to an existing order: inserts the item, decrements stock
    /// and raises the order total by `price * quantity`, as one unit.
    ///
    /// Not idempotent: every call has its own effect.
    #[tracing::instrument(
        skip_all,
        fields(order_id = %order_id, product_id = %product_id, quantity = quantity)
    )]
    pub async fn add_order_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
        price: Decimal,
    ) -> OrderResult<OrderItem> {
        let outcome = self
            .bounded(async {
                if quantity < 1 {
                    return Err(OrderError::invalid("quantity must be positive"));
                }
                validate_price(price)?;
                let amount = line_total(price, quantity)?;
                let now = Utc::now();
                let line = PricedLine {
                    product_id,
                    quantity,
                    price,
                };
                let session = self.begin().await?;
                let outcome = Self::append_item(&session, order_id, line, amount, now).await;
                self.finish(session, outcome).await
            })
            .await;
        match &outcome {
            Ok(item) => tracing::info!(item_id = %item.id, "Order item added"),
            Err(err) => Self::log_failure("add order item", err),
        }
        outcome
    }

    async fn append_item(
        session: &U::Session,
        order_id: OrderId,
        line: PricedLine,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> OrderResult<OrderItem> {
        if !session.lock_order(order_id).await? {
            return Err(OrderError::not_found("Order", order_id));
        }
        let stock = session
            .product_stock(line.product_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Product", line.product_id))?;
        if stock < line.quantity {
            return Err(OrderError::invalid("insufficient stock"));
        }

        let new_item = NewOrderItem {
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.price,
            created_at: now,
        };
        let item_id = session.insert_order_item(&new_item).await?;
        apply_stock_delta(session, line.product_id, -line.quantity, now).await?;
        session
            .add_to_order_total(order_id, amount, now)
            .await?;

        Ok(OrderItem {
            id: item_id,
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.price,
            created_at: now,
            updated_at: now,
        })
    }

    /// Amends status, payment method and/or shipping of an order and returns
    /// the order as stored afterwards.
    #[tracing::instrument(skip_all, fields(order_id = %id))]
    pub async fn update_order(&self, id: OrderId, patch: OrderPatch) -> OrderResult<Order> {
        let outcome = self
            .bounded(async {
                let OrderPatch {
                    status,
                    payment_method,
                    shipping,
                } = patch;
                let shipping = shipping.filter(ShippingDetails::is_supplied);
                if let Some(details) = &shipping {
                    details.validate()?;
                }
                let now = Utc::now();
                let session = self.begin().await?;
                let outcome = Self::amend_order(
                    &session,
                    id,
                    status,
                    payment_method,
                    shipping.as_ref(),
                    now,
                )
                .await;
                self.finish(session, outcome).await?;
                self.fetch_order(id).await
            })
            .await;
        if let Err(err) = &outcome {
            Self::log_failure("update order", err);
        }
        outcome
    }

    async fn amend_order(
        session: &U::Session,
        id: OrderId,
        status: Option<OrderStatus>,
        payment_method: Option<PaymentMethod>,
        shipping: Option<&ShippingDetails>,
        now: DateTime<Utc>,
    ) -> OrderResult<()> {
        let updated = session
            .update_order(id, status, payment_method, now)
            .await?;
        if updated == 0 {
            return Err(OrderError::not_found("Order", id));
        }
        if let Some(details) = shipping {
            session.upsert_shipping(id, details, now).await?;
        }
        Ok(())
    }

    /// Sets the status of an order. Any status may follow any other.
    #[tracing::instrument(skip_all, fields(order_id = %id, status = %status))]
    pub async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> OrderResult<()> {
        let outcome = self
            .bounded(async {
                let now = Utc::now();
                let session = self.begin().await?;
                let outcome = match session.update_order(id, Some(status), None, now).await {
                    Ok(0) => Err(OrderError::not_found("Order", id)),
                    Ok(_) => Ok(()),
                    Err(err) => Err(err.into()),
                };
                self.finish(session, outcome).await
            })
            .await;
        if let Err(err) = &outcome {
            Self::log_failure("update order status", err);
        }
        outcome
    }

    /// Deletes the shipping record, the items and the order, in that order,
    /// as one unit.
    ///
    /// Stock is only given back when `restore_stock_on_delete` is configured.
    #[tracing::instrument(skip_all, fields(order_id = %id))]
    pub async fn delete_order(&self, id: OrderId) -> OrderResult<()> {
        let restore = self.config.restore_stock_on_delete;
        let outcome = self
            .bounded(async {
                let now = Utc::now();
                let session = self.begin().await?;
                let outcome = Self::remove_order(&session, id, restore, now).await;
                self.finish(session, outcome).await
            })
            .await;
        match &outcome {
            Ok(()) => tracing::info!(restored_stock = restore, "Order deleted"),
            Err(err) => Self::log_failure("delete order", err),
        }
        outcome
    }

    async fn remove_order(
        session: &U::Session,
        id: OrderId,
        restore_stock: bool,
        now: DateTime<Utc>,
    ) -> OrderResult<()> {
        if restore_stock {
            for item in session.order_items(id).await? {
                apply_stock_delta(session, item.product_id, item.quantity, now).await?;
            }
        }
        session.delete_shipping(id).await?;
        session.delete_order_items(id).await?;
        if session.delete_order(id).await? == 0 {
            return Err(OrderError::not_found("Order", id));
        }
        Ok(())
    }

    /// The order with its items and shipping record.
    #[tracing::instrument(skip_all, fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> OrderResult<Order> {
        let outcome = self.bounded(self.fetch_order(id)).await;
        if let Err(err) = &outcome {
            Self::log_failure("get order", err);
        }
        outcome
    }

    async fn fetch_order(&self, id: OrderId) -> OrderResult<Order> {
        self.catalog
            .find_order(id)
            .await?
            .ok_or_else(|| OrderError::not_found("Order", id))
    }

    pub async fn list_orders(&self, page: Page) -> OrderResult<(Vec<OrderSummary>, i64)> {
        self.list(OrderFilter::All, page).await
    }

    /// Orders of one buyer; `NotFound` when the user does not exist.
    #[tracing::instrument(skip_all, fields(user_id = %user_id))]
    pub async fn list_orders_by_user(
        &self,
        user_id: UserId,
        page: Page,
    ) -> OrderResult<(Vec<OrderSummary>, i64)> {
        let exists = self
            .bounded(async {
                let user = self.catalog.get_user(user_id).await?;
                Ok::<_, OrderError>(user.is_some())
            })
            .await?;
        if !exists {
            let err = OrderError::not_found("User", user_id);
            Self::log_failure("list orders by user", &err);
            return Err(err);
        }
        self.list(OrderFilter::User(user_id), page).await
    }

    pub async fn list_orders_by_status(
        &self,
        status: OrderStatus,
        page: Page,
    ) -> OrderResult<(Vec<OrderSummary>, i64)> {
        self.list(OrderFilter::Status(status), page).await
    }

    async fn list(&self, filter: OrderFilter, page: Page) -> OrderResult<(Vec<OrderSummary>, i64)> {
        let (limit, offset) =
            page.limit_offset(self.config.default_per_page, self.config.max_per_page);
        let outcome = self
            .bounded(async {
                let page = self.catalog.list_orders(filter, limit, offset).await?;
                Ok::<_, OrderError>(page)
            })
            .await;
        if let Err(err) = &outcome {
            Self::log_failure("list orders", err);
        }
        outcome
    }

    /// Opens a session with every registered observer attached.
    pub(crate) async fn begin(&self) -> OrderResult<U::Session> {
        let session = self.uow.begin().await?;
        let observers = self.observers.read().clone();
        for observer in observers {
            session.register_transaction_aware(observer);
        }
        Ok(session)
    }

    /// Commits on success; rolls back and returns the original error otherwise.
    ///
    /// Observer failures after a successful commit are logged and do not
    /// turn the committed outcome into an error.
    pub(crate) async fn finish<T>(
        &self,
        session: U::Session,
        outcome: OrderResult<T>,
    ) -> OrderResult<T> {
        match outcome {
            Ok(value) => match session.commit().await {
                Ok(()) => Ok(value),
                Err(StoreError::Observer(message)) => {
                    tracing::warn!(error = %message, "Committed, but an observer failed");
                    Ok(value)
                }
                Err(err) => Err(err.into()),
            },
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    tracing::error!(error = %rollback_err, "Failed to roll back transaction");
                }
                Err(err)
            }
        }
    }

    pub(crate) async fn bounded<T>(
        &self,
        operation: impl Future<Output = OrderResult<T>>,
    ) -> OrderResult<T> {
        tokio::time::timeout(self.config.operation_timeout, operation)
            .await
            .unwrap_or(Err(OrderError::DeadlineExceeded))
    }

    pub(crate) fn log_failure(operation: &str, err: &OrderError) {
        match err.kind() {
            ErrorKind::Internal => {
                tracing::error!(operation, error = %err, "Order operation failed")
            }
            _ => tracing::warn!(operation, error = %err, kind = %err.kind(), "Order operation rejected"),
        }
    }
}
