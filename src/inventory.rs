//! Stock adjustment with the floor check.

use chrono::{DateTime, Utc};

use crate::domain::ProductId;
use crate::{
    OrderError, OrderQueries, OrderResult, OrderService, ProductLookup, StockWriter, UnitOfWork,
    UserLookup,
};

/// Adds `delta` to a product's stock inside `session`.
///
/// A negative result is the insufficient-stock signal; the caller must roll
/// the session back, which also reverts this adjustment.
pub(crate) async fn apply_stock_delta<S>(
    session: &S,
    product_id: ProductId,
    delta: i32,
    at: DateTime<Utc>,
) -> OrderResult<i32>
where
    S: StockWriter + ?Sized,
{
    match session.adjust_stock(product_id, delta, at).await? {
        None => Err(OrderError::not_found("Product", product_id)),
        Some(stock) if stock < 0 => Err(OrderError::invalid(format!(
            "insufficient stock for product {product_id}"
        ))),
        Some(stock) => Ok(stock),
    }
}

impl<U, C> OrderService<U, C>
where
    U: UnitOfWork,
    C: UserLookup + ProductLookup + OrderQueries,
{
    /// Adds a signed delta to a product's stock as its own transactional unit
    /// and returns the new stock.
    ///
    /// Fails with `NotFound` for an unknown product and with `InvalidInput`
    /// when the stock would become negative; nothing changes in either case.
    #[tracing::instrument(skip_all, fields(product_id = %product_id, delta = delta))]
    pub async fn adjust_stock(&self, product_id: ProductId, delta: i32) -> OrderResult<i32> {
        let outcome = self
            .bounded(async {
                let now = Utc::now();
                let session = self.begin().await?;
                let outcome = apply_stock_delta(&session, product_id, delta, now).await;
                self.finish(session, outcome).await
            })
            .await;
        match &outcome {
            Ok(stock) => tracing::debug!(stock, "Stock adjusted"),
            Err(err) => Self::log_failure("adjust stock", err),
        }
        outcome
    }
}
