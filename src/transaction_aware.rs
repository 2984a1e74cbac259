use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::{StoreError, StoreResult};

/// Trait for components that need to be notified of transaction lifecycle events.
///
/// Observers are registered with a [`UnitOfWorkSession`](crate::UnitOfWorkSession)
/// and called once the session's transaction has been committed or rolled
/// back. Typical uses are invalidating cached product stock or writing an
/// audit trail of order writes.
#[async_trait]
pub trait TransactionAware: Send + Sync {
    /// Called after a successful transaction commit.
    ///
    /// The transaction is already durable at this point. A failure here makes
    /// [`UnitOfWorkSession::commit`](crate::UnitOfWorkSession::commit) return
    /// [`StoreError::Observer`]; the order workflow logs it and still reports
    /// success.
    async fn on_commit(&self) -> StoreResult<()>;

    /// Called after a transaction rollback.
    ///
    /// Not called when a session is dropped without finishing (deadline or
    /// caller cancellation); the transaction is still rolled back.
    async fn on_rollback(&self) -> StoreResult<()>;
}

/// Observer list shared by both session implementations.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    inner: Arc<RwLock<Vec<Arc<dyn TransactionAware>>>>,
}

impl Observers {
    pub(crate) fn register(&self, observer: Arc<dyn TransactionAware>) {
        self.inner.write().push(observer);
    }

    /// Notifies every observer, even after one of them fails. Failures are
    /// reported together as [`StoreError::Observer`].
    pub(crate) async fn notify_commit(&self) -> StoreResult<()> {
        let observers = self.inner.read().clone();
        let mut failures = Vec::new();
        for observer in observers.iter() {
            if let Err(err) = observer.on_commit().await {
                failures.push(err.to_string());
            }
        }
        Self::outcome(failures)
    }

    pub(crate) async fn notify_rollback(&self) -> StoreResult<()> {
        let observers = self.inner.read().clone();
        let mut failures = Vec::new();
        for observer in observers.iter() {
            if let Err(err) = observer.on_rollback().await {
                failures.push(err.to_string());
            }
        }
        Self::outcome(failures)
    }

    fn outcome(failures: Vec<String>) -> StoreResult<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Observer(failures.join("; ")))
        }
    }
}
