use sqlx::{PgConnection, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::{StoreError, StoreResult};

type SharedTransaction = Option<Transaction<'static, Postgres>>;

/// Executor wraps a database transaction for use by repositories.
///
/// Clones share the same transaction, so additional repositories can join
/// an order session and have their writes committed or rolled back with it.
#[derive(Clone, Debug)]
pub struct Executor {
    tx: Arc<Mutex<SharedTransaction>>,
}

impl Executor {
    /// Creates a new Executor from a PostgreSQL transaction.
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Locks the transaction for one statement (or a short sequence of them).
    pub async fn lock(&self) -> MutexGuard<'_, SharedTransaction> {
        self.tx.lock().await
    }

    /// Borrows the connection behind a locked transaction.
    pub fn connection(guard: &mut SharedTransaction) -> StoreResult<&mut PgConnection> {
        let tx = guard.as_mut().ok_or(StoreError::Finished)?;
        Ok(&mut **tx)
    }

    /// Takes ownership of the transaction, leaving None in its place.
    /// This should only be called when committing or rolling back.
    pub(crate) async fn take_transaction(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.tx.lock().await.take().ok_or(StoreError::Finished)
    }
}
