use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::Row;
use std::sync::Arc;

use commerce_orders::{Executor, ProductId, StoreResult, TransactionAware};

pub const LEDGER_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS stock_ledger (
        id BIGSERIAL PRIMARY KEY,
        product_id BIGINT NOT NULL,
        delta INT NOT NULL,
        note TEXT NOT NULL
    )
"#;

/// Repository that joins an order session through its executor, so its
/// rows share the session's fate.
pub struct StockLedger {
    executor: Executor,
    committed: Arc<RwLock<bool>>,
    rolled_back: Arc<RwLock<bool>>,
}

impl StockLedger {
    pub fn new(executor: Executor) -> Arc<Self> {
        Arc::new(Self {
            executor,
            committed: Arc::new(RwLock::new(false)),
            rolled_back: Arc::new(RwLock::new(false)),
        })
    }

    pub async fn record(&self, product_id: ProductId, delta: i32, note: &str) -> StoreResult<()> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        sqlx::query("INSERT INTO stock_ledger (product_id, delta, note) VALUES ($1, $2, $3)")
            .bind(product_id.0)
            .bind(delta)
            .bind(note)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> StoreResult<i64> {
        let mut guard = self.executor.lock().await;
        let conn = Executor::connection(&mut guard)?;
        let row = sqlx::query("SELECT COUNT(*) AS count FROM stock_ledger")
            .fetch_one(conn)
            .await?;
        Ok(row.try_get("count")?)
    }

    pub fn is_committed(&self) -> bool {
        *self.committed.read()
    }

    pub fn is_rolled_back(&self) -> bool {
        *self.rolled_back.read()
    }
}

#[async_trait]
impl TransactionAware for StockLedger {
    async fn on_commit(&self) -> StoreResult<()> {
        *self.committed.write() = true;
        Ok(())
    }

    async fn on_rollback(&self) -> StoreResult<()> {
        *self.rolled_back.write() = true;
        Ok(())
    }
}
