use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use commerce_orders::{StoreError, StoreResult, TransactionAware};

/// Transaction-aware component that records which lifecycle events it saw.
pub struct RecordingObserver {
    commits: Arc<RwLock<usize>>,
    rollbacks: Arc<RwLock<usize>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            commits: Arc::new(RwLock::new(0)),
            rollbacks: Arc::new(RwLock::new(0)),
        })
    }

    pub fn commits(&self) -> usize {
        *self.commits.read()
    }

    pub fn rollbacks(&self) -> usize {
        *self.rollbacks.read()
    }
}

#[async_trait]
impl TransactionAware for RecordingObserver {
    async fn on_commit(&self) -> StoreResult<()> {
        *self.commits.write() += 1;
        Ok(())
    }

    async fn on_rollback(&self) -> StoreResult<()> {
        *self.rollbacks.write() += 1;
        Ok(())
    }
}

/// Observer whose hooks always fail.
pub struct FailingObserver;

impl FailingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl TransactionAware for FailingObserver {
    async fn on_commit(&self) -> StoreResult<()> {
        Err(StoreError::Decode("cache unavailable".to_string()))
    }

    async fn on_rollback(&self) -> StoreResult<()> {
        Err(StoreError::Decode("cache unavailable".to_string()))
    }
}
