#![allow(dead_code)]

pub mod fixtures;
pub mod ledger;
pub mod observers;

pub use fixtures::{money, service_with, shipping, Shop};
pub use ledger::{StockLedger, LEDGER_TABLE};
pub use observers::{FailingObserver, RecordingObserver};
