//! Commerce Orders
//!
//! Order-creation and stock-adjustment workflow for an e-commerce backend.
//! Multi-row writes (order header, items, shipping record, stock changes)
//! run as all-or-nothing units of work, either against PostgreSQL or against
//! the in-memory store used in tests and local tooling.

pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
mod inventory;
pub mod lookup;
pub mod memory;
pub mod postgres;
pub mod telemetry;
pub mod transaction_aware;
pub mod unit_of_work;
pub mod workflow;

pub use config::{Config, DatabaseConfig, LoggerConfig, OrderConfig};
pub use domain::{
    CreateOrder, LineItemRequest, Order, OrderFilter, OrderId, OrderItem, OrderItemId, OrderPatch,
    OrderStatus, OrderSummary, Page, PaymentMethod, Product, ProductId, Role, ShippingDetails,
    ShippingInfo, ShippingInfoId, User, UserId,
};
pub use error::{ErrorKind, OrderError, OrderResult, StoreError, StoreResult};
pub use executor::Executor;
pub use lookup::{OrderQueries, ProductLookup, UserLookup};
pub use memory::{MemorySession, MemoryStore};
pub use postgres::{PostgresCatalog, PostgresUnitOfWork, PostgresUnitOfWorkSession};
pub use transaction_aware::TransactionAware;
pub use unit_of_work::{OrderWriter, StockWriter, UnitOfWork, UnitOfWorkSession};
pub use workflow::OrderService;
