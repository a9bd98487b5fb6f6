//! Storage collaborators for the fulfillment engine.
//!
//! Two kinds of store sit behind traits here:
//! - [`KeyValueStore`]: a JSON key-value cache with per-key TTL, holding
//!   temporary stock reservations and their per-product running totals.
//! - Typed repositories over the relational store: product stock, orders and
//!   order lines, and the append-only status history.

pub mod error;
pub mod kv;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
#[cfg(feature = "redis")]
pub mod redis_cache;
pub mod repository;

pub use error::{Result, StoreError};
pub use kv::{InMemoryKeyValueStore, KeyValueStore, KeyValueStoreExt};
pub use memory::{FailureSwitches, InMemoryRepository};
pub use postgres::PostgresRepository;
pub use query::{HistoryQuery, LineFilter};
pub use common::Address;
pub use records::{OrderLineRecord, OrderRecord, ProductStockRecord, StatusHistoryEntry};
#[cfg(feature = "redis")]
pub use redis_cache::RedisKeyValueStore;
pub use repository::{
    FulfillmentStore, OrderRepository, ProductStockRepository, StatusHistoryRepository,
};
