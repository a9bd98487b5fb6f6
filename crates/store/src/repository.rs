use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{LineId, Money, OrderId, OrderStatus, OrderStatusCode, ProductId};

use crate::{
    HistoryQuery, LineFilter, OrderLineRecord, OrderRecord, ProductStockRecord, Result,
    StatusHistoryEntry,
};

/// Read/write access to product stock counters.
#[async_trait]
pub trait ProductStockRepository: Send + Sync {
    /// Returns the stock record for a product, or None if the product is unknown.
    async fn get_stock(&self, product_id: ProductId) -> Result<Option<ProductStockRecord>>;

    /// Adds `quantity` to the product's committed stock.
    ///
    /// Returns false if the product does not exist.
    async fn increment_committed_stock(&self, product_id: ProductId, quantity: u32)
    -> Result<bool>;

    /// Inserts or replaces a stock record. Used by stock-adjustment processes.
    async fn upsert_stock(&self, record: ProductStockRecord) -> Result<()>;
}

/// Persistence for orders and their lines.
///
/// Every call is a single-row (or single-statement) operation; callers that
/// need several writes to succeed together compensate by hand.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert_order(&self, order: &OrderRecord) -> Result<()>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Returns false if the order does not exist.
    async fn update_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<bool>;

    /// Stores a recomputed shipping cost and total. Returns false if the order does not exist.
    async fn update_order_shipping(
        &self,
        order_id: OrderId,
        shipping_cost: Money,
        total: Money,
    ) -> Result<bool>;

    /// Hard-deletes the order row. Returns false if the order does not exist.
    async fn delete_order(&self, order_id: OrderId) -> Result<bool>;

    async fn order_number_exists(&self, order_number: &str) -> Result<bool>;

    /// Counts orders created in `[from, to)`.
    async fn count_orders_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64>;

    async fn insert_lines(&self, lines: &[OrderLineRecord]) -> Result<()>;

    async fn get_line(&self, line_id: LineId) -> Result<Option<OrderLineRecord>>;

    /// Returns matching lines in creation order.
    async fn find_lines(&self, filter: LineFilter) -> Result<Vec<OrderLineRecord>>;

    /// Moves a line from `from` to `to` in one compare-and-set.
    ///
    /// Returns false, writing nothing, if the line does not exist or is no
    /// longer in `from`.
    async fn update_line_status(
        &self,
        line_id: LineId,
        from: OrderStatusCode,
        to: OrderStatusCode,
    ) -> Result<bool>;

    /// Hard-deletes every line of an order. Returns the number of lines removed.
    async fn delete_lines(&self, order_id: OrderId) -> Result<u64>;
}

/// Append-only status history sink.
#[async_trait]
pub trait StatusHistoryRepository: Send + Sync {
    async fn append_history(&self, entry: &StatusHistoryEntry) -> Result<()>;

    /// Returns matching entries, most recent first.
    async fn query_history(&self, query: HistoryQuery) -> Result<Vec<StatusHistoryEntry>>;
}

/// Everything the fulfillment services need from the relational store.
pub trait FulfillmentStore:
    ProductStockRepository + OrderRepository + StatusHistoryRepository
{
}

impl<T> FulfillmentStore for T where
    T: ProductStockRepository + OrderRepository + StatusHistoryRepository
{
}
