use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{LineId, Money, OrderId, OrderStatus, OrderStatusCode, ProductId};
use tokio::sync::RwLock;

use crate::{
    HistoryQuery, LineFilter, OrderLineRecord, OrderRecord, OrderRepository, ProductStockRecord,
    ProductStockRepository, Result, StatusHistoryEntry, StatusHistoryRepository, StoreError,
};

/// Switches that make individual operations fail, for exercising degraded paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailureSwitches {
    pub stock_reads: bool,
    pub stock_writes: bool,
    pub line_inserts: bool,
    pub order_deletes: bool,
    pub history_reads: bool,
    pub history_writes: bool,
}

#[derive(Default)]
struct InMemoryState {
    products: HashMap<ProductId, ProductStockRecord>,
    orders: HashMap<OrderId, OrderRecord>,
    /// Kept in insertion order so line lookups return creation order.
    lines: Vec<OrderLineRecord>,
    /// Kept in append order; queries reverse it.
    history: Vec<StatusHistoryEntry>,
    failures: FailureSwitches,
}

/// In-memory relational store for tests and local runs.
///
/// Implements every repository trait with the same semantics as the
/// PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<RwLock<InMemoryState>>,
}

fn unavailable(operation: &str) -> StoreError {
    StoreError::Unavailable(format!("{operation} failed"))
}

impl InMemoryRepository {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the active failure switches.
    pub async fn set_failures(&self, failures: FailureSwitches) {
        self.state.write().await.failures = failures;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of stored lines across all orders.
    pub async fn line_count(&self) -> usize {
        self.state.read().await.lines.len()
    }

    /// Returns the number of stored history entries.
    pub async fn history_count(&self) -> usize {
        self.state.read().await.history.len()
    }
}

#[async_trait]
impl ProductStockRepository for InMemoryRepository {
    async fn get_stock(&self, product_id: ProductId) -> Result<Option<ProductStockRecord>> {
        let state = self.state.read().await;
        if state.failures.stock_reads {
            return Err(unavailable("stock read"));
        }
        Ok(state.products.get(&product_id).copied())
    }

    async fn increment_committed_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.failures.stock_writes {
            return Err(unavailable("stock write"));
        }
        match state.products.get_mut(&product_id) {
            Some(record) => {
                record.committed_stock += i64::from(quantity);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_stock(&self, record: ProductStockRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failures.stock_writes {
            return Err(unavailable("stock write"));
        }
        state.products.insert(record.product_id, record);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository {
    async fn insert_order(&self, order: &OrderRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if state
            .orders
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(StoreError::InvalidRecord(format!(
                "duplicate order number {}",
                order.order_number
            )));
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn update_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.orders.get_mut(&order_id) {
            Some(order) => {
                order.status = status;
                order.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_order_shipping(
        &self,
        order_id: OrderId,
        shipping_cost: Money,
        total: Money,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.orders.get_mut(&order_id) {
            Some(order) => {
                order.shipping_cost = shipping_cost;
                order.total = total;
                order.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.failures.order_deletes {
            return Err(unavailable("order delete"));
        }
        Ok(state.orders.remove(&order_id).is_some())
    }

    async fn order_number_exists(&self, order_number: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .any(|order| order.order_number == order_number))
    }

    async fn count_orders_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        let state = self.state.read().await;
        let count = state
            .orders
            .values()
            .filter(|order| order.created_at >= from && order.created_at < to)
            .count();
        Ok(count as u64)
    }

    async fn insert_lines(&self, lines: &[OrderLineRecord]) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failures.line_inserts {
            return Err(unavailable("line insert"));
        }
        state.lines.extend(lines.iter().cloned());
        Ok(())
    }

    async fn get_line(&self, line_id: LineId) -> Result<Option<OrderLineRecord>> {
        let state = self.state.read().await;
        Ok(state.lines.iter().find(|line| line.id == line_id).cloned())
    }

    async fn find_lines(&self, filter: LineFilter) -> Result<Vec<OrderLineRecord>> {
        let state = self.state.read().await;
        Ok(state
            .lines
            .iter()
            .filter(|line| {
                if let Some(order_id) = filter.order_id
                    && line.order_id != order_id
                {
                    return false;
                }
                if let Some(product_id) = filter.product_id
                    && line.product_id != product_id
                {
                    return false;
                }
                if let Some(status) = filter.status
                    && line.status != status
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect())
    }

    async fn update_line_status(
        &self,
        line_id: LineId,
        from: OrderStatusCode,
        to: OrderStatusCode,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state
            .lines
            .iter_mut()
            .find(|line| line.id == line_id && line.status == from)
        {
            Some(line) => {
                line.status = to;
                line.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_lines(&self, order_id: OrderId) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.lines.len();
        state.lines.retain(|line| line.order_id != order_id);
        Ok((before - state.lines.len()) as u64)
    }
}

#[async_trait]
impl StatusHistoryRepository for InMemoryRepository {
    async fn append_history(&self, entry: &StatusHistoryEntry) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failures.history_writes {
            return Err(unavailable("history write"));
        }
        state.history.push(entry.clone());
        Ok(())
    }

    async fn query_history(&self, query: HistoryQuery) -> Result<Vec<StatusHistoryEntry>> {
        let state = self.state.read().await;
        if state.failures.history_reads {
            return Err(unavailable("history read"));
        }
        let entries = state
            .history
            .iter()
            .rev()
            .filter(|entry| {
                if let Some(order_id) = query.order_id
                    && entry.order_id != order_id
                {
                    return false;
                }
                if let Some(line_id) = query.line_id
                    && entry.line_id != Some(line_id)
                {
                    return false;
                }
                !(query.order_level_only && !entry.is_order_level())
            })
            .cloned();

        Ok(match query.limit {
            Some(limit) => entries.take(limit).collect(),
            None => entries.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Address;
    use common::CustomerId;

    fn sample_order(number: &str) -> OrderRecord {
        let address = Address::new("Jeanne Martin", "1 rue de Rivoli", "75001", "Paris", "FR");
        let now = Utc::now();
        OrderRecord {
            id: OrderId::new(),
            order_number: number.to_string(),
            customer_id: CustomerId::new(),
            status: OrderStatus::Pending,
            subtotal: Money::from_cents(1000),
            tax_amount: Money::from_cents(200),
            shipping_cost: Money::from_cents(490),
            total: Money::from_cents(1690),
            billing_address: address.clone(),
            shipping_address: address,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_line(order_id: OrderId, product: i64, status: OrderStatusCode) -> OrderLineRecord {
        let now = Utc::now();
        OrderLineRecord {
            id: LineId::new(),
            order_id,
            product_id: ProductId::new(product),
            product_name: format!("Product {product}"),
            quantity: 1,
            unit_price: Money::from_cents(1000),
            vat_rate: 20,
            discount: 0,
            subtotal: Money::from_cents(1000),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_committed_stock_increment() {
        let repo = InMemoryRepository::new();
        let product = ProductId::new(7);
        repo.upsert_stock(ProductStockRecord::new(product, 10, 2))
            .await
            .unwrap();

        assert!(repo.increment_committed_stock(product, 3).await.unwrap());
        assert_eq!(repo.get_stock(product).await.unwrap().unwrap().committed_stock, 5);
        assert!(!repo
            .increment_committed_stock(ProductId::new(8), 1)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_order_number_rejected() {
        let repo = InMemoryRepository::new();
        repo.insert_order(&sample_order("CMD-1")).await.unwrap();
        assert!(repo.insert_order(&sample_order("CMD-1")).await.is_err());
        assert!(repo.order_number_exists("CMD-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_lines_filters_and_keeps_order() {
        let repo = InMemoryRepository::new();
        let order_id = OrderId::new();
        let lines = vec![
            sample_line(order_id, 1, OrderStatusCode::Pending),
            sample_line(order_id, 2, OrderStatusCode::Shipped),
            sample_line(OrderId::new(), 1, OrderStatusCode::Pending),
        ];
        repo.insert_lines(&lines).await.unwrap();

        let found = repo.find_lines(LineFilter::for_order(order_id)).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, lines[0].id);

        let shipped = repo
            .find_lines(LineFilter::for_order(order_id).status(OrderStatusCode::Shipped))
            .await
            .unwrap();
        assert_eq!(shipped.len(), 1);
        assert_eq!(shipped[0].product_id, ProductId::new(2));

        assert_eq!(repo.delete_lines(order_id).await.unwrap(), 2);
        assert_eq!(repo.line_count().await, 1);
    }

    #[tokio::test]
    async fn test_line_status_update_requires_expected_status() {
        use OrderStatusCode::{CancelledClient, Confirmed, Pending};

        let repo = InMemoryRepository::new();
        let line = sample_line(OrderId::new(), 1, Pending);
        repo.insert_lines(std::slice::from_ref(&line)).await.unwrap();

        assert!(repo.update_line_status(line.id, Pending, CancelledClient).await.unwrap());
        assert!(!repo.update_line_status(line.id, Pending, Confirmed).await.unwrap());
        assert!(!repo.update_line_status(LineId::new(), Pending, Confirmed).await.unwrap());

        let stored = repo.get_line(line.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CancelledClient);
    }

    #[tokio::test]
    async fn test_history_is_most_recent_first() {
        let repo = InMemoryRepository::new();
        let order_id = OrderId::new();
        let line_id = LineId::new();

        repo.append_history(&StatusHistoryEntry::for_order(
            order_id,
            None,
            OrderStatus::Pending,
            None,
            None,
        ))
        .await
        .unwrap();
        repo.append_history(&StatusHistoryEntry::for_line(
            order_id,
            line_id,
            Some(OrderStatusCode::Pending),
            OrderStatusCode::Confirmed,
            None,
            None,
        ))
        .await
        .unwrap();

        let history = repo.query_history(HistoryQuery::for_order(order_id)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].line_id, Some(line_id));
        assert!(history[1].is_order_level());

        let order_level = repo
            .query_history(HistoryQuery::for_order(order_id).order_level_only())
            .await
            .unwrap();
        assert_eq!(order_level.len(), 1);

        let limited = repo
            .query_history(HistoryQuery::for_order(order_id).limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let repo = InMemoryRepository::new();
        repo.set_failures(FailureSwitches {
            stock_reads: true,
            line_inserts: true,
            ..Default::default()
        })
        .await;

        assert!(repo.get_stock(ProductId::new(1)).await.is_err());
        assert!(repo.insert_lines(&[]).await.is_err());
        assert!(repo.query_history(HistoryQuery::new()).await.is_ok());
    }
}
