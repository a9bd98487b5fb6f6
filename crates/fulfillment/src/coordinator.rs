//! Order creation, cancellation and deletion across the fulfillment services.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{LineId, OrderId, OrderStatus, OrderStatusCode, SessionId};
use domain::order::{
    day_bounds, ensure_cancellable, ensure_deletable, fallback_order_number,
    sequential_order_number, validate_transitions,
};
use domain::{
    CancelOrder, CreateOrder, OrderTotals, PricedLine, ShippingEstimate, ShippingRateEngine,
    ShippingRates, ShippingRequest,
};
use serde::Serialize;
use store::{
    FulfillmentStore, KeyValueStore, LineFilter, OrderLineRecord, OrderRecord, StatusHistoryEntry,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::FulfillmentConfig;
use crate::error::{FulfillmentError, Result};
use crate::hooks::{NoSideEffects, StatusSideEffects};
use crate::services::{OrderShippingService, OrderStatusStateMachine, StockAvailabilityService};

const CREATED_COMMENT: &str = "Commande créée";
const CANCELLED_COMMENT: &str = "Commande annulée";

/// An order with its lines in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    pub order: OrderRecord,
    pub lines: Vec<OrderLineRecord>,
}

/// Runs multi-step order workflows.
///
/// The store offers no multi-statement transactions, so a half-finished
/// create is undone by deleting what was written.
#[derive(Clone)]
pub struct OrderFulfillmentCoordinator<S, K, H = NoSideEffects>
where
    S: FulfillmentStore + Clone,
    K: KeyValueStore + Clone,
    H: StatusSideEffects,
{
    store: S,
    stock: StockAvailabilityService<S, K>,
    status: OrderStatusStateMachine<S, H>,
    shipping: OrderShippingService<S>,
    config: Arc<FulfillmentConfig>,
}

impl<S, K, H> OrderFulfillmentCoordinator<S, K, H>
where
    S: FulfillmentStore + Clone,
    K: KeyValueStore + Clone,
    H: StatusSideEffects,
{
    pub fn new(
        store: S,
        kv: K,
        hooks: H,
        config: Arc<FulfillmentConfig>,
        rates: Arc<ShippingRates>,
    ) -> Self {
        Self {
            stock: StockAvailabilityService::new(store.clone(), kv, config.clone()),
            status: OrderStatusStateMachine::with_hooks(store.clone(), hooks),
            shipping: OrderShippingService::new(
                store.clone(),
                ShippingRateEngine::new(rates),
                config.clone(),
            ),
            store,
            config,
        }
    }

    pub fn stock(&self) -> &StockAvailabilityService<S, K> {
        &self.stock
    }

    pub fn status(&self) -> &OrderStatusStateMachine<S, H> {
        &self.status
    }

    pub fn shipping(&self) -> &OrderShippingService<S> {
        &self.shipping
    }

    pub fn config(&self) -> &FulfillmentConfig {
        &self.config
    }

    /// Prices, numbers and stores a new order with its lines.
    ///
    /// Lines that fail to store take the order row down with them. When a
    /// session is given, its reservations are turned into committed stock.
    #[tracing::instrument(
        skip(self, cmd),
        fields(customer_id = %cmd.customer_id, lines = cmd.lines.len())
    )]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<OrderDetails> {
        let started = Instant::now();
        cmd.validate()?;

        let priced: Vec<PricedLine> = cmd
            .lines
            .iter()
            .map(|line| PricedLine::from_input(line, self.config.default_vat_rate))
            .collect();
        let goods = OrderTotals::from_lines(&priced);
        let estimate = self.quote(&cmd, &goods);
        let totals = goods.with_shipping(estimate.fee);

        let now = Utc::now();
        let order = OrderRecord {
            id: OrderId::new(),
            order_number: self.next_order_number(now).await,
            customer_id: cmd.customer_id,
            status: OrderStatus::Pending,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            shipping_cost: totals.shipping_cost,
            total: totals.total,
            billing_address: cmd.billing_address,
            shipping_address: cmd.shipping_address,
            note: cmd.note,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_order(&order).await?;

        let lines: Vec<OrderLineRecord> = cmd
            .lines
            .into_iter()
            .zip(&priced)
            .map(|(line, priced)| OrderLineRecord {
                id: LineId::new(),
                order_id: order.id,
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                vat_rate: priced.vat_rate,
                discount: line.discount,
                subtotal: priced.subtotal,
                status: OrderStatusCode::Pending,
                created_at: now,
                updated_at: now,
            })
            .collect();

        if let Err(e) = self.store.insert_lines(&lines).await {
            self.roll_back_order(order.id).await;
            return Err(e.into());
        }

        let entry = StatusHistoryEntry::for_order(
            order.id,
            None,
            OrderStatus::Pending,
            Some(CREATED_COMMENT.to_string()),
            None,
        );
        if let Err(e) = self.store.append_history(&entry).await {
            warn!(order_id = %order.id, error = %e, "failed to record initial order history");
        }

        if let Some(session_id) = &cmd.session_id {
            self.confirm_reservations(order.id, session_id, &lines).await;
        }

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("order_creation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "order created"
        );
        Ok(OrderDetails { order, lines })
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderDetails> {
        let order = self.load_order(order_id).await?;
        let lines = self.store.find_lines(LineFilter::for_order(order_id)).await?;
        Ok(OrderDetails { order, lines })
    }

    /// Cancels every line that is not cancelled yet.
    ///
    /// A line already carrying a cancellation code fixes the code for the
    /// rest, so the lines converge and the order rolls up to CANCELLED.
    /// All lines are checked against the transition table before the first
    /// one is written.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn cancel_order(&self, cmd: CancelOrder) -> Result<OrderRecord> {
        let order = self.load_order(cmd.order_id).await?;
        ensure_cancellable(order.status)?;

        let (cancelled, lines): (Vec<OrderLineRecord>, Vec<OrderLineRecord>) = self
            .store
            .find_lines(LineFilter::for_order(order.id))
            .await?
            .into_iter()
            .partition(|line| line.status.is_cancellation());
        let target = cancelled
            .first()
            .map_or_else(|| cmd.target_status(), |line| line.status);
        validate_transitions(lines.iter().map(|line| (line.status, target)))?;

        let comment = cmd
            .reason
            .clone()
            .unwrap_or_else(|| CANCELLED_COMMENT.to_string());
        for line in lines {
            self.status
                .apply_transition(line, target, Some(comment.clone()), cmd.user_id.clone())
                .await?;
        }

        if let Err(e) = self.status.check_and_update_order_status(order.id).await {
            warn!(order_id = %order.id, error = %e, "order status rollup failed after cancel");
        }

        info!(order_id = %order.id, status = %target, "order cancelled");
        self.load_order(order.id).await
    }

    /// Destroys a pending order and its lines.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<()> {
        let order = self.load_order(order_id).await?;
        ensure_deletable(order.status)?;

        let removed = self.store.delete_lines(order_id).await?;
        if !self.store.delete_order(order_id).await? {
            return Err(FulfillmentError::not_found("Order", order_id));
        }

        info!(%order_id, lines = removed, "order deleted");
        Ok(())
    }

    pub async fn calculate_shipping_fee(&self, order_id: OrderId) -> Result<ShippingEstimate> {
        self.shipping.calculate_shipping_fee(order_id).await
    }

    fn quote(&self, cmd: &CreateOrder, goods: &OrderTotals) -> ShippingEstimate {
        let request = ShippingRequest::new(
            self.shipping.parcel_weight(cmd.total_quantity()),
            &cmd.shipping_address.country,
            &cmd.shipping_address.postal_code,
            goods.subtotal,
        );
        self.shipping.calculate_shipping_estimate(&request)
    }

    async fn load_order(&self, order_id: OrderId) -> Result<OrderRecord> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("Order", order_id))
    }

    /// `CMD-YYYYMMDD-NNNN` from today's order count, or a timestamped number
    /// when the count fails or the candidate is taken.
    async fn next_order_number(&self, now: DateTime<Utc>) -> String {
        let date = now.date_naive();
        let (from, to) = day_bounds(date);

        let candidate = match self.store.count_orders_created_between(from, to).await {
            Ok(count) => sequential_order_number(date, count + 1),
            Err(e) => {
                warn!(error = %e, "order count failed, using fallback order number");
                return fallback_order_number(now, Uuid::new_v4());
            }
        };

        match self.store.order_number_exists(&candidate).await {
            Ok(false) => candidate,
            Ok(true) => fallback_order_number(now, Uuid::new_v4()),
            Err(e) => {
                warn!(error = %e, "order number check failed, using fallback order number");
                fallback_order_number(now, Uuid::new_v4())
            }
        }
    }

    async fn roll_back_order(&self, order_id: OrderId) {
        metrics::counter!("order_creation_rollbacks_total").increment(1);
        match self.store.delete_order(order_id).await {
            Ok(_) => warn!(%order_id, "order rolled back after line insert failure"),
            Err(e) => error!(%order_id, error = %e, "failed to roll back partially created order"),
        }
    }

    async fn confirm_reservations(
        &self,
        order_id: OrderId,
        session_id: &SessionId,
        lines: &[OrderLineRecord],
    ) {
        for line in lines {
            if !self
                .stock
                .confirm_reservation(line.product_id, session_id, order_id)
                .await
            {
                warn!(
                    %order_id,
                    product_id = %line.product_id,
                    "no reservation confirmed for order line"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use common::{Address, CustomerId, Money, ProductId};
    use domain::{OrderLineInput, ValidationError};
    use store::{FailureSwitches, InMemoryKeyValueStore, InMemoryRepository, OrderRepository};

    use super::*;

    type TestCoordinator = OrderFulfillmentCoordinator<InMemoryRepository, InMemoryKeyValueStore>;

    fn coordinator(repo: InMemoryRepository) -> TestCoordinator {
        OrderFulfillmentCoordinator::new(
            repo,
            InMemoryKeyValueStore::new(),
            NoSideEffects,
            Arc::new(FulfillmentConfig::default()),
            Arc::new(ShippingRates::standard()),
        )
    }

    fn checkout() -> CreateOrder {
        let address =
            Address::new("Claire Petit", "8 quai des Chartrons", "33000", "Bordeaux", "FR");
        CreateOrder::new(CustomerId::new(), address.clone(), address)
            .line(OrderLineInput::new(ProductId::new(1), "Théière", 1, Money::from_cents(2500)))
            .line(OrderLineInput::new(ProductId::new(2), "Tasse", 4, Money::from_cents(600)))
    }

    #[tokio::test]
    async fn test_create_prices_and_numbers_order() {
        let repo = InMemoryRepository::new();
        let coordinator = coordinator(repo.clone());

        let details = coordinator.create_order(checkout()).await.unwrap();

        let today = Utc::now().format("%Y%m%d").to_string();
        assert_eq!(details.order.order_number, format!("CMD-{today}-0001"));
        assert_eq!(details.order.status, OrderStatus::Pending);
        // 5 units × 500 g = 2.5 kg metro
        assert_eq!(details.order.subtotal, Money::from_cents(4900));
        assert_eq!(details.order.tax_amount, Money::from_cents(980));
        assert_eq!(details.order.shipping_cost, Money::from_cents(690));
        assert_eq!(details.order.total, Money::from_cents(6570));
        assert_eq!(details.lines.len(), 2);
        assert_eq!(details.lines[1].subtotal, Money::from_cents(2400));

        let second = coordinator.create_order(checkout()).await.unwrap();
        assert_eq!(second.order.order_number, format!("CMD-{today}-0002"));
    }

    #[tokio::test]
    async fn test_create_without_lines_writes_nothing() {
        let repo = InMemoryRepository::new();
        let coordinator = coordinator(repo.clone());
        let mut cmd = checkout();
        cmd.lines.clear();

        let err = coordinator.create_order(cmd).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::Validation(ValidationError::NoLines)));
        assert_eq!(repo.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_line_failure_rolls_back_order() {
        let repo = InMemoryRepository::new();
        let coordinator = coordinator(repo.clone());
        repo.set_failures(FailureSwitches {
            line_inserts: true,
            ..Default::default()
        })
        .await;

        let err = coordinator.create_order(checkout()).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::Store(_)));
        assert_eq!(repo.order_count().await, 0);
        assert_eq!(repo.line_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_rollback_still_returns_original_error() {
        let repo = InMemoryRepository::new();
        let coordinator = coordinator(repo.clone());
        repo.set_failures(FailureSwitches {
            line_inserts: true,
            order_deletes: true,
            ..Default::default()
        })
        .await;

        let err = coordinator.create_order(checkout()).await.unwrap_err();
        assert!(err.to_string().contains("line insert"));
        assert_eq!(repo.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_cancel_refused_once_shipped() {
        let repo = InMemoryRepository::new();
        let coordinator = coordinator(repo.clone());
        let details = coordinator.create_order(checkout()).await.unwrap();
        repo.update_order_status(details.order.id, OrderStatus::Shipped)
            .await
            .unwrap();

        let err = coordinator
            .cancel_order(CancelOrder::new(details.order.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::Validation(ValidationError::OrderNotCancellable {
                status: OrderStatus::Shipped
            })
        ));
    }

    #[tokio::test]
    async fn test_cancel_follows_existing_line_cancellation() {
        let repo = InMemoryRepository::new();
        let coordinator = coordinator(repo.clone());
        let details = coordinator.create_order(checkout()).await.unwrap();
        let out_of_stock = details.lines[0].id;
        assert!(
            repo.update_line_status(
                out_of_stock,
                OrderStatusCode::Pending,
                OrderStatusCode::CancelledStock
            )
            .await
            .unwrap()
        );

        let order = coordinator
            .cancel_order(CancelOrder::new(details.order.id))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Cancelled);
        let lines = repo
            .find_lines(LineFilter::for_order(details.order.id))
            .await
            .unwrap();
        assert!(
            lines
                .iter()
                .all(|line| line.status == OrderStatusCode::CancelledStock)
        );
    }

    #[tokio::test]
    async fn test_delete_requires_pending() {
        let repo = InMemoryRepository::new();
        let coordinator = coordinator(repo.clone());
        let details = coordinator.create_order(checkout()).await.unwrap();
        repo.update_order_status(details.order.id, OrderStatus::Confirmed)
            .await
            .unwrap();

        let err = coordinator.delete_order(details.order.id).await.unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::Validation(ValidationError::OrderNotDeletable { .. })
        ));
        assert_eq!(repo.line_count().await, 2);
    }
}
