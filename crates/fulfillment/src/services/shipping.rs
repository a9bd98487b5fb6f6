//! Order-bound shipping fees.

use std::sync::Arc;

use common::OrderId;
use domain::{ShippingEstimate, ShippingRateEngine, ShippingRequest, Weight};
use store::{LineFilter, OrderRepository};
use tracing::info;

use crate::config::FulfillmentConfig;
use crate::error::{FulfillmentError, Result};

/// Prices shipping for stored orders with the same engine the checkout
/// estimate uses.
#[derive(Clone)]
pub struct OrderShippingService<S: OrderRepository> {
    store: S,
    engine: ShippingRateEngine,
    config: Arc<FulfillmentConfig>,
}

impl<S: OrderRepository> OrderShippingService<S> {
    pub fn new(store: S, engine: ShippingRateEngine, config: Arc<FulfillmentConfig>) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    pub fn engine(&self) -> &ShippingRateEngine {
        &self.engine
    }

    /// Quotes a parcel without touching any order.
    pub fn calculate_shipping_estimate(&self, request: &ShippingRequest) -> ShippingEstimate {
        self.engine.estimate(request)
    }

    /// Parcel weight of `quantity` units at the configured unit weight.
    pub fn parcel_weight(&self, quantity: u32) -> Weight {
        self.config.assumed_unit_weight.times(quantity)
    }

    /// Recomputes an order's shipping cost from its address and lines and
    /// stores it along with the new total.
    #[tracing::instrument(skip(self))]
    pub async fn calculate_shipping_fee(&self, order_id: OrderId) -> Result<ShippingEstimate> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("Order", order_id))?;
        let lines = self.store.find_lines(LineFilter::for_order(order_id)).await?;

        let quantity = lines
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity));
        let request = ShippingRequest::new(
            self.parcel_weight(quantity),
            &order.shipping_address.country,
            &order.shipping_address.postal_code,
            order.subtotal,
        );
        let estimate = self.engine.estimate(&request);

        let total = order.subtotal + order.tax_amount + estimate.fee;
        if !self
            .store
            .update_order_shipping(order_id, estimate.fee, total)
            .await?
        {
            return Err(FulfillmentError::not_found("Order", order_id));
        }

        info!(%order_id, zone = %estimate.zone, fee = %estimate.fee, "shipping fee stored");
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{
        Address, CustomerId, LineId, Money, OrderStatus, OrderStatusCode, ProductId,
    };
    use domain::{ShippingRates, ShippingZone};
    use store::{InMemoryRepository, OrderLineRecord, OrderRecord};

    use super::*;

    fn service(repo: InMemoryRepository) -> OrderShippingService<InMemoryRepository> {
        OrderShippingService::new(
            repo,
            ShippingRateEngine::new(Arc::new(ShippingRates::standard())),
            Arc::new(FulfillmentConfig::default()),
        )
    }

    async fn seed(
        repo: &InMemoryRepository,
        postal_code: &str,
        quantities: &[u32],
        subtotal: Money,
    ) -> OrderId {
        let now = Utc::now();
        let address = Address::new("Paul Bernard", "3 cours Napoléon", postal_code, "Ville", "FR");
        let tax = subtotal.percentage(20);
        let order = OrderRecord {
            id: OrderId::new(),
            order_number: format!("CMD-TEST-{}", uuid::Uuid::new_v4()),
            customer_id: CustomerId::new(),
            status: OrderStatus::Pending,
            subtotal,
            tax_amount: tax,
            shipping_cost: Money::zero(),
            total: subtotal + tax,
            billing_address: address.clone(),
            shipping_address: address,
            note: None,
            created_at: now,
            updated_at: now,
        };
        repo.insert_order(&order).await.unwrap();

        let lines: Vec<OrderLineRecord> = quantities
            .iter()
            .enumerate()
            .map(|(i, &quantity)| OrderLineRecord {
                id: LineId::new(),
                order_id: order.id,
                product_id: ProductId::new(i as i64 + 1),
                product_name: format!("Article {i}"),
                quantity,
                unit_price: Money::from_cents(100),
                vat_rate: 20,
                discount: 0,
                subtotal: Money::from_cents(100).multiply(quantity),
                status: OrderStatusCode::Pending,
                created_at: now,
                updated_at: now,
            })
            .collect();
        repo.insert_lines(&lines).await.unwrap();
        order.id
    }

    #[tokio::test]
    async fn test_fee_is_persisted_with_total() {
        let repo = InMemoryRepository::new();
        let service = service(repo.clone());
        // 3 units × 500 g = 1.5 kg in Corsica
        let order_id = seed(&repo, "20000", &[2, 1], Money::from_euros(30)).await;

        let estimate = service.calculate_shipping_fee(order_id).await.unwrap();
        assert_eq!(estimate.zone, ShippingZone::FrCorsica);
        assert_eq!(estimate.fee, Money::from_cents(990));

        let order = repo.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.shipping_cost, Money::from_cents(990));
        assert_eq!(order.total, Money::from_cents(3000 + 600 + 990));
    }

    #[tokio::test]
    async fn test_fee_matches_standalone_estimate() {
        let repo = InMemoryRepository::new();
        let service = service(repo.clone());
        let order_id = seed(&repo, "75001", &[5], Money::from_euros(50)).await;

        let stored = service.calculate_shipping_fee(order_id).await.unwrap();
        let quoted = service.calculate_shipping_estimate(&ShippingRequest::new(
            Weight::from_grams(2500),
            "FR",
            "75001",
            Money::from_euros(50),
        ));
        assert_eq!(stored, quoted);
    }

    #[tokio::test]
    async fn test_large_order_ships_free() {
        let repo = InMemoryRepository::new();
        let service = service(repo.clone());
        let order_id = seed(&repo, "97400", &[40], Money::from_euros(150)).await;

        let estimate = service.calculate_shipping_fee(order_id).await.unwrap();
        assert!(estimate.free_shipping);
        assert_eq!(estimate.fee, Money::zero());
    }

    #[tokio::test]
    async fn test_quantity_sum_saturates() {
        let repo = InMemoryRepository::new();
        let service = service(repo.clone());
        let order_id = seed(&repo, "75001", &[u32::MAX, 3], Money::from_euros(50)).await;

        let stored = service.calculate_shipping_fee(order_id).await.unwrap();
        let quoted = service.calculate_shipping_estimate(&ShippingRequest::new(
            service.parcel_weight(u32::MAX),
            "FR",
            "75001",
            Money::from_euros(50),
        ));
        assert_eq!(stored, quoted);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let service = service(InMemoryRepository::new());
        let err = service.calculate_shipping_fee(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::NotFound { entity: "Order", .. }));
    }
}
