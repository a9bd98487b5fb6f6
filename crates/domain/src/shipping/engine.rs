use std::sync::Arc;

use common::Money;
use serde::{Deserialize, Serialize};

use super::{DeliveryWindow, ShippingRates, ShippingZone, Weight};

/// Input of a shipping quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRequest {
    pub weight: Weight,
    pub country: String,
    pub postal_code: String,
    /// Goods amount the free-shipping threshold is compared against.
    pub order_amount: Money,
}

impl ShippingRequest {
    pub fn new(
        weight: Weight,
        country: impl Into<String>,
        postal_code: impl Into<String>,
        order_amount: Money,
    ) -> Self {
        Self {
            weight,
            country: country.into(),
            postal_code: postal_code.into(),
            order_amount,
        }
    }
}

/// A shipping quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingEstimate {
    pub fee: Money,
    pub zone: ShippingZone,
    pub free_shipping: bool,
    pub delivery_estimate: DeliveryWindow,
}

/// Prices parcels against a shared [`ShippingRates`] table.
#[derive(Debug, Clone)]
pub struct ShippingRateEngine {
    rates: Arc<ShippingRates>,
}

impl ShippingRateEngine {
    pub fn new(rates: Arc<ShippingRates>) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &ShippingRates {
        &self.rates
    }

    /// Quotes a shipment.
    ///
    /// The free-shipping threshold is checked first and bypasses zone and
    /// weight entirely.
    pub fn estimate(&self, request: &ShippingRequest) -> ShippingEstimate {
        if request.order_amount >= self.rates.free_shipping_threshold() {
            return self.free_estimate();
        }

        let zone = self
            .rates
            .resolve_zone(&request.country, &request.postal_code);
        match self.rates.zone_rates(zone) {
            Some(table) => ShippingEstimate {
                fee: table.fee_for(request.weight),
                zone,
                free_shipping: false,
                delivery_estimate: table.delivery(),
            },
            None => self.free_estimate(),
        }
    }

    fn free_estimate(&self) -> ShippingEstimate {
        ShippingEstimate {
            fee: Money::zero(),
            zone: ShippingZone::Free,
            free_shipping: true,
            delivery_estimate: self.rates.free_delivery(),
        }
    }
}

impl Default for ShippingRateEngine {
    fn default() -> Self {
        Self::new(Arc::new(ShippingRates::standard()))
    }
}
