//! Zone rate tables and the zone resolution rule.

use std::collections::HashSet;

use common::Money;
use serde::{Deserialize, Serialize};

use super::{ShippingZone, Weight};

/// Delivery window in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryWindow {
    pub min_days: u32,
    pub max_days: u32,
}

impl DeliveryWindow {
    pub const fn new(min_days: u32, max_days: u32) -> Self {
        Self { min_days, max_days }
    }
}

/// Fee charged from `min_weight` upward, until the next tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightTier {
    pub min_weight: Weight,
    pub fee: Money,
}

impl WeightTier {
    pub const fn new(min_weight: Weight, fee: Money) -> Self {
        Self { min_weight, fee }
    }
}

/// Tier table and delivery window of one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRates {
    tiers: Vec<WeightTier>,
    delivery: DeliveryWindow,
}

impl ZoneRates {
    /// Builds a zone table. Tiers are sorted by weight; an empty table charges nothing.
    pub fn new(mut tiers: Vec<WeightTier>, delivery: DeliveryWindow) -> Self {
        tiers.sort_by_key(|tier| tier.min_weight);
        Self { tiers, delivery }
    }

    /// Fee of the heaviest tier at or below `weight`, or the lightest tier's fee
    /// when `weight` sits below every tier.
    pub fn fee_for(&self, weight: Weight) -> Money {
        self.tiers
            .iter()
            .rev()
            .find(|tier| tier.min_weight <= weight)
            .or_else(|| self.tiers.first())
            .map(|tier| tier.fee)
            .unwrap_or_default()
    }

    pub fn delivery(&self) -> DeliveryWindow {
        self.delivery
    }

    pub fn tiers(&self) -> &[WeightTier] {
        &self.tiers
    }
}

/// Every input the shipping engine prices with.
///
/// Built once at startup and shared between the estimate and the
/// order-bound fee path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingRates {
    fr_metro: ZoneRates,
    fr_corsica: ZoneRates,
    fr_dom: ZoneRates,
    eu: ZoneRates,
    world: ZoneRates,
    eu_countries: HashSet<String>,
    free_shipping_threshold: Money,
    free_delivery: DeliveryWindow,
}

const TIER_KG: [u64; 5] = [0, 1, 5, 10, 30];

const EU_COUNTRIES: [&str; 26] = [
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "DE", "GR", "HU", "IE", "IT", "LV",
    "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

fn standard_zone(fees_cents: [i64; 5], delivery: DeliveryWindow) -> ZoneRates {
    let tiers = TIER_KG
        .into_iter()
        .zip(fees_cents)
        .map(|(kg, cents)| WeightTier::new(Weight::from_kilograms(kg), Money::from_cents(cents)))
        .collect();
    ZoneRates::new(tiers, delivery)
}

impl ShippingRates {
    /// The production tariff.
    pub fn standard() -> Self {
        Self {
            fr_metro: standard_zone([490, 690, 990, 1490, 2490], DeliveryWindow::new(2, 3)),
            fr_corsica: standard_zone([790, 990, 1490, 1990, 3490], DeliveryWindow::new(4, 7)),
            fr_dom: standard_zone([1290, 1890, 2990, 4490, 7990], DeliveryWindow::new(4, 7)),
            eu: standard_zone([990, 1490, 2490, 3490, 5990], DeliveryWindow::new(5, 8)),
            world: standard_zone([1990, 2990, 4990, 7990, 12990], DeliveryWindow::new(10, 21)),
            eu_countries: EU_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            free_shipping_threshold: Money::from_euros(100),
            free_delivery: DeliveryWindow::new(2, 3),
        }
    }

    pub fn with_free_shipping_threshold(mut self, threshold: Money) -> Self {
        self.free_shipping_threshold = threshold;
        self
    }

    pub fn with_zone(mut self, zone: ShippingZone, rates: ZoneRates) -> Self {
        match zone {
            ShippingZone::FrMetro => self.fr_metro = rates,
            ShippingZone::FrCorsica => self.fr_corsica = rates,
            ShippingZone::FrDom => self.fr_dom = rates,
            ShippingZone::Eu => self.eu = rates,
            ShippingZone::World => self.world = rates,
            ShippingZone::Free => {}
        }
        self
    }

    pub fn free_shipping_threshold(&self) -> Money {
        self.free_shipping_threshold
    }

    pub fn free_delivery(&self) -> DeliveryWindow {
        self.free_delivery
    }

    /// Tier table for a destination zone. `Free` has none.
    pub fn zone_rates(&self, zone: ShippingZone) -> Option<&ZoneRates> {
        match zone {
            ShippingZone::FrMetro => Some(&self.fr_metro),
            ShippingZone::FrCorsica => Some(&self.fr_corsica),
            ShippingZone::FrDom => Some(&self.fr_dom),
            ShippingZone::Eu => Some(&self.eu),
            ShippingZone::World => Some(&self.world),
            ShippingZone::Free => None,
        }
    }

    pub fn is_eu_country(&self, country: &str) -> bool {
        self.eu_countries.contains(country)
    }

    /// Maps a destination to its zone.
    ///
    /// France is split by the first two postal digits: "20" is Corsica,
    /// "97" and "98" are the overseas departments.
    pub fn resolve_zone(&self, country: &str, postal_code: &str) -> ShippingZone {
        let country = country.trim().to_ascii_uppercase();
        if country != "FR" {
            return if self.is_eu_country(&country) {
                ShippingZone::Eu
            } else {
                ShippingZone::World
            };
        }

        match postal_code.trim().get(..2) {
            Some("20") => ShippingZone::FrCorsica,
            Some("97") | Some("98") => ShippingZone::FrDom,
            _ => ShippingZone::FrMetro,
        }
    }
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self::standard()
    }
}
