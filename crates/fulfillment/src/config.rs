//! Service configuration, built once at startup and shared by `Arc`.

use std::str::FromStr;
use std::time::Duration;

use domain::{DEFAULT_RESERVATION_TOTAL_TTL, DEFAULT_RESERVATION_TTL, DEFAULT_VAT_RATE, Weight};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How strictly reservations guard against overselling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationMode {
    /// Check availability, then write. Two concurrent callers can both pass
    /// the check and oversell by the overlap.
    #[default]
    BestEffort,
    /// Grow the per-product total with a single atomic
    /// increment-with-ceiling, so concurrent holds never exceed stock.
    Atomic,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown reservation mode: {0} (expected best_effort or atomic)")]
pub struct UnknownReservationMode(pub String);

impl FromStr for ReservationMode {
    type Err = UnknownReservationMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(ReservationMode::BestEffort),
            "atomic" => Ok(ReservationMode::Atomic),
            other => Err(UnknownReservationMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for ReservationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationMode::BestEffort => write!(f, "best_effort"),
            ReservationMode::Atomic => write!(f, "atomic"),
        }
    }
}

/// Tunables of the fulfillment services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentConfig {
    /// Lifetime of one reservation.
    pub reservation_ttl: Duration,
    /// Safety lifetime of a product's running total of held units.
    pub reservation_total_ttl: Duration,
    /// Availability at or below this is "low".
    pub low_stock_threshold: i64,
    /// VAT rate for lines that carry none, in percent.
    pub default_vat_rate: u32,
    pub reservation_mode: ReservationMode,
    /// Per-unit weight used to approximate parcel weight.
    pub assumed_unit_weight: Weight,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            reservation_ttl: DEFAULT_RESERVATION_TTL,
            reservation_total_ttl: DEFAULT_RESERVATION_TOTAL_TTL,
            low_stock_threshold: domain::LOW_STOCK_THRESHOLD,
            default_vat_rate: DEFAULT_VAT_RATE,
            reservation_mode: ReservationMode::BestEffort,
            assumed_unit_weight: Weight::from_grams(500),
        }
    }
}

impl FulfillmentConfig {
    pub fn with_reservation_mode(mut self, mode: ReservationMode) -> Self {
        self.reservation_mode = mode;
        self
    }

    pub fn with_reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }
}
