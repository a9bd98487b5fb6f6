//! Shipping fee computation.
//!
//! The pure estimate and the order-bound fee share one [`ShippingRateEngine`],
//! so zone resolution and tier lookup exist exactly once.

mod engine;
mod rates;
mod zone;

pub use engine::{ShippingEstimate, ShippingRateEngine, ShippingRequest};
pub use rates::{DeliveryWindow, ShippingRates, WeightTier, ZoneRates};
pub use zone::{ShippingZone, Weight};
