//! Pure fulfillment rules.
//!
//! Nothing in this crate performs I/O:
//! - [`shipping`]: zone resolution, weight tiers and the free-shipping bypass
//! - [`stock`]: available-to-sell arithmetic and alert levels
//! - [`reservation`]: the temporary hold record and its cache keys
//! - [`order`]: commands, totals, order numbers and lifecycle guards
//! - [`rollup`]: order status convergence

pub mod error;
pub mod order;
pub mod reservation;
pub mod rollup;
pub mod shipping;
pub mod stock;

pub use error::ValidationError;
pub use order::{
    CancelOrder, CreateOrder, DEFAULT_VAT_RATE, OrderLineInput, OrderTotals, PricedLine,
    UpdateLineStatus,
};
pub use reservation::{
    DEFAULT_RESERVATION_TOTAL_TTL, DEFAULT_RESERVATION_TTL, Reservation, reservation_key,
    reserved_total_key,
};
pub use rollup::{converged_line_status, rollup_order_status};
pub use shipping::{
    DeliveryWindow, ShippingEstimate, ShippingRateEngine, ShippingRates, ShippingRequest,
    ShippingZone, Weight,
};
pub use stock::{AvailabilityCheck, LOW_STOCK_THRESHOLD, StockAlert, StockAlertLevel};
