//! Stock reservation, order status and order fulfillment services.
//!
//! Every service is generic over the store traits in the `store` crate, so the
//! same code runs against the in-memory stores in tests and PostgreSQL/Redis
//! in production.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod ledger;
pub mod services;

pub use config::{FulfillmentConfig, ReservationMode, UnknownReservationMode};
pub use coordinator::{OrderDetails, OrderFulfillmentCoordinator};
pub use error::{FulfillmentError, Result};
pub use hooks::{NoSideEffects, StatusSideEffects};
pub use ledger::ReservationLedger;
pub use services::{OrderShippingService, OrderStatusStateMachine, StockAvailabilityService};
