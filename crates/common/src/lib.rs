//! Shared types for the order fulfillment engine.
//!
//! Identifiers, addresses, monetary amounts and the order/line status codes are
//! used by every other crate in the workspace, including the storage layer.

pub mod address;
pub mod money;
pub mod status;
pub mod types;

pub use address::Address;
pub use money::Money;
pub use status::{OrderStatus, OrderStatusCode, StatusInfo};
pub use types::{CustomerId, LineId, OrderId, ProductId, SessionId, UserId};
