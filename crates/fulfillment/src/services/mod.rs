mod shipping;
mod status;
mod stock;

pub use shipping::OrderShippingService;
pub use status::OrderStatusStateMachine;
pub use stock::StockAvailabilityService;
