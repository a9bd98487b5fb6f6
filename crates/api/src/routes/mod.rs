pub mod health;
pub mod lines;
pub mod metrics;
pub mod orders;
pub mod shipping;
pub mod stock;

use uuid::Uuid;

use crate::error::ApiError;

fn parse_uuid(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
