//! Fulfillment error types.

use domain::ValidationError;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the fulfillment services.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The request or transition was refused.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An order, line or product id matched nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A cache or relational store call failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        FulfillmentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
