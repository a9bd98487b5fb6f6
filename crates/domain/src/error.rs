//! Validation errors raised by the fulfillment rules.

use common::{Money, OrderStatus, OrderStatusCode};
use thiserror::Error;

/// A request or transition the rules refuse.
///
/// Always surfaced to the caller; never coerced into a default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The line status graph has no edge between the two codes.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: OrderStatusCode,
        to: OrderStatusCode,
    },

    #[error("Quantity must be greater than 0 (got {quantity})")]
    NonPositiveQuantity { quantity: i64 },

    #[error("Order must contain at least one line")]
    NoLines,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid discount: {discount}% (must be between 0 and 100)")]
    InvalidDiscount { discount: u32 },

    #[error("Invalid unit price: {price} (must not be negative)")]
    NegativeUnitPrice { price: Money },

    #[error("Invalid VAT rate: {rate}% (must be between 0 and 100)")]
    InvalidVatRate { rate: u32 },

    #[error("Order cannot be cancelled in status {status}")]
    OrderNotCancellable { status: OrderStatus },

    #[error("Order can only be deleted while pending (current status {status})")]
    OrderNotDeletable { status: OrderStatus },

    #[error("Unknown status code: {0}")]
    UnknownStatusCode(u16),
}

impl From<common::status::UnknownStatusCode> for ValidationError {
    fn from(err: common::status::UnknownStatusCode) -> Self {
        ValidationError::UnknownStatusCode(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_names_both_codes() {
        let err = ValidationError::InvalidTransition {
            from: OrderStatusCode::Delivered,
            to: OrderStatusCode::Confirmed,
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition: DELIVERED (6) -> CONFIRMED (2)"
        );
    }

    #[test]
    fn test_unknown_code_conversion() {
        let err: ValidationError = OrderStatusCode::from_code(7).unwrap_err().into();
        assert_eq!(err, ValidationError::UnknownStatusCode(7));
    }
}
