//! Order commands, pricing and numbering rules.

mod commands;
mod number;
mod totals;

pub use commands::{CancelOrder, CreateOrder, OrderLineInput, UpdateLineStatus};
pub use number::{day_bounds, fallback_order_number, sequential_order_number};
pub use totals::{DEFAULT_VAT_RATE, OrderTotals, PricedLine, line_subtotal};

use common::{OrderStatus, OrderStatusCode};

use crate::ValidationError;

/// Orders can be cancelled until they ship.
pub fn ensure_cancellable(status: OrderStatus) -> Result<(), ValidationError> {
    if status.code() >= OrderStatusCode::Ready.code() {
        return Err(ValidationError::OrderNotCancellable { status });
    }
    Ok(())
}

/// Orders can only be destroyed while nothing has happened to them yet.
pub fn ensure_deletable(status: OrderStatus) -> Result<(), ValidationError> {
    if status != OrderStatus::Pending {
        return Err(ValidationError::OrderNotDeletable { status });
    }
    Ok(())
}

/// Checks every line transition before any of them is applied.
pub fn validate_transitions<I>(transitions: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = (OrderStatusCode, OrderStatusCode)>,
{
    for (from, to) in transitions {
        if !from.can_transition_to(to) {
            return Err(ValidationError::InvalidTransition { from, to });
        }
    }
    Ok(())
}
