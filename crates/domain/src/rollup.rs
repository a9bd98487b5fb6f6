//! Order-level status derived from line statuses.

use common::{OrderStatus, OrderStatusCode};

/// The one status every line shares, if they all share one.
///
/// An order without lines never converges.
pub fn converged_line_status<I>(statuses: I) -> Option<OrderStatusCode>
where
    I: IntoIterator<Item = OrderStatusCode>,
{
    let mut statuses = statuses.into_iter();
    let first = statuses.next()?;
    statuses.all(|status| status == first).then_some(first)
}

/// Order status to write once every line has converged, or `None` while the
/// lines still disagree.
///
/// Lines split between the two cancellation codes do not converge even though
/// both map to [`OrderStatus::Cancelled`].
pub fn rollup_order_status<I>(statuses: I) -> Option<OrderStatus>
where
    I: IntoIterator<Item = OrderStatusCode>,
{
    converged_line_status(statuses).map(|status| status.order_status())
}
