//! Status-specific side effects run after a line transition is persisted.

use async_trait::async_trait;
use common::OrderStatusCode;
use store::OrderLineRecord;

use crate::error::Result;

/// Extension point invoked once per applied line transition.
///
/// A failing hook is logged; the transition it follows stays applied.
#[async_trait]
pub trait StatusSideEffects: Send + Sync {
    /// `line` already carries the new status.
    async fn on_line_status_changed(
        &self,
        line: &OrderLineRecord,
        previous: OrderStatusCode,
    ) -> Result<()>;
}

/// Runs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSideEffects;

#[async_trait]
impl StatusSideEffects for NoSideEffects {
    async fn on_line_status_changed(
        &self,
        _line: &OrderLineRecord,
        _previous: OrderStatusCode,
    ) -> Result<()> {
        Ok(())
    }
}
