//! Line status transitions and order status rollup.

use common::{LineId, OrderId, OrderStatus, OrderStatusCode, StatusInfo, UserId};
use domain::{UpdateLineStatus, ValidationError, rollup_order_status};
use store::{
    FulfillmentStore, HistoryQuery, LineFilter, OrderLineRecord, StatusHistoryEntry,
};
use tracing::{info, warn};

use crate::error::{FulfillmentError, Result};
use crate::hooks::{NoSideEffects, StatusSideEffects};

const ROLLUP_COMMENT: &str = "Statut mis à jour automatiquement";

/// Applies line status transitions and rolls converged lines up to the order.
///
/// The adjacency check runs before any write, whatever the store's health.
/// The order's own status is only ever written by [`Self::check_and_update_order_status`].
#[derive(Clone)]
pub struct OrderStatusStateMachine<S, H = NoSideEffects>
where
    S: FulfillmentStore,
    H: StatusSideEffects,
{
    store: S,
    hooks: H,
}

impl<S: FulfillmentStore> OrderStatusStateMachine<S, NoSideEffects> {
    pub fn new(store: S) -> Self {
        Self::with_hooks(store, NoSideEffects)
    }
}

impl<S, H> OrderStatusStateMachine<S, H>
where
    S: FulfillmentStore,
    H: StatusSideEffects,
{
    pub fn with_hooks(store: S, hooks: H) -> Self {
        Self { store, hooks }
    }

    /// Moves one line to a new status, then rolls the order up.
    #[tracing::instrument(skip(self), fields(line_id = %cmd.line_id, to = %cmd.status))]
    pub async fn update_line_status(&self, cmd: UpdateLineStatus) -> Result<OrderLineRecord> {
        let line = self
            .store
            .get_line(cmd.line_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("Order line", cmd.line_id))?;

        if !line.status.can_transition_to(cmd.status) {
            return Err(ValidationError::InvalidTransition {
                from: line.status,
                to: cmd.status,
            }
            .into());
        }

        let updated = self
            .apply_transition(line, cmd.status, cmd.comment, cmd.user_id)
            .await?;

        if let Err(e) = self.check_and_update_order_status(updated.order_id).await {
            warn!(order_id = %updated.order_id, error = %e, "order status rollup failed");
        }

        Ok(updated)
    }

    /// Writes an already validated transition, records it and runs the hooks.
    ///
    /// Does not roll the order up.
    pub(crate) async fn apply_transition(
        &self,
        mut line: OrderLineRecord,
        to: OrderStatusCode,
        comment: Option<String>,
        user_id: Option<UserId>,
    ) -> Result<OrderLineRecord> {
        let previous = line.status;
        if !self.store.update_line_status(line.id, previous, to).await? {
            // Another writer moved the line after it was read.
            return match self.store.get_line(line.id).await? {
                Some(current) => Err(ValidationError::InvalidTransition {
                    from: current.status,
                    to,
                }
                .into()),
                None => Err(FulfillmentError::not_found("Order line", line.id)),
            };
        }
        line.status = to;
        line.updated_at = chrono::Utc::now();

        let entry = StatusHistoryEntry::for_line(
            line.order_id,
            line.id,
            Some(previous),
            to,
            comment,
            user_id,
        );
        if let Err(e) = self.store.append_history(&entry).await {
            warn!(line_id = %line.id, error = %e, "failed to record line status history");
        }

        if let Err(e) = self.hooks.on_line_status_changed(&line, previous).await {
            warn!(line_id = %line.id, error = %e, "status side effect failed");
        }

        metrics::counter!("order_line_transitions_total", "to" => to.as_str()).increment(1);
        info!(line_id = %line.id, from = %previous, to = %to, "line status updated");
        Ok(line)
    }

    /// Writes the converged order status once every line shares one status.
    ///
    /// Returns the new order status, or `None` when the lines disagree or the
    /// order already carries the converged status.
    #[tracing::instrument(skip(self))]
    pub async fn check_and_update_order_status(
        &self,
        order_id: OrderId,
    ) -> Result<Option<OrderStatus>> {
        let lines = self.store.find_lines(LineFilter::for_order(order_id)).await?;
        let Some(target) = rollup_order_status(lines.iter().map(|line| line.status)) else {
            return Ok(None);
        };

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("Order", order_id))?;
        if order.status == target {
            return Ok(None);
        }

        if !self.store.update_order_status(order_id, target).await? {
            return Err(FulfillmentError::not_found("Order", order_id));
        }

        let entry = StatusHistoryEntry::for_order(
            order_id,
            Some(order.status),
            target,
            Some(ROLLUP_COMMENT.to_string()),
            None,
        );
        if let Err(e) = self.store.append_history(&entry).await {
            warn!(%order_id, error = %e, "failed to record order status history");
        }

        metrics::counter!("order_status_rollups_total").increment(1);
        info!(%order_id, from = %order.status, to = %target, "order status rolled up");
        Ok(Some(target))
    }

    /// Display metadata of a line status code.
    pub fn get_status_info(&self, code: u16) -> std::result::Result<StatusInfo, ValidationError> {
        Ok(OrderStatusCode::from_code(code)?.info())
    }

    /// Every status change of an order and its lines, most recent first.
    ///
    /// Empty when nothing was recorded or the history cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_status_history(&self, order_id: OrderId) -> Vec<StatusHistoryEntry> {
        self.read_history(HistoryQuery::for_order(order_id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_line_status_history(&self, line_id: LineId) -> Vec<StatusHistoryEntry> {
        self.read_history(HistoryQuery::for_line(line_id)).await
    }

    async fn read_history(&self, query: HistoryQuery) -> Vec<StatusHistoryEntry> {
        match self.store.query_history(query).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "status history read failed, returning empty history");
                Vec::new()
            }
        }
    }
}
