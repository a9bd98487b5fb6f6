//! Order line status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{LineId, OrderStatusCode, StatusInfo, UserId};
use domain::UpdateLineStatus;
use serde::Deserialize;
use store::{FulfillmentStore, KeyValueStore, OrderLineRecord, StatusHistoryEntry};

use super::parse_uuid;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Numeric line status code.
    pub status: u16,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// PUT /order-lines/:line_id/status: move a line along the status graph.
#[tracing::instrument(skip(state))]
pub async fn update_status<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(line_id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderLineRecord>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let cmd = UpdateLineStatus {
        line_id: parse_line_id(&line_id)?,
        status: OrderStatusCode::from_code(req.status)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        comment: req.comment,
        user_id: req.user_id,
    };
    Ok(Json(state.coordinator.status().update_line_status(cmd).await?))
}

/// GET /order-lines/:line_id/history
#[tracing::instrument(skip(state))]
pub async fn history<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(line_id): Path<String>,
) -> Result<Json<Vec<StatusHistoryEntry>>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let line_id = parse_line_id(&line_id)?;
    Ok(Json(
        state
            .coordinator
            .status()
            .get_line_status_history(line_id)
            .await,
    ))
}

/// GET /order-statuses/:code: label, color and flags of a line status.
pub async fn status_info<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(code): Path<u16>,
) -> Result<Json<StatusInfo>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    state
        .coordinator
        .status()
        .get_status_info(code)
        .map(Json)
        .map_err(|e| ApiError::NotFound(e.to_string()))
}

fn parse_line_id(id: &str) -> Result<LineId, ApiError> {
    parse_uuid(id).map(LineId::from_uuid)
}
