//! Order creation, lookup, cancellation and deletion endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, UserId};
use domain::{CancelOrder, CreateOrder, ShippingEstimate};
use fulfillment::OrderDetails;
use serde::Deserialize;
use store::{FulfillmentStore, KeyValueStore, OrderRecord, StatusHistoryEntry};

use super::parse_uuid;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub out_of_stock: bool,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// POST /orders: price, number and store an order with its lines.
#[tracing::instrument(skip(state, cmd))]
pub async fn create<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Json(cmd): Json<CreateOrder>,
) -> Result<(StatusCode, Json<OrderDetails>), ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let details = state.coordinator.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /orders/:id: an order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.coordinator.get_order(order_id).await?))
}

/// DELETE /orders/:id: destroy a pending order.
#[tracing::instrument(skip(state))]
pub async fn delete<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let order_id = parse_order_id(&id)?;
    state.coordinator.delete_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /orders/:id/cancel: cancel every line of an order.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<OrderRecord>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let cmd = CancelOrder {
        order_id: parse_order_id(&id)?,
        reason: req.reason,
        out_of_stock: req.out_of_stock,
        user_id: req.user_id,
    };
    Ok(Json(state.coordinator.cancel_order(cmd).await?))
}

/// POST /orders/:id/shipping: recompute and store the order's shipping fee.
#[tracing::instrument(skip(state))]
pub async fn shipping<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(id): Path<String>,
) -> Result<Json<ShippingEstimate>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.coordinator.calculate_shipping_fee(order_id).await?))
}

/// GET /orders/:id/history: order and line status changes, most recent first.
#[tracing::instrument(skip(state))]
pub async fn history<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusHistoryEntry>>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let order_id = parse_order_id(&id)?;
    Ok(Json(
        state
            .coordinator
            .status()
            .get_order_status_history(order_id)
            .await,
    ))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    parse_uuid(id).map(OrderId::from_uuid)
}
