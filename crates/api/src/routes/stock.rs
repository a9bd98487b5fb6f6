//! Stock availability and cart reservation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{OrderId, ProductId, SessionId};
use domain::stock::is_low_stock;
use domain::{AvailabilityCheck, StockAlert};
use serde::{Deserialize, Serialize};
use store::{FulfillmentStore, KeyValueStore};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub session_id: SessionId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReservationRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub order_id: OrderId,
}

// -- Response types --

#[derive(Serialize)]
pub struct StockAlertResponse {
    #[serde(flatten)]
    pub alert: StockAlert,
    pub low_stock: bool,
}

#[derive(Serialize)]
pub struct ReservationResponse {
    pub success: bool,
    /// Availability after the call.
    pub available: i64,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub confirmed: bool,
}

// -- Handlers --

/// GET /stock/:product_id/availability?quantity=N
#[tracing::instrument(skip(state))]
pub async fn availability<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(product_id): Path<i64>,
    Query(query): Query<AvailabilityQuery>,
) -> Json<AvailabilityCheck>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let check = state
        .coordinator
        .stock()
        .check_availability(ProductId::new(product_id), query.quantity)
        .await;
    Json(check)
}

/// GET /stock/:product_id/alert
#[tracing::instrument(skip(state))]
pub async fn alert<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(product_id): Path<i64>,
) -> Json<StockAlertResponse>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let alert = state
        .coordinator
        .stock()
        .get_stock_alert(ProductId::new(product_id))
        .await;
    let low_stock = is_low_stock(alert.stock, state.coordinator.config().low_stock_threshold);
    Json(StockAlertResponse { alert, low_stock })
}

/// POST /stock/:product_id/reservations: hold units for a cart session.
#[tracing::instrument(skip(state, req))]
pub async fn reserve<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path(product_id): Path<i64>,
    Json(req): Json<ReserveRequest>,
) -> Result<Json<ReservationResponse>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let product_id = ProductId::new(product_id);
    let stock = state.coordinator.stock();
    let success = stock
        .reserve_stock(product_id, req.quantity, &req.session_id)
        .await?;

    Ok(Json(ReservationResponse {
        success,
        available: stock.get_available_stock(product_id).await,
    }))
}

/// PUT /stock/:product_id/reservations/:session_id: change the held quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path((product_id, session_id)): Path<(i64, String)>,
    Json(req): Json<UpdateReservationRequest>,
) -> Result<Json<ReservationResponse>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let product_id = ProductId::new(product_id);
    let stock = state.coordinator.stock();
    let success = stock
        .update_reservation(product_id, &SessionId::from(session_id), req.quantity)
        .await?;

    Ok(Json(ReservationResponse {
        success,
        available: stock.get_available_stock(product_id).await,
    }))
}

/// DELETE /stock/:product_id/reservations/:session_id: always succeeds.
#[tracing::instrument(skip(state))]
pub async fn release<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path((product_id, session_id)): Path<(i64, String)>,
) -> StatusCode
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    state
        .coordinator
        .stock()
        .release_stock(ProductId::new(product_id), &SessionId::from(session_id))
        .await;
    StatusCode::NO_CONTENT
}

/// POST /stock/:product_id/reservations/:session_id/confirm: commit a hold to an order.
#[tracing::instrument(skip(state, req))]
pub async fn confirm<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Path((product_id, session_id)): Path<(i64, String)>,
    Json(req): Json<ConfirmRequest>,
) -> Json<ConfirmResponse>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let confirmed = state
        .coordinator
        .stock()
        .confirm_reservation(
            ProductId::new(product_id),
            &SessionId::from(session_id),
            req.order_id,
        )
        .await;
    Json(ConfirmResponse { confirmed })
}
