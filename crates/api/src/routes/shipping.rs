//! Shipping quote endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::Money;
use domain::{ShippingEstimate, ShippingRequest, Weight};
use serde::Deserialize;
use store::{FulfillmentStore, KeyValueStore};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub weight_kg: f64,
    pub country: String,
    #[serde(default)]
    pub postal_code: String,
    pub order_amount_cents: i64,
}

/// POST /shipping/estimate: quote a parcel without any order.
#[tracing::instrument(skip(state))]
pub async fn estimate<S, K>(
    State(state): State<Arc<AppState<S, K>>>,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<ShippingEstimate>, ApiError>
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    if req.country.trim().is_empty() {
        return Err(ApiError::BadRequest("country is required".to_string()));
    }
    if !req.weight_kg.is_finite() || req.weight_kg < 0.0 {
        return Err(ApiError::BadRequest(format!(
            "Invalid weight: {}",
            req.weight_kg
        )));
    }

    let request = ShippingRequest::new(
        Weight::from_kg_f64(req.weight_kg),
        req.country.trim().to_ascii_uppercase(),
        req.postal_code.trim(),
        Money::from_cents(req.order_amount_cents),
    );
    Ok(Json(
        state
            .coordinator
            .shipping()
            .calculate_shipping_estimate(&request),
    ))
}
