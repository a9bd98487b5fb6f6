//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ValidationError;
use fulfillment::FulfillmentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Error raised by a fulfillment service.
    Fulfillment(FulfillmentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match &err {
        FulfillmentError::Validation(validation) => match validation {
            ValidationError::InvalidTransition { .. }
            | ValidationError::OrderNotCancellable { .. }
            | ValidationError::OrderNotDeletable { .. } => (StatusCode::CONFLICT, err.to_string()),
            _ => (StatusCode::BAD_REQUEST, err.to_string()),
        },
        FulfillmentError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        FulfillmentError::Store(store_err) => {
            tracing::error!(error = %store_err, "store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Fulfillment(err.into())
    }
}
