//! HTTP API server with observability for the order fulfillment engine.
//!
//! Exposes stock reservations, shipping quotes, order workflows and line
//! status transitions over REST, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::ShippingRates;
use fulfillment::{FulfillmentConfig, NoSideEffects, OrderFulfillmentCoordinator};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{FulfillmentStore, KeyValueStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S, K>
where
    S: FulfillmentStore + Clone,
    K: KeyValueStore + Clone,
{
    pub coordinator: OrderFulfillmentCoordinator<S, K>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, K>(state: Arc<AppState<S, K>>, metrics_handle: PrometheusHandle) -> Router
where
    S: FulfillmentStore + Clone + 'static,
    K: KeyValueStore + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/stock/{product_id}/availability",
            get(routes::stock::availability::<S, K>),
        )
        .route("/stock/{product_id}/alert", get(routes::stock::alert::<S, K>))
        .route(
            "/stock/{product_id}/reservations",
            post(routes::stock::reserve::<S, K>),
        )
        .route(
            "/stock/{product_id}/reservations/{session_id}",
            put(routes::stock::update::<S, K>).delete(routes::stock::release::<S, K>),
        )
        .route(
            "/stock/{product_id}/reservations/{session_id}/confirm",
            post(routes::stock::confirm::<S, K>),
        )
        .route("/shipping/estimate", post(routes::shipping::estimate::<S, K>))
        .route("/orders", post(routes::orders::create::<S, K>))
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S, K>).delete(routes::orders::delete::<S, K>),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S, K>))
        .route("/orders/{id}/shipping", post(routes::orders::shipping::<S, K>))
        .route("/orders/{id}/history", get(routes::orders::history::<S, K>))
        .route(
            "/order-lines/{line_id}/status",
            put(routes::lines::update_status::<S, K>),
        )
        .route(
            "/order-lines/{line_id}/history",
            get(routes::lines::history::<S, K>),
        )
        .route(
            "/order-statuses/{code}",
            get(routes::lines::status_info::<S, K>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the fulfillment services over the given stores with the standard
/// shipping rates.
pub fn create_state<S, K>(store: S, kv: K, config: FulfillmentConfig) -> Arc<AppState<S, K>>
where
    S: FulfillmentStore + Clone,
    K: KeyValueStore + Clone,
{
    let coordinator = OrderFulfillmentCoordinator::new(
        store,
        kv,
        NoSideEffects,
        Arc::new(config),
        Arc::new(ShippingRates::standard()),
    );
    Arc::new(AppState { coordinator })
}
