//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::ProductId;
use fulfillment::FulfillmentConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::{InMemoryKeyValueStore, InMemoryRepository, ProductStockRecord, ProductStockRepository};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// App over in-memory stores with product 42 holding 7 units.
async fn setup() -> axum::Router {
    let repo = InMemoryRepository::new();
    repo.upsert_stock(ProductStockRecord::new(ProductId::new(42), 7, 0))
        .await
        .unwrap();
    let state = api::create_state(repo, InMemoryKeyValueStore::new(), FulfillmentConfig::default());
    api::create_app(state, get_metrics_handle())
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn order_body(lines: Value) -> Value {
    let address = json!({
        "recipient": "Hugo Lefèvre",
        "line1": "5 place Bellecour",
        "postal_code": "69002",
        "city": "Lyon",
        "country": "FR"
    });
    json!({
        "customer_id": "6f1c1a52-3f7e-4b8a-9d0e-2c4a1b7e9f10",
        "lines": lines,
        "billing_address": address,
        "shipping_address": address,
    })
}

async fn create_order(app: &axum::Router) -> Value {
    let (status, json) = send(
        app,
        "POST",
        "/orders",
        Some(order_body(json!([
            { "product_id": 42, "product_name": "Théière", "quantity": 2, "unit_price": 2500 },
            {
                "product_id": 43,
                "product_name": "Tasse",
                "quantity": 3,
                "unit_price": 600,
                "discount": 10
            }
        ]))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;
    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reservation_flow() {
    let app = setup().await;

    let (status, json) = send(
        &app,
        "POST",
        "/stock/42/reservations",
        Some(json!({ "session_id": "cart-a", "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["available"], 2);

    let (_, json) = send(
        &app,
        "POST",
        "/stock/42/reservations",
        Some(json!({ "session_id": "cart-b", "quantity": 5 })),
    )
    .await;
    assert_eq!(json["success"], false);

    let (status, json) = send(&app, "GET", "/stock/42/availability?quantity=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], false);
    assert_eq!(json["stock"], 2);
    assert!(json["message"].as_str().unwrap().starts_with("Stock insuffisant"));

    let (_, json) = send(&app, "GET", "/stock/42/alert", None).await;
    assert_eq!(json["level"], "low");
    assert_eq!(json["low_stock"], true);
    assert_eq!(json["message"], "Plus que 2 en stock");

    let (status, json) = send(
        &app,
        "PUT",
        "/stock/42/reservations/cart-a",
        Some(json!({ "quantity": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], 0);

    let (status, _) = send(&app, "DELETE", "/stock/42/reservations/cart-a", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", "/stock/42/reservations/cart-a", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = send(&app, "GET", "/stock/42/availability", None).await;
    assert_eq!(json["available"], true);
    assert_eq!(json["stock"], 7);
}

#[tokio::test]
async fn test_zero_quantity_reservation_is_rejected() {
    let app = setup().await;
    let (status, json) = send(
        &app,
        "POST",
        "/stock/42/reservations",
        Some(json!({ "session_id": "cart-a", "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_confirm_reservation() {
    let app = setup().await;
    send(
        &app,
        "POST",
        "/stock/42/reservations",
        Some(json!({ "session_id": "cart-a", "quantity": 3 })),
    )
    .await;

    let body = json!({ "order_id": "0d7c3b55-9a51-4c55-8d0f-3c1f0f8a2b61" });
    let (status, json) = send(
        &app,
        "POST",
        "/stock/42/reservations/cart-a/confirm",
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["confirmed"], true);

    let (_, json) = send(&app, "POST", "/stock/42/reservations/cart-a/confirm", Some(body)).await;
    assert_eq!(json["confirmed"], false);

    // 7 physical, 3 committed, nothing held
    let (_, json) = send(&app, "GET", "/stock/42/availability", None).await;
    assert_eq!(json["stock"], 4);
}

#[tokio::test]
async fn test_shipping_estimate() {
    let app = setup().await;

    let (status, json) = send(
        &app,
        "POST",
        "/shipping/estimate",
        Some(json!({
            "weight_kg": 2.5,
            "country": "FR",
            "postal_code": "75001",
            "order_amount_cents": 5000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["zone"], "FR_METRO");
    assert_eq!(json["fee"], 690);
    assert_eq!(json["free_shipping"], false);
    assert_eq!(json["delivery_estimate"]["min_days"], 2);
    assert_eq!(json["delivery_estimate"]["max_days"], 3);

    let (_, json) = send(
        &app,
        "POST",
        "/shipping/estimate",
        Some(json!({
            "weight_kg": 1.0,
            "country": "FR",
            "postal_code": "75001",
            "order_amount_cents": 15000
        })),
    )
    .await;
    assert_eq!(json["zone"], "FREE");
    assert_eq!(json["fee"], 0);
    assert_eq!(json["free_shipping"], true);

    let (status, _) = send(
        &app,
        "POST",
        "/shipping/estimate",
        Some(json!({ "weight_kg": 1.0, "country": " ", "order_amount_cents": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_and_get_order() {
    let app = setup().await;
    let created = create_order(&app).await;

    // 50.00 + 16.20 goods, 5 units = 2.5 kg metro
    assert_eq!(created["order"]["subtotal"], 6620);
    assert_eq!(created["order"]["tax_amount"], 1324);
    assert_eq!(created["order"]["shipping_cost"], 690);
    assert_eq!(created["order"]["total"], 8634);
    assert_eq!(created["order"]["status"], 1);
    assert!(
        created["order"]["order_number"]
            .as_str()
            .unwrap()
            .starts_with("CMD-")
    );

    let order_id = created["order"]["id"].as_str().unwrap();
    let (status, json) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lines"].as_array().unwrap().len(), 2);
    assert_eq!(json["lines"][1]["subtotal"], 1620);

    let (status, json) = send(&app, "GET", &format!("/orders/{order_id}/history"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["comment"], "Commande créée");
}

#[tokio::test]
async fn test_create_order_without_lines() {
    let app = setup().await;
    let (status, json) = send(&app, "POST", "/orders", Some(order_body(json!([])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_line_status_transitions() {
    let app = setup().await;
    let created = create_order(&app).await;
    let order_id = created["order"]["id"].as_str().unwrap().to_string();
    let line_ids: Vec<String> = created["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["id"].as_str().unwrap().to_string())
        .collect();

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/order-lines/{}/status", line_ids[0]),
        Some(json!({ "status": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("PENDING (1)"));

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/order-lines/{}/status", line_ids[0]),
        Some(json!({ "status": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for line_id in &line_ids {
        let (status, json) = send(
            &app,
            "PUT",
            &format!("/order-lines/{line_id}/status"),
            Some(json!({ "status": 2, "comment": "Paiement reçu", "user_id": "admin-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], 2);
    }

    let (_, json) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(json["order"]["status"], 2);

    let (status, json) = send(
        &app,
        "GET",
        &format!("/order-lines/{}/history", line_ids[0]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["user_id"], "admin-1");

    let (status, _) = send(
        &app,
        "PUT",
        "/order-lines/6f1c1a52-3f7e-4b8a-9d0e-2c4a1b7e9f10/status",
        Some(json!({ "status": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_then_delete_is_refused() {
    let app = setup().await;
    let created = create_order(&app).await;
    let order_id = created["order"]["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/cancel"),
        Some(json!({ "reason": "Client injoignable" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], 91);

    let (status, _) = send(&app, "DELETE", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/orders/{order_id}/cancel"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_pending_order() {
    let app = setup().await;
    let created = create_order(&app).await;
    let order_id = created["order"]["id"].as_str().unwrap();

    let (status, _) = send(&app, "DELETE", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recalculate_order_shipping() {
    let app = setup().await;
    let created = create_order(&app).await;
    let order_id = created["order"]["id"].as_str().unwrap();

    let (status, json) = send(&app, "POST", &format!("/orders/{order_id}/shipping"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fee"], 690);
    assert_eq!(json["zone"], "FR_METRO");
}

#[tokio::test]
async fn test_invalid_order_id() {
    let app = setup().await;
    let (status, json) = send(&app, "GET", "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid ID format"));
}

#[tokio::test]
async fn test_status_info() {
    let app = setup().await;

    let (status, json) = send(&app, "GET", "/order-statuses/6", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["label"], "Livrée");
    assert_eq!(json["is_final"], true);

    let (status, _) = send(&app, "GET", "/order-statuses/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
