use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront_server::{router, AppState, MockIntentIssuer, ServerConfig};

const TOKEN: &str = "test-token";

fn app() -> Router {
    let config = ServerConfig {
        api_token: Some(TOKEN.into()),
        stripe_webhook_secret: Some("whsec_test".into()),
        ..ServerConfig::default()
    };
    router(AppState::new(Arc::new(MockIntentIssuer), config))
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_order(app: &Router) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/orders",
            Some(TOKEN),
            Some(json!({ "price": 100, "orderQuantity": 2, "user": "Ada", "email": "ada@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_mock_issuer() {
    let (status, body) = send(&app(), request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["intent_issuer"], "Mock");
}

#[tokio::test]
async fn intent_requires_bearer_token() {
    let app = app();
    let body = json!({ "totalCost": 200 });

    let (missing, _) = send(&app, request(Method::POST, "/create-payment-intent", None, Some(body.clone()))).await;
    let (wrong, err) = send(
        &app,
        request(Method::POST, "/create-payment-intent", Some("nope"), Some(body)),
    )
    .await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "FORBIDDEN");
}

#[tokio::test]
async fn intent_returns_client_secret() {
    let app = app();
    let order_id = create_order(&app).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/create-payment-intent",
            Some(TOKEN),
            Some(json!({ "totalCost": 200, "orderId": order_id })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let secret = body["clientSecret"].as_str().unwrap();
    assert!(secret.starts_with("pi_mock"));
    assert!(secret.contains("_secret_"));
}

#[tokio::test]
async fn intent_rejects_non_positive_total() {
    let (status, body) = send(
        &app(),
        request(Method::POST, "/create-payment-intent", Some(TOKEN), Some(json!({ "totalCost": 0 }))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn patch_records_payment_once() {
    let app = app();
    let order_id = create_order(&app).await;
    let payment = json!({
        "order": order_id,
        "user": "Ada",
        "email": "ada@example.com",
        "amount": 200,
        "transactionId": "pi_123",
    });
    let uri = format!("/orders/{order_id}");

    let (status, first) = send(&app, request(Method::PATCH, &uri, Some(TOKEN), Some(payment.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["modifiedCount"], 1);

    let (status, second) = send(&app, request(Method::PATCH, &uri, Some(TOKEN), Some(payment))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["modifiedCount"], 0);

    let (_, order) = send(&app, request(Method::GET, &uri, Some(TOKEN), None)).await;
    assert_eq!(order["status"], "paid");
    assert_eq!(order["transactionId"], "pi_123");
    assert_eq!(order["amountPaid"], 200.0);
}

#[tokio::test]
async fn patch_with_other_transaction_conflicts() {
    let app = app();
    let order_id = create_order(&app).await;
    let uri = format!("/orders/{order_id}");
    let payment = |txn: &str| {
        json!({
            "order": order_id,
            "user": "Ada",
            "email": "ada@example.com",
            "amount": 200,
            "transactionId": txn,
        })
    };

    send(&app, request(Method::PATCH, &uri, Some(TOKEN), Some(payment("pi_1")))).await;
    let (status, body) = send(&app, request(Method::PATCH, &uri, Some(TOKEN), Some(payment("pi_2")))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PAYMENT_CONFLICT");
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let (status, body) = send(&app(), request(Method::GET, "/orders/missing", Some(TOKEN), None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ORDER_NOT_FOUND");
}

#[tokio::test]
async fn webhook_rejects_bad_signature() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/webhook/stripe")
        .header("stripe-signature", "t=1,v1=deadbeef")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(&app(), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn unreconciled_starts_empty() {
    let (status, body) = send(&app(), request(Method::GET, "/payments/unreconciled", Some(TOKEN), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}
