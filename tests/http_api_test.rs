mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::Harness;
use coursepay::domain::ports::CourseStore;
use coursepay::interfaces::http::router;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    router(h.state.clone(), &h.settings.server)
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn initiate(h: &Harness, courses: Value) -> (StatusCode, Value) {
    let token = h.token("u1");
    call(
        app(h),
        post_json("/api/v1/payments/orders", Some(&token), json!({ "courseIds": courses })),
    )
    .await
}

#[tokio::test]
async fn test_initiate_requires_bearer_token() {
    let h = Harness::new().await;
    let (status, body) = call(
        app(&h),
        post_json("/api/v1/payments/orders", None, json!({ "courseIds": ["c1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(
        app(&h),
        post_json("/api/v1/payments/orders", Some("u1.forged"), json!({ "courseIds": ["c1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_initiate_returns_quote() {
    let h = Harness::new().await;
    let (status, body) = initiate(&h, json!(["c1", "c2"])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["amount"], "300");
    assert_eq!(body["currency"], "INR");
    assert!(body["orderRef"].as_str().unwrap().starts_with("sandbox_order_"));
    assert_eq!(body["providerPayload"]["amountMinor"], 30000);
}

#[tokio::test]
async fn test_initiate_error_statuses() {
    let h = Harness::new().await;

    let (status, body) = initiate(&h, json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("course id"));

    let (status, _) = initiate(&h, json!(["c404"])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    h.provider.set_fail_create(true).await;
    let (status, _) = initiate(&h, json!(["c1"])).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_verify_then_repurchase_conflicts() {
    let h = Harness::new().await;
    let token = h.token("u1");
    let (_, quote) = initiate(&h, json!(["c1", "c2"])).await;
    let order_ref = quote["orderRef"].as_str().unwrap().to_string();

    let (status, body) = call(
        app(&h),
        post_json("/api/v1/payments/verify", Some(&token), json!({ "orderRef": order_ref })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["success"], false);

    h.provider.mark_paid(&order_ref).await.unwrap();
    let signature = h.provider.sign_payment(&order_ref, "pay_9");
    let (status, body) = call(
        app(&h),
        post_json(
            "/api/v1/payments/verify",
            Some(&token),
            json!({ "orderRef": order_ref, "paymentRef": "pay_9", "signature": signature }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["settled"].as_array().unwrap().len(), 2);
    assert_eq!(body["settled"][0]["alreadySettled"], false);
    assert_eq!(body["failed"], json!([]));

    let (status, _) = initiate(&h, json!(["c1"])).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_verify_rejects_tampered_signature_and_foreign_order() {
    let h = Harness::new().await;
    let (_, quote) = initiate(&h, json!(["c1"])).await;
    let order_ref = quote["orderRef"].as_str().unwrap().to_string();
    h.provider.mark_paid(&order_ref).await.unwrap();

    let (status, _) = call(
        app(&h),
        post_json(
            "/api/v1/payments/verify",
            Some(&h.token("u1")),
            json!({ "orderRef": order_ref, "paymentRef": "pay_1", "signature": "00".repeat(32) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        app(&h),
        post_json(
            "/api/v1/payments/verify",
            Some(&h.token("u2")),
            json!({ "orderRef": order_ref }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(h.progress.is_empty().await);
}

#[tokio::test]
async fn test_partial_settlement_is_visible() {
    let h = Harness::new().await;
    let (_, quote) = initiate(&h, json!(["c1", "c2"])).await;
    let order_ref = quote["orderRef"].as_str().unwrap().to_string();
    h.provider.mark_paid(&order_ref).await.unwrap();
    h.courses.remove(&"c2".into()).await.unwrap();

    let (status, body) = call(
        app(&h),
        post_json("/api/v1/payments/verify", Some(&h.token("u1")), json!({ "orderRef": order_ref })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["settled"][0]["courseId"], "c1");
    assert_eq!(body["failed"][0]["courseId"], "c2");
}

#[tokio::test]
async fn test_order_status_route() {
    let h = Harness::new().await;
    let (_, quote) = initiate(&h, json!(["c1"])).await;
    let order_ref = quote["orderRef"].as_str().unwrap().to_string();
    h.provider.mark_paid(&order_ref).await.unwrap();

    let request = Request::builder()
        .uri(format!("/api/v1/payments/orders/{order_ref}/status"))
        .header(header::AUTHORIZATION, format!("Bearer {}", h.token("u1")))
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(app(&h), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paid");
    assert_eq!(body["paid"], true);
}

#[tokio::test]
async fn test_webhook_route() {
    let h = Harness::new().await;
    let (_, quote) = initiate(&h, json!(["c1"])).await;
    let order_ref = quote["orderRef"].as_str().unwrap().to_string();
    h.provider.mark_paid(&order_ref).await.unwrap();
    let (payload, signature) = h.provider.completed_webhook(&order_ref);

    let webhook = |signature: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/v1/payments/webhook")
            .header("x-signature", signature)
            .body(Body::from(payload.clone()))
            .unwrap()
    };

    let (status, _) = call(app(&h), webhook("bad")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.progress.is_empty().await);

    for _ in 0..2 {
        let (status, body) = call(app(&h), webhook(&signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["received"], true);
    }
    assert_eq!(h.progress.len().await, 1);
    assert_eq!(h.account("u1").await.courses.len(), 1);
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new().await;
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = call(app(&h), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_instructor_cannot_use_payment_routes() {
    let h = Harness::new().await;
    let token = h.token("i1");

    let (status, body) = call(
        app(&h),
        post_json("/api/v1/payments/orders", Some(&token), json!({ "courseIds": ["c1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = call(
        app(&h),
        post_json("/api/v1/payments/verify", Some(&token), json!({ "orderRef": "order_1" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(h.provider.order_count().await, 0);
}
